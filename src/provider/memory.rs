//! In-memory backends for testing and single-process use
//!
//! `MemoryQueryEngine` simulates an asynchronous engine: every submission
//! follows a scripted list of states, and a succeeded `CREATE DATABASE` or
//! `CREATE EXTERNAL TABLE` registers the new catalog or table.

use crate::error::{AuditError, Result};
use crate::provider::{IdentityProvider, ObjectStore, QueryEngine};
use crate::types::{QueryRequest, QueryState, QueryStatus, ResultSet};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::RwLock;

/// A submission recorded by the memory engine
#[derive(Debug, Clone)]
struct MemoryExecution {
    request: QueryRequest,
    remaining: VecDeque<QueryState>,
    current: QueryState,
    applied: bool,
}

#[derive(Default)]
struct EngineState {
    catalogs: Vec<String>,
    tables: HashSet<(String, String)>,
    executions: HashMap<String, MemoryExecution>,
    submissions: Vec<(String, QueryRequest)>,
    scripts: VecDeque<Vec<QueryState>>,
    results: ResultSet,
    lookup_error: Option<String>,
    polls: u32,
}

/// Scripted in-memory query engine
pub struct MemoryQueryEngine {
    state: RwLock<EngineState>,
    default_script: Vec<QueryState>,
}

impl Default for MemoryQueryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryQueryEngine {
    /// Create an engine where every query succeeds on the first poll
    pub fn new() -> Self {
        Self {
            state: RwLock::new(EngineState::default()),
            default_script: vec![QueryState::Succeeded],
        }
    }

    /// State sequence used for submissions without a queued script
    pub fn with_default_script(mut self, states: Vec<QueryState>) -> Self {
        if !states.is_empty() {
            self.default_script = states;
        }
        self
    }

    /// Pre-register a catalog
    pub fn with_catalog(self, catalog: impl Into<String>) -> Self {
        self.write(|s| s.catalogs.push(catalog.into()));
        self
    }

    /// Pre-register a table
    pub fn with_table(self, catalog: impl Into<String>, table: impl Into<String>) -> Self {
        self.write(|s| {
            s.tables.insert((catalog.into(), table.into()));
        });
        self
    }

    /// Rows returned by `fetch_results` for any succeeded execution
    pub fn with_results(self, results: ResultSet) -> Self {
        self.write(|s| s.results = results);
        self
    }

    /// Queue a state sequence for the next submission
    pub fn push_script(&self, states: Vec<QueryState>) {
        self.write(|s| s.scripts.push_back(states));
    }

    /// Make table lookups fail with something other than "not found"
    pub fn fail_lookups(&self, reason: impl Into<String>) {
        let reason = reason.into();
        self.write(|s| s.lookup_error = Some(reason));
    }

    /// Submitted queries in order
    pub fn submitted(&self) -> Vec<QueryRequest> {
        self.read(|s| s.submissions.iter().map(|(_, r)| r.clone()).collect())
    }

    /// Number of submitted queries whose text starts with `prefix` (case-insensitive)
    pub fn submitted_matching(&self, prefix: &str) -> usize {
        let prefix = prefix.to_ascii_uppercase();
        self.read(|s| {
            s.submissions
                .iter()
                .filter(|(_, r)| r.query.to_ascii_uppercase().starts_with(&prefix))
                .count()
        })
    }

    /// Total status checks across all executions
    pub fn poll_count(&self) -> u32 {
        self.read(|s| s.polls)
    }

    /// Final state of an execution, if it exists
    pub fn execution_state(&self, execution_id: &str) -> Option<QueryState> {
        self.read(|s| s.executions.get(execution_id).map(|e| e.current))
    }

    pub fn has_catalog(&self, catalog: &str) -> bool {
        self.read(|s| s.catalogs.iter().any(|c| c == catalog))
    }

    /// Number of tables registered under a catalog
    pub fn table_count(&self, catalog: &str) -> usize {
        self.read(|s| s.tables.iter().filter(|(c, _)| c == catalog).count())
    }

    fn read<T>(&self, f: impl FnOnce(&EngineState) -> T) -> T {
        let guard = self.state.read().unwrap_or_else(|e| e.into_inner());
        f(&guard)
    }

    fn write<T>(&self, f: impl FnOnce(&mut EngineState) -> T) -> T {
        let mut guard = self.state.write().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }
}

/// Register the catalog or table a succeeded DDL statement creates
fn apply_ddl(state: &mut EngineState, request: &QueryRequest) {
    let words: Vec<&str> = request.query.split_whitespace().collect();
    let upper: Vec<String> = words.iter().take(3).map(|w| w.to_ascii_uppercase()).collect();
    let upper: Vec<&str> = upper.iter().map(String::as_str).collect();

    match upper.as_slice() {
        ["CREATE", "DATABASE", ..] => {
            if let Some(name) = words.get(2).copied() {
                if !state.catalogs.iter().any(|c| c == name) {
                    state.catalogs.push(name.to_string());
                }
            }
        }
        ["CREATE", "EXTERNAL", "TABLE"] => {
            let (Some(name), Some(db)) = (words.get(3).copied(), request.database.as_ref()) else {
                return;
            };
            let name = name.split('(').next().unwrap_or(name);
            state.tables.insert((db.clone(), name.to_string()));
        }
        _ => {}
    }
}

#[async_trait]
impl QueryEngine for MemoryQueryEngine {
    async fn submit(&self, request: &QueryRequest) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let default_script = self.default_script.clone();
        self.write(|s| {
            let script = s.scripts.pop_front().unwrap_or(default_script);
            let mut remaining: VecDeque<QueryState> = script.into();
            let current = remaining.front().copied().unwrap_or(QueryState::Succeeded);
            if remaining.is_empty() {
                remaining.push_back(current);
            }
            s.executions.insert(
                id.clone(),
                MemoryExecution {
                    request: request.clone(),
                    remaining,
                    current,
                    applied: false,
                },
            );
            s.submissions.push((id.clone(), request.clone()));
        });

        tracing::debug!(execution_id = %id, "Memory query submitted");
        Ok(id)
    }

    async fn poll(&self, execution_id: &str) -> Result<QueryStatus> {
        self.write(|s| -> Result<QueryStatus> {
            s.polls += 1;
            let exec = s.executions.get_mut(execution_id).ok_or_else(|| {
                AuditError::Engine(format!("Unknown execution: {}", execution_id))
            })?;

            let state = if exec.remaining.len() > 1 {
                exec.remaining.pop_front().unwrap_or(exec.current)
            } else {
                exec.remaining.front().copied().unwrap_or(exec.current)
            };
            exec.current = state;

            let apply = state == QueryState::Succeeded && !exec.applied;
            if apply {
                exec.applied = true;
            }
            let request = exec.request.clone();

            if apply {
                apply_ddl(s, &request);
            }

            Ok(match state {
                QueryState::Failed => QueryStatus::with_reason(state, "scripted failure"),
                _ => QueryStatus::new(state),
            })
        })
    }

    async fn fetch_results(&self, execution_id: &str) -> Result<ResultSet> {
        self.read(|s| -> Result<ResultSet> {
            let exec = s.executions.get(execution_id).ok_or_else(|| {
                AuditError::Engine(format!("Unknown execution: {}", execution_id))
            })?;
            if exec.current != QueryState::Succeeded {
                return Err(AuditError::Engine(format!(
                    "Results requested for execution {} in state {}",
                    execution_id, exec.current
                )));
            }
            Ok(s.results.clone())
        })
    }

    async fn list_catalogs(&self) -> Result<Vec<String>> {
        Ok(self.read(|s| s.catalogs.clone()))
    }

    async fn table_exists(&self, catalog: &str, table: &str) -> Result<bool> {
        self.read(|s| -> Result<bool> {
            if let Some(reason) = &s.lookup_error {
                return Err(AuditError::Lookup {
                    catalog: catalog.to_string(),
                    table: table.to_string(),
                    reason: reason.clone(),
                });
            }
            Ok(s.tables.contains(&(catalog.to_string(), table.to_string())))
        })
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// An object written to the memory store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Bytes,
    pub content_type: String,
}

/// In-memory object store
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<(String, String), StoredObject>>,
    writes: RwLock<Vec<(String, String)>>,
    fail_with: RwLock<Option<String>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail
    pub fn fail_writes(&self, reason: impl Into<String>) {
        *self.fail_with.write().unwrap_or_else(|e| e.into_inner()) = Some(reason.into());
    }

    pub fn get(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        let objects = self.objects.read().unwrap_or_else(|e| e.into_inner());
        objects.get(&(bucket.to_string(), key.to_string())).cloned()
    }

    /// Body of an object as UTF-8 text
    pub fn get_text(&self, bucket: &str, key: &str) -> Option<String> {
        self.get(bucket, key)
            .map(|o| String::from_utf8_lossy(&o.body).into_owned())
    }

    /// Every (bucket, key) written, in order
    pub fn writes(&self) -> Vec<(String, String)> {
        self.writes.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn len(&self) -> usize {
        self.objects.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<()> {
        if let Some(reason) = self.fail_with.read().unwrap_or_else(|e| e.into_inner()).clone() {
            return Err(AuditError::Storage {
                bucket: bucket.to_string(),
                key: key.to_string(),
                reason,
            });
        }

        let id = (bucket.to_string(), key.to_string());
        self.writes
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(id.clone());
        self.objects.write().unwrap_or_else(|e| e.into_inner()).insert(
            id,
            StoredObject {
                body,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }
}

/// Fixed identity for tests
pub struct StaticIdentity {
    account: Option<String>,
}

impl StaticIdentity {
    pub fn new(account: impl Into<String>) -> Self {
        Self {
            account: Some(account.into()),
        }
    }

    /// Identity whose lookups always fail
    pub fn unavailable() -> Self {
        Self { account: None }
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn account_id(&self) -> Result<String> {
        self.account
            .clone()
            .ok_or_else(|| AuditError::Identity("no credentials".to_string()))
    }
}
