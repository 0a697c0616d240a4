//! Core types for the a3s-audit pipeline
//!
//! Query engine state, result sets, and the outcomes reported by the
//! provisioning and aggregation operations. Reports use snake_case JSON.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// State of a submitted query execution
///
/// Transitions are driven by the query engine; this crate only polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryState {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl QueryState {
    /// True once the engine will no longer change the state
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }

    /// Wire name used by the engine (e.g., "RUNNING")
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "QUEUED",
            Self::Running => "RUNNING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for QueryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status reported by a single poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryStatus {
    /// Current state
    pub state: QueryState,

    /// Engine-provided explanation for the last state change, if any
    pub reason: Option<String>,
}

impl QueryStatus {
    pub fn new(state: QueryState) -> Self {
        Self { state, reason: None }
    }

    pub fn with_reason(state: QueryState, reason: impl Into<String>) -> Self {
        Self {
            state,
            reason: Some(reason.into()),
        }
    }
}

/// A query to submit to the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    /// SQL text
    pub query: String,

    /// Database the query runs in (None for catalog-level DDL)
    pub database: Option<String>,

    /// Object storage location for the engine's own result files
    pub output_location: String,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>, output_location: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            database: None,
            output_location: output_location.into(),
        }
    }

    /// Run the query in the given database
    pub fn in_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }
}

/// A query that ran to SUCCEEDED
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryExecution {
    /// Engine-assigned execution id
    pub id: String,

    /// Final state (always `Succeeded` when returned by the runner)
    pub state: QueryState,

    /// Number of status checks performed, including the terminal one
    pub polls: u32,
}

/// One result row: ordered, loosely-typed text fields
pub type ResultRow = Vec<Option<String>>;

/// Rows returned by a succeeded query; the first row is the header
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    pub rows: Vec<ResultRow>,
}

impl ResultSet {
    pub fn new(rows: Vec<ResultRow>) -> Self {
        Self { rows }
    }

    /// Build a result set where every field is present
    pub fn from_text<R, F>(rows: R) -> Self
    where
        R: IntoIterator<Item = Vec<F>>,
        F: Into<String>,
    {
        Self {
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(|f| Some(f.into())).collect())
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append rows from a subsequent result page
    pub fn extend(&mut self, rows: impl IntoIterator<Item = ResultRow>) {
        self.rows.extend(rows);
    }
}

/// Polling policy for blocking on a query
///
/// The interval is fixed (no backoff). `max_wait` of `None` waits until
/// the engine reports a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Sleep between status checks
    pub interval: Duration,

    /// Optional cap on the total wait for one execution
    pub max_wait: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            max_wait: None,
        }
    }
}

impl PollPolicy {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }
}

/// Result of ensuring the table exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaOutcome {
    /// The table was created by this call
    Created,
    /// The table was already present; nothing was submitted for it
    AlreadyExists,
}

impl SchemaOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::AlreadyExists => "already_exists",
        }
    }
}

impl fmt::Display for SchemaOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detailed result of a schema provisioning call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaReport {
    pub outcome: SchemaOutcome,

    /// Whether the catalog had to be created during this call
    pub catalog_created: bool,
}

/// The export file written by an aggregation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportArtifact {
    pub bucket: String,

    /// Fixed, overwritten key
    pub key: String,

    /// Per-run archive key, when archiving is enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_key: Option<String>,

    /// Rows written, header included
    pub rows: usize,

    /// Payload size in bytes
    pub bytes: usize,

    /// Execution that produced the rows
    pub execution_id: String,
}

/// Result of an aggregation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AggregationOutcome {
    /// Export written
    Exported(ExportArtifact),

    /// The table does not exist yet; no query was submitted
    NotReady { catalog: String, table: String },
}

impl AggregationOutcome {
    pub fn artifact(&self) -> Option<&ExportArtifact> {
        match self {
            Self::Exported(artifact) => Some(artifact),
            Self::NotReady { .. } => None,
        }
    }
}
