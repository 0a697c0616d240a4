//! Athena query engine with Glue table lookups

use crate::error::{AuditError, Result};
use crate::provider::QueryEngine;
use crate::types::{QueryRequest, QueryState, QueryStatus, ResultRow, ResultSet};
use async_trait::async_trait;
use aws_sdk_athena::error::DisplayErrorContext;
use aws_sdk_athena::types::{QueryExecutionContext, QueryExecutionState, ResultConfiguration};

/// `QueryEngine` backed by Amazon Athena and the Glue data catalog
pub struct AthenaEngine {
    athena: aws_sdk_athena::Client,
    glue: aws_sdk_glue::Client,
    data_catalog: String,
}

impl AthenaEngine {
    pub fn new(
        athena: aws_sdk_athena::Client,
        glue: aws_sdk_glue::Client,
        data_catalog: impl Into<String>,
    ) -> Self {
        Self {
            athena,
            glue,
            data_catalog: data_catalog.into(),
        }
    }
}

/// Map the SDK state; anything the SDK adds later is treated as still pending
fn map_state(state: &QueryExecutionState) -> QueryState {
    match state {
        QueryExecutionState::Queued => QueryState::Queued,
        QueryExecutionState::Running => QueryState::Running,
        QueryExecutionState::Succeeded => QueryState::Succeeded,
        QueryExecutionState::Failed => QueryState::Failed,
        QueryExecutionState::Cancelled => QueryState::Cancelled,
        other => {
            tracing::warn!(state = ?other, "Unrecognized Athena query state");
            QueryState::Running
        }
    }
}

fn engine_error(operation: &str, err: &impl std::error::Error) -> AuditError {
    AuditError::Engine(format!("{}: {}", operation, DisplayErrorContext(err)))
}

fn map_row(row: &aws_sdk_athena::types::Row) -> ResultRow {
    row.data()
        .iter()
        .map(|datum| datum.var_char_value().map(str::to_string))
        .collect()
}

#[async_trait]
impl QueryEngine for AthenaEngine {
    async fn submit(&self, request: &QueryRequest) -> Result<String> {
        let mut call = self
            .athena
            .start_query_execution()
            .query_string(&request.query)
            .result_configuration(
                ResultConfiguration::builder()
                    .output_location(&request.output_location)
                    .build(),
            );

        if let Some(database) = &request.database {
            call = call.query_execution_context(
                QueryExecutionContext::builder().database(database).build(),
            );
        }

        let output = call
            .send()
            .await
            .map_err(|e| engine_error("StartQueryExecution", &e))?;

        let id = output
            .query_execution_id()
            .ok_or_else(|| AuditError::Engine("StartQueryExecution returned no id".to_string()))?
            .to_string();

        tracing::info!(
            execution_id = %id,
            database = ?request.database,
            "Athena query started"
        );

        Ok(id)
    }

    async fn poll(&self, execution_id: &str) -> Result<QueryStatus> {
        let output = self
            .athena
            .get_query_execution()
            .query_execution_id(execution_id)
            .send()
            .await
            .map_err(|e| engine_error("GetQueryExecution", &e))?;

        let status = output
            .query_execution()
            .and_then(|q| q.status())
            .ok_or_else(|| {
                AuditError::Engine(format!("Execution {} has no status", execution_id))
            })?;

        let state = status.state().map(map_state).unwrap_or(QueryState::Queued);

        Ok(QueryStatus {
            state,
            reason: status.state_change_reason().map(str::to_string),
        })
    }

    async fn fetch_results(&self, execution_id: &str) -> Result<ResultSet> {
        let mut results = ResultSet::default();
        let mut next_token: Option<String> = None;
        let mut pages = 0u32;

        loop {
            let output = self
                .athena
                .get_query_results()
                .query_execution_id(execution_id)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| engine_error("GetQueryResults", &e))?;
            pages += 1;

            if let Some(set) = output.result_set() {
                results.extend(set.rows().iter().map(map_row));
            }

            match output.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        tracing::debug!(
            execution_id,
            rows = results.len(),
            pages,
            "Athena results fetched"
        );

        Ok(results)
    }

    async fn list_catalogs(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let output = self
                .athena
                .list_databases()
                .catalog_name(&self.data_catalog)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| engine_error("ListDatabases", &e))?;

            names.extend(output.database_list().iter().map(|db| db.name().to_string()));

            match output.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        Ok(names)
    }

    async fn table_exists(&self, catalog: &str, table: &str) -> Result<bool> {
        let result = self
            .glue
            .get_table()
            .database_name(catalog)
            .name(table)
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_entity_not_found_exception() {
                    Ok(false)
                } else {
                    Err(AuditError::Lookup {
                        catalog: catalog.to_string(),
                        table: table.to_string(),
                        reason: DisplayErrorContext(&service_err).to_string(),
                    })
                }
            }
        }
    }

    fn name(&self) -> &str {
        "athena"
    }
}
