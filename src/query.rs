//! Blocking query execution on top of a `QueryEngine`
//!
//! Submits a query and polls its status at a fixed interval until the
//! engine reports a terminal state. Anything other than SUCCEEDED is fatal
//! for the current invocation; there is no retry at this layer.

use crate::error::{AuditError, Result};
use crate::provider::QueryEngine;
use crate::types::{PollPolicy, QueryExecution, QueryRequest, QueryState, QueryStatus};
use std::sync::Arc;
use tokio::time::Instant;

/// Runs queries to completion against a shared engine
#[derive(Clone)]
pub struct QueryRunner {
    engine: Arc<dyn QueryEngine>,
    policy: PollPolicy,
}

impl QueryRunner {
    pub fn new(engine: Arc<dyn QueryEngine>, policy: PollPolicy) -> Self {
        Self { engine, policy }
    }

    pub fn engine(&self) -> &dyn QueryEngine {
        self.engine.as_ref()
    }

    /// Submit a query and block until it succeeds
    pub async fn execute(&self, request: &QueryRequest) -> Result<QueryExecution> {
        let execution_id = self.engine.submit(request).await?;
        self.wait(&execution_id).await
    }

    /// Block on an already-submitted execution until it succeeds
    pub async fn wait(&self, execution_id: &str) -> Result<QueryExecution> {
        let (status, polls) = self.wait_terminal(execution_id).await?;

        if status.state != QueryState::Succeeded {
            tracing::error!(
                execution_id,
                state = %status.state,
                reason = ?status.reason,
                "Query did not succeed"
            );
            return Err(AuditError::QueryFailed {
                execution_id: execution_id.to_string(),
                state: status.state,
                reason: status.reason,
            });
        }

        tracing::info!(execution_id, polls, "Query complete");

        Ok(QueryExecution {
            id: execution_id.to_string(),
            state: status.state,
            polls,
        })
    }

    /// Poll until any terminal state, returning it with the number of checks
    async fn wait_terminal(&self, execution_id: &str) -> Result<(QueryStatus, u32)> {
        let started = Instant::now();
        let mut polls = 0u32;

        loop {
            let status = self.engine.poll(execution_id).await?;
            polls += 1;

            if status.state.is_terminal() {
                return Ok((status, polls));
            }

            if let Some(max_wait) = self.policy.max_wait {
                if started.elapsed() + self.policy.interval > max_wait {
                    tracing::warn!(
                        execution_id,
                        state = %status.state,
                        polls,
                        "Query still pending at wait cap"
                    );
                    return Err(AuditError::QueryTimeout {
                        execution_id: execution_id.to_string(),
                        waited_secs: started.elapsed().as_secs(),
                    });
                }
            }

            tracing::debug!(execution_id, state = %status.state, polls, "Query pending");
            tokio::time::sleep(self.policy.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::memory::MemoryQueryEngine;
    use std::time::Duration;

    fn runner(engine: Arc<MemoryQueryEngine>, policy: PollPolicy) -> QueryRunner {
        QueryRunner::new(engine, policy)
    }

    fn select() -> QueryRequest {
        QueryRequest::new("SELECT 1", "s3://results/logs/").in_database("db")
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_until_succeeded() {
        let engine = Arc::new(MemoryQueryEngine::new());
        engine.push_script(vec![
            QueryState::Queued,
            QueryState::Running,
            QueryState::Running,
            QueryState::Succeeded,
        ]);

        let started = Instant::now();
        let exec = runner(engine.clone(), PollPolicy::default())
            .execute(&select())
            .await
            .unwrap();

        assert_eq!(exec.polls, 4);
        assert_eq!(exec.state, QueryState::Succeeded);
        assert_eq!(engine.poll_count(), 4);
        // Three sleeps of the fixed 10s interval
        assert_eq!(started.elapsed(), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_success_does_not_sleep() {
        let engine = Arc::new(MemoryQueryEngine::new());
        let started = Instant::now();
        let exec = runner(engine, PollPolicy::default())
            .execute(&select())
            .await
            .unwrap();

        assert_eq!(exec.polls, 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_is_fatal() {
        let engine = Arc::new(MemoryQueryEngine::new());
        engine.push_script(vec![QueryState::Running, QueryState::Failed]);

        let err = runner(engine, PollPolicy::default())
            .execute(&select())
            .await
            .unwrap_err();

        match err {
            AuditError::QueryFailed { state, reason, .. } => {
                assert_eq!(state, QueryState::Failed);
                assert_eq!(reason.as_deref(), Some("scripted failure"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_is_fatal() {
        let engine = Arc::new(MemoryQueryEngine::new());
        engine.push_script(vec![QueryState::Queued, QueryState::Cancelled]);

        let err = runner(engine, PollPolicy::default())
            .execute(&select())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AuditError::QueryFailed { state: QueryState::Cancelled, .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_cap_is_distinct_from_failure() {
        let engine = Arc::new(MemoryQueryEngine::new());
        engine.push_script(vec![QueryState::Running]);

        let policy = PollPolicy::default().with_max_wait(Duration::from_secs(35));
        let err = runner(engine.clone(), policy)
            .execute(&select())
            .await
            .unwrap_err();

        match err {
            AuditError::QueryTimeout { waited_secs, .. } => assert_eq!(waited_secs, 30),
            other => panic!("unexpected error: {other}"),
        }
        // Checks at 0s, 10s, 20s, 30s; a fifth would land past the cap
        assert_eq!(engine.poll_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_interval() {
        let engine = Arc::new(MemoryQueryEngine::new());
        engine.push_script(vec![QueryState::Queued, QueryState::Succeeded]);

        let started = Instant::now();
        runner(engine, PollPolicy::default().with_interval(Duration::from_secs(2)))
            .execute(&select())
            .await
            .unwrap();

        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_unknown_execution_propagates_engine_error() {
        let engine = Arc::new(MemoryQueryEngine::new());
        let err = runner(engine, PollPolicy::default())
            .wait("missing")
            .await
            .unwrap_err();
        assert!(matches!(err, AuditError::Engine(_)));
    }
}
