//! Error types for a3s-audit

use crate::types::QueryState;
use thiserror::Error;

/// Errors that can occur while provisioning or aggregating
#[derive(Debug, Error)]
pub enum AuditError {
    /// Query reached a terminal state other than SUCCEEDED
    #[error("Query {execution_id} finished in state {state}: {}", .reason.as_deref().unwrap_or("no reason reported"))]
    QueryFailed {
        execution_id: String,
        state: QueryState,
        reason: Option<String>,
    },

    /// Wait cap exceeded while the query was still pending remotely
    #[error("Query {execution_id} still pending after {waited_secs}s")]
    QueryTimeout {
        execution_id: String,
        waited_secs: u64,
    },

    /// Query engine API call failure (submit, poll, fetch, list)
    #[error("Query engine error: {0}")]
    Engine(String),

    /// Table metadata lookup failed for a reason other than "not found"
    #[error("Failed to look up table '{catalog}.{table}': {reason}")]
    Lookup {
        catalog: String,
        table: String,
        reason: String,
    },

    /// Object storage write failure
    #[error("Failed to write s3://{bucket}/{key}: {reason}")]
    Storage {
        bucket: String,
        key: String,
        reason: String,
    },

    /// Caller identity lookup failure
    #[error("Identity lookup failed: {0}")]
    Identity(String),

    /// Setup notification could not be delivered
    #[error("Notification error: {0}")]
    Notify(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// CSV rendering failure
    #[error("Export error: {0}")]
    Export(String),

    /// Serialization/deserialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AuditError {
    /// True when the error came from a query that ran to a bad terminal state
    /// or was abandoned by the wait cap
    pub fn is_query_outcome(&self) -> bool {
        matches!(self, Self::QueryFailed { .. } | Self::QueryTimeout { .. })
    }
}

/// Result type alias for audit operations
pub type Result<T> = std::result::Result<T, AuditError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_failed_display_with_reason() {
        let err = AuditError::QueryFailed {
            execution_id: "q-1".to_string(),
            state: QueryState::Failed,
            reason: Some("SYNTAX_ERROR".to_string()),
        };
        assert_eq!(err.to_string(), "Query q-1 finished in state FAILED: SYNTAX_ERROR");
        assert!(err.is_query_outcome());
    }

    #[test]
    fn test_query_failed_display_without_reason() {
        let err = AuditError::QueryFailed {
            execution_id: "q-2".to_string(),
            state: QueryState::Cancelled,
            reason: None,
        };
        assert!(err.to_string().ends_with("CANCELLED: no reason reported"));
    }

    #[test]
    fn test_storage_display() {
        let err = AuditError::Storage {
            bucket: "results".to_string(),
            key: "estadisticas/query_results.csv".to_string(),
            reason: "AccessDenied".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to write s3://results/estadisticas/query_results.csv: AccessDenied"
        );
        assert!(!err.is_query_outcome());
    }
}
