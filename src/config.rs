//! Pipeline configuration resolved from the process environment
//!
//! Only the two bucket names are required; everything else has a default
//! matching the deployed stack.

use crate::aggregate::AggregationTarget;
use crate::error::{AuditError, Result};
use crate::provider::aws::DEFAULT_DATA_CATALOG;
use crate::schema::SchemaTarget;
use crate::sql;
use crate::types::PollPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment-provided settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Bucket the audit trail delivers raw logs to (`TRAIL_BUCKET`)
    pub trail_bucket: String,

    /// Bucket for query output and the export (`ATHENA_BUCKET`)
    pub athena_bucket: String,

    #[serde(default = "default_database_name")]
    pub database_name: String,

    #[serde(default = "default_table_name")]
    pub table_name: String,

    /// Data catalog listed when checking for the database
    #[serde(default = "default_data_catalog")]
    pub data_catalog: String,

    /// Prefix under `athena_bucket` for query engine output
    #[serde(default = "default_results_prefix")]
    pub results_prefix: String,

    /// Fixed export key under `athena_bucket`
    #[serde(default = "default_export_key")]
    pub export_key: String,

    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Cap on a single query wait; unset waits for a terminal state
    #[serde(default)]
    pub query_max_wait_secs: Option<u64>,

    /// Keep a timestamped copy of every export
    #[serde(default)]
    pub archive_exports: bool,
}

fn default_database_name() -> String {
    "fss_pricing_trend".to_string()
}

fn default_table_name() -> String {
    "cloudtrail_logs_fss_pricing".to_string()
}

fn default_data_catalog() -> String {
    DEFAULT_DATA_CATALOG.to_string()
}

fn default_results_prefix() -> String {
    "logs/".to_string()
}

fn default_export_key() -> String {
    "estadisticas/query_results.csv".to_string()
}

fn default_poll_interval_secs() -> u64 {
    10
}

impl PipelineConfig {
    /// Load and validate from the process environment
    pub fn from_env() -> Result<Self> {
        let config: Self = envy::from_env()
            .map_err(|e| AuditError::Config(format!("Failed to read environment: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate from explicit key/value pairs (upper-case keys)
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let config: Self = envy::from_iter(vars.into_iter().map(|(k, v)| (k.into(), v.into())))
            .map_err(|e| AuditError::Config(format!("Invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.trail_bucket.trim().is_empty() {
            return Err(AuditError::Config("TRAIL_BUCKET cannot be empty".to_string()));
        }
        if self.athena_bucket.trim().is_empty() {
            return Err(AuditError::Config("ATHENA_BUCKET cannot be empty".to_string()));
        }
        if self.poll_interval_secs == 0 {
            return Err(AuditError::Config(
                "POLL_INTERVAL_SECS must be greater than zero".to_string(),
            ));
        }
        if self.export_key.is_empty() || self.export_key.ends_with('/') {
            return Err(AuditError::Config(format!(
                "EXPORT_KEY '{}' must name an object",
                self.export_key
            )));
        }
        sql::validate_identifier("Database", &self.database_name)?;
        sql::validate_identifier("Table", &self.table_name)?;
        sql::validate_location(&self.raw_location())?;
        Ok(())
    }

    /// Prefix the raw audit records live under
    pub fn raw_location(&self) -> String {
        format!("s3://{}/AWSLogs/", self.trail_bucket)
    }

    /// Where the query engine writes its result files
    pub fn output_location(&self) -> String {
        format!(
            "s3://{}/{}",
            self.athena_bucket,
            self.results_prefix.trim_start_matches('/')
        )
    }

    pub fn poll_policy(&self) -> PollPolicy {
        let policy =
            PollPolicy::default().with_interval(Duration::from_secs(self.poll_interval_secs));
        match self.query_max_wait_secs {
            Some(secs) => policy.with_max_wait(Duration::from_secs(secs)),
            None => policy,
        }
    }

    pub fn schema_target(&self) -> SchemaTarget {
        SchemaTarget::cloudtrail(
            &self.database_name,
            &self.table_name,
            self.raw_location(),
            self.output_location(),
        )
    }

    pub fn aggregation_target(&self) -> AggregationTarget {
        AggregationTarget {
            catalog: self.database_name.clone(),
            table: self.table_name.clone(),
            output_location: self.output_location(),
            export_bucket: self.athena_bucket.clone(),
            export_key: self.export_key.clone(),
            archive_runs: self.archive_exports,
        }
    }
}
