//! Aggregation job: hourly PutObject counts exported as CSV
//!
//! Each run checks the table is there, runs the usage query to completion,
//! fetches every row and writes them as one object. The fixed key is
//! overwritten on every run; concurrent runs race on it and the last
//! writer wins.

use crate::error::Result;
use crate::export::{self, CSV_CONTENT_TYPE};
use crate::provider::ObjectStore;
use crate::query::QueryRunner;
use crate::sql;
use crate::types::{AggregationOutcome, ExportArtifact, QueryRequest};
use bytes::Bytes;
use std::sync::Arc;

/// Where the aggregation reads from and writes to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationTarget {
    pub catalog: String,
    pub table: String,

    /// Location for the query engine's own result files
    pub output_location: String,

    pub export_bucket: String,

    /// Fixed key overwritten by every run
    pub export_key: String,

    /// Also keep a timestamped copy of each run's payload
    pub archive_runs: bool,
}

/// Runs the usage query and persists the export
pub struct AggregationJob {
    runner: QueryRunner,
    store: Arc<dyn ObjectStore>,
}

impl AggregationJob {
    pub fn new(runner: QueryRunner, store: Arc<dyn ObjectStore>) -> Self {
        Self { runner, store }
    }

    /// Run one aggregation
    ///
    /// Returns `NotReady` without submitting anything when the table has not
    /// been provisioned. A failed query or fetch writes nothing.
    pub async fn run(&self, target: &AggregationTarget) -> Result<AggregationOutcome> {
        let query = sql::usage_query(&target.table)?;

        let engine = self.runner.engine();
        if !engine.table_exists(&target.catalog, &target.table).await? {
            tracing::warn!(
                catalog = %target.catalog,
                table = %target.table,
                "Table not provisioned yet, skipping aggregation"
            );
            return Ok(AggregationOutcome::NotReady {
                catalog: target.catalog.clone(),
                table: target.table.clone(),
            });
        }

        let request = QueryRequest::new(query, &target.output_location)
            .in_database(&target.catalog);
        let execution = self.runner.execute(&request).await?;

        let results = engine.fetch_results(&execution.id).await?;
        let payload = Bytes::from(export::render_csv(&results)?);

        let archive_key = if target.archive_runs {
            let key = export::archive_key(&target.export_key, chrono::Utc::now());
            self.store
                .put_object(&target.export_bucket, &key, payload.clone(), CSV_CONTENT_TYPE)
                .await?;
            Some(key)
        } else {
            None
        };

        self.store
            .put_object(
                &target.export_bucket,
                &target.export_key,
                payload.clone(),
                CSV_CONTENT_TYPE,
            )
            .await?;

        let artifact = ExportArtifact {
            bucket: target.export_bucket.clone(),
            key: target.export_key.clone(),
            archive_key,
            rows: results.len(),
            bytes: payload.len(),
            execution_id: execution.id,
        };

        tracing::info!(
            bucket = %artifact.bucket,
            key = %artifact.key,
            rows = artifact.rows,
            bytes = artifact.bytes,
            execution_id = %artifact.execution_id,
            "Usage export written"
        );

        Ok(AggregationOutcome::Exported(artifact))
    }
}
