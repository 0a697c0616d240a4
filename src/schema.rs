//! Schema provisioning: ensure the catalog and log table exist
//!
//! Safe to run any number of times: an existing catalog or table is never
//! recreated, altered, or treated as an error.
//!
//! ```text
//! START -> [catalog exists?] -> yes: CATALOG_READY
//!                            -> no:  CREATE DATABASE -> CATALOG_READY | FATAL
//! CATALOG_READY -> [table exists?] -> yes: already_exists
//!                                  -> no:  CREATE TABLE -> created | FATAL
//! ```

use crate::error::Result;
use crate::query::QueryRunner;
use crate::sql;
use crate::types::{QueryRequest, SchemaOutcome, SchemaReport};

/// What to provision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaTarget {
    /// Database name
    pub catalog: String,

    /// Table name
    pub table: String,

    /// DDL template with `{table}` and `{location}` placeholders
    pub table_ddl: String,

    /// Object storage prefix holding the raw log records
    pub raw_location: String,

    /// Location for the query engine's own result files
    pub output_location: String,
}

impl SchemaTarget {
    /// Target using the CloudTrail table definition
    pub fn cloudtrail(
        catalog: impl Into<String>,
        table: impl Into<String>,
        raw_location: impl Into<String>,
        output_location: impl Into<String>,
    ) -> Self {
        Self {
            catalog: catalog.into(),
            table: table.into(),
            table_ddl: sql::CLOUDTRAIL_TABLE_DDL.to_string(),
            raw_location: raw_location.into(),
            output_location: output_location.into(),
        }
    }
}

/// Creates the catalog and table when missing
pub struct SchemaProvisioner {
    runner: QueryRunner,
}

impl SchemaProvisioner {
    pub fn new(runner: QueryRunner) -> Self {
        Self { runner }
    }

    /// Ensure the catalog and table exist, creating whichever is missing
    pub async fn ensure_schema(&self, target: &SchemaTarget) -> Result<SchemaReport> {
        // Render everything up front so bad input fails before any side effect
        let create_database = sql::create_database(&target.catalog)?;
        let create_table =
            sql::render_table_ddl(&target.table_ddl, &target.table, &target.raw_location)?;

        let catalog_created = self
            .ensure_catalog(&target.catalog, &create_database, &target.output_location)
            .await?;

        let engine = self.runner.engine();
        if engine.table_exists(&target.catalog, &target.table).await? {
            tracing::info!(
                catalog = %target.catalog,
                table = %target.table,
                "Table already exists"
            );
            return Ok(SchemaReport {
                outcome: SchemaOutcome::AlreadyExists,
                catalog_created,
            });
        }

        tracing::info!(
            catalog = %target.catalog,
            table = %target.table,
            location = %target.raw_location,
            "Creating table"
        );

        let request = QueryRequest::new(create_table, &target.output_location)
            .in_database(&target.catalog);
        let execution = self.runner.execute(&request).await?;

        tracing::info!(
            catalog = %target.catalog,
            table = %target.table,
            execution_id = %execution.id,
            "Table created"
        );

        Ok(SchemaReport {
            outcome: SchemaOutcome::Created,
            catalog_created,
        })
    }

    /// Returns true when the catalog had to be created
    async fn ensure_catalog(
        &self,
        catalog: &str,
        create_database: &str,
        output_location: &str,
    ) -> Result<bool> {
        let catalogs = self.runner.engine().list_catalogs().await?;
        if catalogs.iter().any(|name| name == catalog) {
            tracing::info!(catalog, "Catalog exists");
            return Ok(false);
        }

        tracing::info!(catalog, "Catalog missing, creating");
        let execution = self
            .runner
            .execute(&QueryRequest::new(create_database, output_location))
            .await?;
        tracing::info!(catalog, execution_id = %execution.id, "Catalog created");
        Ok(true)
    }
}
