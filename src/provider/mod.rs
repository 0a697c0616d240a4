//! Backend traits: the seams between pipeline logic and cloud services
//!
//! The query engine, object storage, and caller identity are reached only
//! through these traits. `aws` implements them on Athena/Glue/S3/STS;
//! `memory` implements them in-process for tests and dry runs.

use crate::error::Result;
use crate::types::{QueryRequest, QueryStatus, ResultSet};
use async_trait::async_trait;
use bytes::Bytes;

pub mod aws;
pub mod memory;

/// Asynchronous analytical query service plus its metadata catalog
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Submit a query, returning the engine-assigned execution id
    async fn submit(&self, request: &QueryRequest) -> Result<String>;

    /// Fetch the current status of an execution
    async fn poll(&self, execution_id: &str) -> Result<QueryStatus>;

    /// Fetch every result row of a succeeded execution, header first
    async fn fetch_results(&self, execution_id: &str) -> Result<ResultSet>;

    /// List the names of all databases known to the engine
    async fn list_catalogs(&self) -> Result<Vec<String>>;

    /// Look a table up by name in the metadata catalog
    ///
    /// A missing table is `Ok(false)`. Every other failure is an error.
    async fn table_exists(&self, catalog: &str, table: &str) -> Result<bool>;

    /// Backend name (e.g., "athena", "memory")
    fn name(&self) -> &str;
}

/// Object storage writes
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write a complete object in one request, replacing any existing one
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<()>;
}

/// Caller identity lookup
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Account the pipeline is running under
    async fn account_id(&self) -> Result<String>;
}
