//! # a3s-audit
//!
//! S3 write-audit pipeline: idempotent Athena schema provisioning and
//! scheduled usage export.
//!
//! ## Overview
//!
//! CloudTrail delivers S3 data events to a trail bucket. This crate
//! provisions an Athena database and external table over those logs, then
//! periodically counts successful `PutObject` calls per bucket and hour and
//! writes the result to object storage as CSV.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use a3s_audit::{AuditPipeline, MemoryNotifier, PipelineConfig, RequestType};
//! use a3s_audit::provider::memory::{MemoryObjectStore, MemoryQueryEngine, StaticIdentity};
//!
//! # async fn example() -> a3s_audit::Result<()> {
//! let config = PipelineConfig::from_vars([
//!     ("TRAIL_BUCKET", "trail-bucket"),
//!     ("ATHENA_BUCKET", "results-bucket"),
//! ])?;
//!
//! let pipeline = AuditPipeline::new(
//!     config,
//!     Arc::new(MemoryQueryEngine::new()),
//!     Arc::new(MemoryObjectStore::new()),
//!     Arc::new(StaticIdentity::new("123456789012")),
//! );
//!
//! let notifier = MemoryNotifier::new();
//! let outcome = pipeline.setup(RequestType::Create, &notifier).await?;
//! println!("Setup: {}", outcome.as_str());
//! # Ok(())
//! # }
//! ```
//!
//! ## Providers
//!
//! - **aws**: Athena + Glue queries and lookups, S3 export, STS identity
//! - **memory**: scripted in-process backends for testing
//!
//! ## Architecture
//!
//! - **QueryEngine** trait: submit, poll, fetch, catalog and table lookups
//! - **QueryRunner**: fixed-interval blocking wait to a terminal state
//! - **SchemaProvisioner**: ensures catalog and table, never recreates
//! - **AggregationJob**: usage query to a single CSV object
//! - **SetupNotifier** trait: one success/failure signal per setup
//! - **AuditPipeline**: wires configuration and backends together

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod notify;
pub mod pipeline;
pub mod provider;
pub mod query;
pub mod schema;
pub mod sql;
pub mod types;

// Re-export core types
pub use aggregate::{AggregationJob, AggregationTarget};
pub use config::PipelineConfig;
pub use error::{AuditError, Result};
pub use notify::{
    CustomResourceRequest, CustomResourceResponder, CustomResourceResponse, LogNotifier,
    MemoryNotifier, RequestType, SetupNotification, SetupNotifier, SetupStatus,
};
pub use pipeline::{setup_unconfigured, AuditPipeline, SetupOutcome};
pub use provider::{IdentityProvider, ObjectStore, QueryEngine};
pub use query::QueryRunner;
pub use schema::{SchemaProvisioner, SchemaTarget};
pub use types::{
    AggregationOutcome, ExportArtifact, PollPolicy, QueryExecution, QueryRequest, QueryState,
    QueryStatus, ResultRow, ResultSet, SchemaOutcome, SchemaReport,
};

// Re-export providers for convenience
pub use provider::aws::{AthenaEngine, AwsBackends, S3ObjectStore, StsIdentity};
pub use provider::memory::{MemoryObjectStore, MemoryQueryEngine, StaticIdentity};
