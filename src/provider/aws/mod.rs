//! AWS backends
//!
//! Athena runs the queries and lists databases, Glue answers the table
//! lookup, S3 stores the export, and STS reports the caller account.
//! All clients share one `SdkConfig` resolved from the ambient
//! credential chain.

mod athena;
mod s3;
mod sts;

pub use athena::AthenaEngine;
pub use s3::S3ObjectStore;
pub use sts::StsIdentity;

use aws_config::BehaviorVersion;

/// Data catalog Athena lists databases from by default
pub const DEFAULT_DATA_CATALOG: &str = "AwsDataCatalog";

/// The set of AWS backends used by the pipeline
pub struct AwsBackends {
    pub engine: AthenaEngine,
    pub store: S3ObjectStore,
    pub identity: StsIdentity,
}

impl AwsBackends {
    /// Resolve region and credentials from the environment and build all clients
    pub async fn load(data_catalog: &str) -> Self {
        let sdk = aws_config::defaults(BehaviorVersion::latest()).load().await;

        tracing::info!(
            region = ?sdk.region().map(|r| r.as_ref().to_string()),
            data_catalog,
            "AWS clients configured"
        );

        Self {
            engine: AthenaEngine::new(
                aws_sdk_athena::Client::new(&sdk),
                aws_sdk_glue::Client::new(&sdk),
                data_catalog,
            ),
            store: S3ObjectStore::new(aws_sdk_s3::Client::new(&sdk)),
            identity: StsIdentity::new(aws_sdk_sts::Client::new(&sdk)),
        }
    }
}
