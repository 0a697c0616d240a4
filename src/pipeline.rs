//! High-level audit pipeline built on pluggable backends
//!
//! `AuditPipeline` wires configuration, the query engine, object storage
//! and identity lookup into the two invocations the pipeline serves: the
//! one-shot setup and the scheduled aggregation.

use crate::aggregate::AggregationJob;
use crate::config::PipelineConfig;
use crate::error::{AuditError, Result};
use crate::notify::{RequestType, SetupNotification, SetupNotifier};
use crate::provider::{IdentityProvider, ObjectStore, QueryEngine};
use crate::query::QueryRunner;
use crate::schema::SchemaProvisioner;
use crate::types::{AggregationOutcome, SchemaReport};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Result of a setup invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SetupOutcome {
    /// Create/Update: schema ensured
    Provisioned(SchemaReport),

    /// Delete: catalog and table are left in place
    Retained,
}

impl SetupOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Provisioned(report) => report.outcome.as_str(),
            Self::Retained => "retained",
        }
    }
}

/// Audit pipeline backed by pluggable providers
pub struct AuditPipeline {
    config: PipelineConfig,
    engine: Arc<dyn QueryEngine>,
    store: Arc<dyn ObjectStore>,
    identity: Arc<dyn IdentityProvider>,
}

impl AuditPipeline {
    pub fn new(
        config: PipelineConfig,
        engine: Arc<dyn QueryEngine>,
        store: Arc<dyn ObjectStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            config,
            engine,
            store,
            identity,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Query engine backend name
    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    fn runner(&self) -> QueryRunner {
        QueryRunner::new(self.engine.clone(), self.config.poll_policy())
    }

    /// Identifier reported to the provisioning system for the schema resource
    pub fn physical_resource_id(&self) -> String {
        format!("{}.{}", self.config.database_name, self.config.table_name)
    }

    /// Run setup and report the outcome through `notifier` exactly once
    ///
    /// The notifier fires on every exit path, failures included. A failed
    /// delivery after a successful setup fails the invocation; after a
    /// failed setup it is logged and the setup error is returned.
    pub async fn setup(
        &self,
        request_type: RequestType,
        notifier: &dyn SetupNotifier,
    ) -> Result<SetupOutcome> {
        self.log_identity().await;

        let result = match request_type {
            RequestType::Delete => {
                tracing::info!(
                    catalog = %self.config.database_name,
                    table = %self.config.table_name,
                    "Delete requested, retaining catalog and table"
                );
                Ok(SetupOutcome::Retained)
            }
            RequestType::Create | RequestType::Update => {
                let provisioner = SchemaProvisioner::new(self.runner());
                provisioner
                    .ensure_schema(&self.config.schema_target())
                    .await
                    .map(SetupOutcome::Provisioned)
            }
        };

        report(result, notifier).await
    }

    /// Run one aggregation
    pub async fn aggregate(&self) -> Result<AggregationOutcome> {
        let job = AggregationJob::new(self.runner(), self.store.clone());
        let result = job.run(&self.config.aggregation_target()).await;

        if let Err(err) = &result {
            tracing::error!(error = %err, "Aggregation failed");
        }
        result
    }

    /// Account lookup is diagnostic only; failures never abort setup
    async fn log_identity(&self) {
        match self.identity.account_id().await {
            Ok(account) => tracing::info!(
                account = %account,
                engine = self.engine.name(),
                "Running setup"
            ),
            Err(err) => tracing::warn!(error = %err, "Could not resolve caller account"),
        }
    }
}

/// Answer a setup request that arrived without a usable configuration
///
/// Delete retains everything, so it still succeeds. Create and Update fail
/// with the configuration error as the reason.
pub async fn setup_unconfigured(
    request_type: RequestType,
    error: AuditError,
    notifier: &dyn SetupNotifier,
) -> Result<SetupOutcome> {
    let result = match request_type {
        RequestType::Delete => {
            tracing::warn!(error = %error, "Delete requested without configuration, retaining");
            Ok(SetupOutcome::Retained)
        }
        RequestType::Create | RequestType::Update => Err(error),
    };
    report(result, notifier).await
}

/// Send the one notification for a finished setup
async fn report(
    result: Result<SetupOutcome>,
    notifier: &dyn SetupNotifier,
) -> Result<SetupOutcome> {
    match result {
        Ok(outcome) => {
            notifier
                .notify(&SetupNotification::success(outcome.as_str()))
                .await?;
            tracing::info!(outcome = outcome.as_str(), "Setup complete");
            Ok(outcome)
        }
        Err(err) => {
            tracing::error!(error = %err, "Setup failed");
            if let Err(notify_err) = notifier
                .notify(&SetupNotification::failed(err.to_string()))
                .await
            {
                tracing::error!(error = %notify_err, "Failed to report setup failure");
            }
            Err(err)
        }
    }
}
