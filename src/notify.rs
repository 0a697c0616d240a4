//! Setup notification: report the setup outcome to whatever triggered it
//!
//! CloudFormation custom resources wait for a single JSON document PUT to
//! a presigned `ResponseURL`. `CustomResourceResponder` sends it;
//! `LogNotifier` and `MemoryNotifier` stand in when there is no callback.

use crate::error::{AuditError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use std::time::Duration;

/// Success or failure, as the provisioning system spells it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SetupStatus {
    Success,
    Failed,
}

/// One setup outcome signal
#[derive(Debug, Clone, PartialEq)]
pub struct SetupNotification {
    pub status: SetupStatus,

    /// Human-readable reason, required by the provisioning system on failure
    pub reason: Option<String>,

    /// Small structured payload (e.g., `{"result": "success"}`)
    pub data: serde_json::Value,
}

impl SetupNotification {
    pub fn success(outcome: &str) -> Self {
        Self {
            status: SetupStatus::Success,
            reason: None,
            data: serde_json::json!({ "result": "success", "outcome": outcome }),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            status: SetupStatus::Failed,
            reason: Some(reason.into()),
            data: serde_json::json!({ "result": "failed" }),
        }
    }
}

/// Sink for the one-shot setup signal
#[async_trait]
pub trait SetupNotifier: Send + Sync {
    /// Deliver the signal; called exactly once per setup invocation
    async fn notify(&self, notification: &SetupNotification) -> Result<()>;
}

/// Custom-resource lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestType {
    Create,
    Update,
    Delete,
}

/// Custom-resource request delivered to the setup handler
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomResourceRequest {
    pub request_type: RequestType,

    #[serde(rename = "ResponseURL")]
    pub response_url: String,

    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,

    #[serde(default)]
    pub resource_type: Option<String>,

    /// Present on Update and Delete
    #[serde(default)]
    pub physical_resource_id: Option<String>,

    #[serde(default)]
    pub resource_properties: serde_json::Value,
}

/// Response document PUT back to the provisioning system
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomResourceResponse {
    pub status: SetupStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    pub physical_resource_id: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    pub no_echo: bool,
    pub data: serde_json::Value,
}

impl CustomResourceResponse {
    /// Build the response for a request
    ///
    /// The physical id is echoed back when the request carries one so the
    /// provisioning system never sees the resource replaced.
    pub fn for_request(
        request: &CustomResourceRequest,
        notification: &SetupNotification,
        default_physical_id: &str,
    ) -> Self {
        Self {
            status: notification.status,
            reason: notification.reason.clone(),
            physical_resource_id: request
                .physical_resource_id
                .clone()
                .unwrap_or_else(|| default_physical_id.to_string()),
            stack_id: request.stack_id.clone(),
            request_id: request.request_id.clone(),
            logical_resource_id: request.logical_resource_id.clone(),
            no_echo: false,
            data: notification.data.clone(),
        }
    }
}

/// Answers a custom-resource request over HTTP
pub struct CustomResourceResponder {
    client: reqwest::Client,
    request: CustomResourceRequest,
    physical_id: String,
}

impl CustomResourceResponder {
    pub fn new(request: CustomResourceRequest, physical_id: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AuditError::Notify(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            request,
            physical_id: physical_id.into(),
        })
    }
}

#[async_trait]
impl SetupNotifier for CustomResourceResponder {
    async fn notify(&self, notification: &SetupNotification) -> Result<()> {
        let response =
            CustomResourceResponse::for_request(&self.request, notification, &self.physical_id);
        let body = serde_json::to_vec(&response)?;

        // Presigned URLs are signed without a content type
        let resp = self
            .client
            .put(&self.request.response_url)
            .header(reqwest::header::CONTENT_TYPE, "")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                AuditError::Notify(format!("PUT {}: {}", self.request.logical_resource_id, e))
            })?;

        if !resp.status().is_success() {
            return Err(AuditError::Notify(format!(
                "Response URL rejected notification for '{}': HTTP {}",
                self.request.logical_resource_id,
                resp.status()
            )));
        }

        tracing::info!(
            logical_resource_id = %self.request.logical_resource_id,
            request_id = %self.request.request_id,
            status = ?notification.status,
            "Setup notification sent"
        );
        Ok(())
    }
}

/// Logs the outcome; used for manual runs without a callback
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl SetupNotifier for LogNotifier {
    async fn notify(&self, notification: &SetupNotification) -> Result<()> {
        match notification.status {
            SetupStatus::Success => tracing::info!(data = %notification.data, "Setup succeeded"),
            SetupStatus::Failed => tracing::error!(
                reason = notification.reason.as_deref().unwrap_or(""),
                "Setup failed"
            ),
        }
        Ok(())
    }
}

/// Records notifications in memory for testing
#[derive(Default)]
pub struct MemoryNotifier {
    sent: RwLock<Vec<SetupNotification>>,
    fail_with: Option<String>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose deliveries always fail (after being recorded)
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            sent: RwLock::new(Vec::new()),
            fail_with: Some(reason.into()),
        }
    }

    pub fn sent(&self) -> Vec<SetupNotification> {
        self.sent.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl SetupNotifier for MemoryNotifier {
    async fn notify(&self, notification: &SetupNotification) -> Result<()> {
        self.sent
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(notification.clone());
        match &self.fail_with {
            Some(reason) => Err(AuditError::Notify(reason.clone())),
            None => Ok(()),
        }
    }
}
