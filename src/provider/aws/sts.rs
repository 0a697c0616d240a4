//! STS caller identity

use crate::error::{AuditError, Result};
use crate::provider::IdentityProvider;
use async_trait::async_trait;
use aws_sdk_sts::error::DisplayErrorContext;

pub struct StsIdentity {
    client: aws_sdk_sts::Client,
}

impl StsIdentity {
    pub fn new(client: aws_sdk_sts::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl IdentityProvider for StsIdentity {
    async fn account_id(&self) -> Result<String> {
        let output = self
            .client
            .get_caller_identity()
            .send()
            .await
            .map_err(|e| AuditError::Identity(DisplayErrorContext(&e).to_string()))?;

        output
            .account()
            .map(str::to_string)
            .ok_or_else(|| {
                AuditError::Identity("GetCallerIdentity returned no account".to_string())
            })
    }
}
