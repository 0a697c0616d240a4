//! Command-line entry points for the two pipeline invocations

use crate::error::{AuditError, Result};
use crate::notify::CustomResourceRequest;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

/// A3S Audit - S3 write-audit provisioning and usage export
#[derive(Debug, Parser)]
#[command(name = "a3s-audit", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Ensure the Athena database and log table exist
    Setup {
        /// Custom-resource request JSON to answer ("-" reads stdin)
        #[arg(long)]
        event: Option<PathBuf>,
    },

    /// Run the usage query and export it as CSV
    Aggregate,
}

/// Read a custom-resource request from a file, or stdin for "-"
pub async fn read_request(path: &Path) -> Result<CustomResourceRequest> {
    let raw = if path == Path::new("-") {
        let mut buf = String::new();
        tokio::io::stdin()
            .read_to_string(&mut buf)
            .await
            .map_err(|e| AuditError::Config(format!("Failed to read request from stdin: {}", e)))?;
        buf
    } else {
        tokio::fs::read_to_string(path).await.map_err(|e| {
            AuditError::Config(format!(
                "Failed to read request file {}: {}",
                path.display(),
                e
            ))
        })?
    };

    Ok(serde_json::from_str(&raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_setup_with_event() {
        let cli = Cli::parse_from(["a3s-audit", "setup", "--event", "request.json"]);
        match cli.command {
            Commands::Setup { event } => assert_eq!(event, Some(PathBuf::from("request.json"))),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_aggregate() {
        let cli = Cli::parse_from(["a3s-audit", "aggregate"]);
        assert!(matches!(cli.command, Commands::Aggregate));
    }

    #[tokio::test]
    async fn test_read_request_file() {
        let path = std::env::temp_dir()
            .join(format!("a3s-audit-req-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            r#"{"RequestType":"Delete","ResponseURL":"https://example/r","StackId":"s","RequestId":"r","LogicalResourceId":"CustomResource","PhysicalResourceId":"db.t"}"#,
        )
        .unwrap();

        let req = read_request(&path).await.unwrap();
        assert_eq!(req.request_type, crate::notify::RequestType::Delete);
        assert_eq!(req.physical_resource_id.as_deref(), Some("db.t"));

        std::fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_read_request_missing_file() {
        let err = read_request(Path::new("/nonexistent/a3s-audit-request.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuditError::Config(_)));
    }
}
