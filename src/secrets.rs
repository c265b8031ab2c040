//! Credential resolution boundary.
//!
//! The vault itself is an external collaborator; this module only defines
//! the `SecretsProvider` contract, the typed credential bags, and a
//! file-backed provider for local use. Secret payloads are decoded with a
//! schema-checked `serde_json` decode — never evaluated or interpolated.
//! Credentials live for one orchestrator session and are never persisted.

use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::io::ErrorKind;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

use crate::adapters::BackendKind;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("secret `{0}` not found")]
    Missing(String),
    #[error("access to secret `{0}` denied")]
    AccessDenied(String),
    #[error("secret `{name}` is malformed: {reason}")]
    Malformed { name: String, reason: String },
    #[error("credentials do not match backend `{0}`")]
    Mismatch(String),
    #[error("reading secret failed: {0}")]
    Io(#[from] std::io::Error),
}

/// AWS-shaped credential bag, field names matching the vault payload.
#[derive(Clone, Deserialize)]
pub struct AwsCredentials {
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub bucket_name: String,
}

impl fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("aws_access_key_id", &"<redacted>")
            .field("aws_secret_access_key", &"<redacted>")
            .field("bucket_name", &self.bucket_name)
            .finish()
    }
}

/// Azure-shaped credential bag.
#[derive(Clone, Deserialize)]
pub struct AzureCredentials {
    pub connection_string: String,
    pub file_system_name: String,
}

impl fmt::Debug for AzureCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureCredentials")
            .field("connection_string", &"<redacted>")
            .field("file_system_name", &self.file_system_name)
            .finish()
    }
}

/// Credentials for one backend, decoded per backend kind.
#[derive(Clone, Debug)]
pub enum BackendCredentials {
    Aws(AwsCredentials),
    Azure(AzureCredentials),
}

/// Supplies backend credentials from a vault.
///
/// Failures here are fatal to orchestrator construction; the core never
/// retries a credential fetch.
#[async_trait]
pub trait SecretsProvider: Send + Sync {
    async fn get_credentials(
        &self,
        kind: BackendKind,
        secret_name: &str,
        location_hint: &str,
    ) -> Result<BackendCredentials, CredentialError>;
}

/// Reads secrets from `<root>/<secret_name>.json`.
///
/// Stands in for a vault in local and test environments; the payload schema
/// is the same JSON document a vault would return.
pub struct FileSecretsProvider {
    root: PathBuf,
}

impl FileSecretsProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl SecretsProvider for FileSecretsProvider {
    async fn get_credentials(
        &self,
        kind: BackendKind,
        secret_name: &str,
        location_hint: &str,
    ) -> Result<BackendCredentials, CredentialError> {
        let path = self.root.join(format!("{}.json", secret_name));
        debug!(
            "resolving secret `{}` for {} ({}) from {}",
            secret_name,
            kind.service_name(),
            location_hint,
            path.display()
        );

        let payload = tokio::fs::read_to_string(&path).await.map_err(|err| {
            match err.kind() {
                ErrorKind::NotFound => CredentialError::Missing(secret_name.to_string()),
                ErrorKind::PermissionDenied => {
                    CredentialError::AccessDenied(secret_name.to_string())
                }
                _ => CredentialError::Io(err),
            }
        })?;

        let malformed = |err: serde_json::Error| CredentialError::Malformed {
            name: secret_name.to_string(),
            reason: err.to_string(),
        };
        match kind {
            BackendKind::Aws => {
                let creds: AwsCredentials = serde_json::from_str(&payload).map_err(malformed)?;
                Ok(BackendCredentials::Aws(creds))
            }
            BackendKind::Azure => {
                let creds: AzureCredentials = serde_json::from_str(&payload).map_err(malformed)?;
                Ok(BackendCredentials::Azure(creds))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn decodes_an_aws_payload() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(
            dir.path().join("archival.json"),
            r#"{"aws_access_key_id":"AKIA","aws_secret_access_key":"s3cr3t","bucket_name":"data"}"#,
        )
        .expect("write secret");

        let provider = FileSecretsProvider::new(dir.path());
        let creds = provider
            .get_credentials(BackendKind::Aws, "archival", "us-east-1")
            .await
            .expect("resolve");
        match creds {
            BackendCredentials::Aws(aws) => assert_eq!(aws.bucket_name, "data"),
            other => panic!("unexpected credentials: {:?}", other),
        }
    }

    #[tokio::test]
    async fn missing_secret_is_reported_as_missing() {
        let dir = TempDir::new().expect("tempdir");
        let provider = FileSecretsProvider::new(dir.path());
        let err = provider
            .get_credentials(BackendKind::Aws, "absent", "us-east-1")
            .await
            .expect_err("should fail");
        assert!(matches!(err, CredentialError::Missing(_)));
    }

    #[tokio::test]
    async fn schema_violations_are_malformed_not_evaluated() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(
            dir.path().join("archival.json"),
            r#"{"aws_access_key_id": "AKIA"}"#,
        )
        .expect("write secret");

        let provider = FileSecretsProvider::new(dir.path());
        let err = provider
            .get_credentials(BackendKind::Aws, "archival", "us-east-1")
            .await
            .expect_err("should fail");
        assert!(matches!(err, CredentialError::Malformed { .. }));
    }

    #[test]
    fn debug_output_redacts_key_material() {
        let creds = AwsCredentials {
            aws_access_key_id: "AKIA".into(),
            aws_secret_access_key: "s3cr3t".into(),
            bucket_name: "data".into(),
        };
        let rendered = format!("{:?}", creds);
        assert!(!rendered.contains("s3cr3t"));
        assert!(rendered.contains("data"));
    }
}
