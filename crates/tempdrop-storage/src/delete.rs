use crate::traits::{DeleteOutcome, RemoteDeleter, StorageError, StorageResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::time::{Duration, Instant};

/// Resource-type hint the provider expects on destroy calls.
pub fn resource_type_for(file_type: &str) -> &'static str {
    let file_type = file_type.to_ascii_lowercase();
    if file_type.starts_with("image/") {
        "image"
    } else if file_type.starts_with("video/") || file_type.starts_with("audio/") {
        "video"
    } else {
        "raw"
    }
}

/// Deleter for deployments without provider credentials.
///
/// Always succeeds without touching the network.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalOnlyDeleter;

#[async_trait]
impl RemoteDeleter for LocalOnlyDeleter {
    async fn delete(&self, remote_id: &str, file_type: &str) -> StorageResult<DeleteOutcome> {
        tracing::debug!(
            remote_id = %remote_id,
            resource_type = resource_type_for(file_type),
            "Remote delete skipped (no provider credentials)"
        );
        Ok(DeleteOutcome::LocalOnly)
    }

    fn removes_remotely(&self) -> bool {
        false
    }
}

/// Deleter that issues signed destroy requests with the provider API secret.
#[derive(Clone)]
pub struct SignedDeleter {
    client: Client,
    base_url: String,
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

impl std::fmt::Debug for SignedDeleter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignedDeleter")
            .field("base_url", &self.base_url)
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

/// Signature over the sorted request parameters followed by the secret.
pub(crate) fn sign(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted: Vec<_> = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

impl SignedDeleter {
    pub fn new(
        base_url: impl Into<String>,
        cloud_name: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> StorageResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| {
                StorageError::ConfigError(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cloud_name: cloud_name.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        })
    }

    fn destroy_url(&self, resource_type: &str) -> String {
        format!(
            "{}/v1_1/{}/{}/destroy",
            self.base_url, self.cloud_name, resource_type
        )
    }
}

#[async_trait]
impl RemoteDeleter for SignedDeleter {
    async fn delete(&self, remote_id: &str, file_type: &str) -> StorageResult<DeleteOutcome> {
        let resource_type = resource_type_for(file_type);
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign(
            &[("public_id", remote_id), ("timestamp", &timestamp)],
            &self.api_secret,
        );
        let start = Instant::now();

        let response = self
            .client
            .post(self.destroy_url(resource_type))
            .form(&[
                ("public_id", remote_id),
                ("timestamp", timestamp.as_str()),
                ("api_key", self.api_key.as_str()),
                ("signature", signature.as_str()),
                ("signature_algorithm", "sha256"),
            ])
            .send()
            .await
            .map_err(|e| StorageError::DeleteFailed(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(StorageError::DeleteFailed(format!(
                "Provider returned status {}: {}",
                status, error_text
            )));
        }

        let body: DestroyResponse = response.json().await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to parse response as JSON: {}", e))
        })?;

        match body.result.as_str() {
            "ok" => {
                tracing::info!(
                    remote_id = %remote_id,
                    resource_type,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Remote delete successful"
                );
                Ok(DeleteOutcome::Removed)
            }
            "not found" => Err(StorageError::NotFound(remote_id.to_string())),
            other => Err(StorageError::DeleteFailed(format!(
                "Provider rejected delete of {}: {}",
                remote_id, other
            ))),
        }
    }

    fn removes_remotely(&self) -> bool {
        true
    }
}
