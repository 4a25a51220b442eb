use crate::traits::{ObjectStore, ProgressCallback, StorageError, StorageResult, UploadedObject};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use serde::Deserialize;
use std::time::{Duration, Instant};

/// Size of the body chunks used to report upload progress.
const PROGRESS_CHUNK_BYTES: usize = 64 * 1024;

/// Unsigned-upload client for a Cloudinary-compatible media API.
#[derive(Clone, Debug)]
pub struct CloudinaryClient {
    client: Client,
    base_url: String,
    cloud_name: String,
    upload_preset: String,
    upload_timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    url: Option<String>,
    public_id: String,
    bytes: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    error: ProviderErrorMessage,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorMessage {
    message: String,
}

impl CloudinaryClient {
    /// Create a new client
    ///
    /// # Arguments
    /// * `base_url` - Provider API root (e.g., "https://api.cloudinary.com")
    /// * `cloud_name` - Provider account identifier
    /// * `upload_preset` - Unsigned upload preset name
    /// * `upload_timeout` - Upper bound for one upload, including the response
    pub fn new(
        base_url: impl Into<String>,
        cloud_name: impl Into<String>,
        upload_preset: impl Into<String>,
        upload_timeout: Duration,
    ) -> StorageResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                StorageError::ConfigError(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cloud_name: cloud_name.into(),
            upload_preset: upload_preset.into(),
            upload_timeout,
        })
    }

    fn upload_url(&self) -> String {
        format!("{}/v1_1/{}/auto/upload", self.base_url, self.cloud_name)
    }

    /// Wrap the payload in a streaming body that reports progress as chunks are pulled.
    fn progress_body(data: Vec<u8>, progress: Option<ProgressCallback>) -> Body {
        let total = data.len();
        let bytes = Bytes::from(data);

        let mut chunks = Vec::with_capacity(total / PROGRESS_CHUNK_BYTES + 1);
        let mut offset = 0;
        while offset < total {
            let end = (offset + PROGRESS_CHUNK_BYTES).min(total);
            chunks.push(bytes.slice(offset..end));
            offset = end;
        }

        let mut sent = 0usize;
        let stream = futures::stream::iter(chunks.into_iter().map(move |chunk| {
            sent += chunk.len();
            if let Some(ref report) = progress {
                report(sent as f64 / total as f64);
            }
            Ok::<Bytes, std::io::Error>(chunk)
        }));

        Body::wrap_stream(stream)
    }

    async fn send_upload(
        &self,
        file_name: &str,
        content_type: &str,
        data: Vec<u8>,
        progress: Option<ProgressCallback>,
    ) -> StorageResult<UploadedObject> {
        let length = data.len() as u64;
        let part = Part::stream_with_length(Self::progress_body(data, progress), length)
            .file_name(file_name.to_string())
            .mime_str(content_type)
            .map_err(|e| StorageError::UploadFailed(format!("Invalid content type: {}", e)))?;

        let form = Form::new()
            .text("upload_preset", self.upload_preset.clone())
            .part("file", part);

        let response = self
            .client
            .post(self.upload_url())
            .multipart(form)
            .send()
            .await
            .map_err(|e| StorageError::UploadFailed(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = serde_json::from_str::<ProviderErrorBody>(&error_text)
                .map(|body| body.error.message)
                .unwrap_or(error_text);
            return Err(StorageError::UploadFailed(format!(
                "Provider returned status {}: {}",
                status, message
            )));
        }

        let body: UploadResponse = response.json().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to parse response as JSON: {}", e))
        })?;

        let remote_url = body.secure_url.or(body.url).ok_or_else(|| {
            StorageError::UploadFailed("Provider response has no URL".to_string())
        })?;

        Ok(UploadedObject {
            remote_url,
            remote_id: body.public_id,
            bytes: body.bytes.unwrap_or(length),
        })
    }
}

#[async_trait]
impl ObjectStore for CloudinaryClient {
    async fn upload(
        &self,
        file_name: &str,
        content_type: &str,
        data: Vec<u8>,
        progress: Option<ProgressCallback>,
    ) -> StorageResult<UploadedObject> {
        let size = data.len();
        let start = Instant::now();

        let result = tokio::time::timeout(
            self.upload_timeout,
            self.send_upload(file_name, content_type, data, progress.clone()),
        )
        .await
        .map_err(|_| StorageError::Timeout(self.upload_timeout))?;

        let uploaded = result?;
        if let Some(report) = progress {
            report(1.0);
        }

        tracing::info!(
            file_name = %file_name,
            remote_id = %uploaded.remote_id,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Remote upload successful"
        );

        Ok(uploaded)
    }

    async fn fetch(&self, remote_url: &str) -> StorageResult<Vec<u8>> {
        let response = self
            .client
            .get(remote_url)
            .send()
            .await
            .map_err(|e| StorageError::DownloadFailed(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound(remote_url.to_string()));
        }
        if !status.is_success() {
            return Err(StorageError::DownloadFailed(format!(
                "Provider returned status {}",
                status
            )));
        }

        let data = response
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(format!("Failed to read body: {}", e)))?;

        Ok(data.to_vec())
    }

    fn provider_name(&self) -> &'static str {
        "cloudinary"
    }
}
