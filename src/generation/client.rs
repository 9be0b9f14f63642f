//! ImagePig text-to-image client.
//!
//! One call, one attempt:
//!
//! ```text
//! build request -> POST (Api-Key header) -> status 200? -> parse JSON
//!   -> "error" empty? -> base64 decode -> write output file
//! ```
//!
//! Every step before the write fails with [`ApiError`]; only the write
//! itself produces a file system error. Nothing is retried or cached.

use super::ImageGenerator;
use super::transport::{HttpTransport, Method, TransportRequest};
use crate::config::ImageGenerationConfig;
use crate::error::{ApiError, AppError, AppResult};
use crate::storage::FileSystem;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

const SERVICE: &str = "ImagePig";

/// Request body. Orientation and format are fixed: landscape
/// (about 1216x832) JPEG.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub proportion: String,
    pub format: String,
}

impl GenerationRequest {
    pub fn landscape_jpeg(prompt: &str) -> Self {
        Self {
            prompt: prompt.to_string(),
            proportion: "landscape".to_string(),
            format: "JPEG".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GenerationResponse {
    #[serde(default)]
    pub image_data: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub error: Option<String>,
}

pub struct ImagePigClient {
    transport: Arc<dyn HttpTransport>,
    fs: Arc<dyn FileSystem>,
    api_key: Option<String>,
    url: String,
}

impl ImagePigClient {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        fs: Arc<dyn FileSystem>,
        config: &ImageGenerationConfig,
    ) -> Self {
        Self {
            transport,
            fs,
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            url: config.endpoint_url(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn api_error(&self, message: impl Into<String>) -> ApiError {
        ApiError::new(SERVICE, &self.url, message)
    }

    /// Request a landscape JPEG for `prompt` and write it to `output`.
    pub async fn generate_landscape_image(&self, prompt: &str, output: &Path) -> AppResult<()> {
        if prompt.trim().is_empty() {
            return Err(AppError::validation("prompt", "must not be empty"));
        }
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::validation("image_generation.api_key", "is not configured"))?;

        let payload = serde_json::to_vec(&GenerationRequest::landscape_jpeg(prompt))
            .map_err(|e| self.api_error("failed to encode request").with_source(e))?;
        let request = TransportRequest {
            method: Method::Post,
            url: self.url.clone(),
            headers: vec![
                ("Content-Type".to_string(), "application/json".to_string()),
                ("Api-Key".to_string(), api_key.to_string()),
            ],
            body: payload,
        };

        tracing::info!(url = %self.url, output = %output.display(), "requesting generated image");
        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| self.api_error("failed to send request").with_source(e))?;

        if response.status != 200 {
            tracing::warn!(status = response.status, "image generation rejected");
            return Err(self
                .api_error(format!("request failed with status {}", response.status))
                .with_status(response.status)
                .with_body(&response.body)
                .into());
        }

        let parsed: GenerationResponse = serde_json::from_slice(&response.body).map_err(|e| {
            self.api_error("failed to parse response")
                .with_status(response.status)
                .with_body(&response.body)
                .with_source(e)
        })?;

        if let Some(message) = parsed.error.as_deref().filter(|m| !m.is_empty()) {
            tracing::warn!(error = message, "image generation reported an error");
            return Err(self
                .api_error(message)
                .with_status(response.status)
                .into());
        }
        if parsed.image_data.is_empty() {
            return Err(self.api_error("response contained no image data").into());
        }

        let image = STANDARD
            .decode(parsed.image_data.as_bytes())
            .map_err(|e| self.api_error("failed to decode image data").with_source(e))?;

        let fs = self.fs.clone();
        let path = output.to_path_buf();
        let size = image.len();
        tokio::task::spawn_blocking(move || fs.write(&path, &image))
            .await
            .map_err(|e| AppError::fs("write", output, std::io::Error::other(e)))?
            .map_err(|e| AppError::fs("write", output, e))?;

        tracing::info!(
            output = %output.display(),
            bytes = size,
            mime_type = %parsed.mime_type,
            "generated image saved"
        );
        Ok(())
    }
}

#[async_trait]
impl ImageGenerator for ImagePigClient {
    async fn generate_landscape_image(&self, prompt: &str, output: &Path) -> AppResult<()> {
        ImagePigClient::generate_landscape_image(self, prompt, output).await
    }
}
