//! Remote image generation.
//!
//! - [`transport`]: the [`HttpTransport`] seam and its reqwest implementation
//! - [`client`]: [`ImagePigClient`], the request/response cycle against the
//!   ImagePig FLUX endpoint
//!
//! Callers depend on [`ImageGenerator`] so the post flow can be tested with a
//! generator that never touches the network.

pub mod client;
pub mod transport;

pub use client::{GenerationRequest, GenerationResponse, ImagePigClient};
pub use transport::{HttpTransport, ReqwestTransport, TransportError};

use crate::error::AppResult;
use async_trait::async_trait;
use std::path::Path;

/// Produces a landscape image for a text prompt and stores it at `output`.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate_landscape_image(&self, prompt: &str, output: &Path) -> AppResult<()>;
}
