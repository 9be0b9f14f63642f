//! HTTP handlers, grouped by resource.
//!
//! Every handler returns `Result<_, AppError>`; the error's `IntoResponse`
//! renders the JSON error body. Blocking disk and image work is moved off
//! the async workers with [`blocking`].

pub mod content;
pub mod media;
pub mod posts;

use crate::context::AppContext;
use crate::error::{AppError, AppResult};
use axum::Router;
use serde::de::DeserializeOwned;
use std::path::PathBuf;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(content::routes())
        .merge(media::routes())
        .merge(posts::routes())
}

/// Run a synchronous service call on the blocking pool.
pub(crate) async fn blocking<T, F>(f: F) -> AppResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> AppResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::fs("run task", PathBuf::new(), std::io::Error::other(e)))?
}

/// Parse a JSON body, reporting failures as validation errors.
pub(crate) fn parse_json<T: DeserializeOwned>(body: &[u8]) -> AppResult<T> {
    serde_json::from_slice(body)
        .map_err(|e| AppError::validation("request_body", format!("Invalid request body: {e}")))
}

/// A required query parameter.
pub(crate) fn required(field: &str, value: Option<String>) -> AppResult<String> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::validation(field, format!("{field} is required")))
}
