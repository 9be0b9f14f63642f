//! Error taxonomy shared by every service and rendered by the HTTP layer.
//!
//! | Kind | Meaning | Status |
//! |---|---|---|
//! | [`AppError::Validation`] | caller input is structurally invalid | 400 |
//! | [`AppError::FileSystem`] | local I/O failed (`NotFound` is kept distinct) | 404 / 500 |
//! | [`AppError::Api`] | the remote image service failed | 502 |
//!
//! Services fail fast and return these values unchanged; nothing here retries.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Longest response body snippet kept on an [`ApiError`].
const BODY_SNIPPET_LEN: usize = 512;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("failed to {operation} {}: {source}", path.display())]
    FileSystem {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Failure talking to a remote service.
#[derive(Error, Debug)]
#[error("{service} request to {endpoint} failed: {message}")]
pub struct ApiError {
    pub service: String,
    pub endpoint: String,
    pub message: String,
    /// HTTP status, when a response was received.
    pub status: Option<u16>,
    /// Leading part of the response body, for diagnostics.
    pub body: Option<String>,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ApiError {
    pub fn new(
        service: impl Into<String>,
        endpoint: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            service: service.into(),
            endpoint: endpoint.into(),
            message: message.into(),
            status: None,
            body: None,
            source: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_body(mut self, body: &[u8]) -> Self {
        let text = String::from_utf8_lossy(body);
        self.body = Some(text.chars().take(BODY_SNIPPET_LEN).collect());
        self
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl AppError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn fs(operation: &'static str, path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::FileSystem {
            operation,
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// An image that could not be decoded or encoded, reported against its
    /// path as invalid data.
    pub fn invalid_image(
        operation: &'static str,
        path: impl AsRef<Path>,
        cause: impl std::fmt::Display,
    ) -> Self {
        Self::fs(
            operation,
            path,
            io::Error::new(io::ErrorKind::InvalidData, cause.to_string()),
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::FileSystem { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::FileSystem { .. } if self.is_not_found() => StatusCode::NOT_FOUND,
            Self::FileSystem { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Api(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn details(&self) -> Option<String> {
        match self {
            Self::Validation { field, .. } => Some(format!("field: {field}")),
            Self::FileSystem { path, .. } => Some(path.display().to_string()),
            Self::Api(api) => match (api.status, &api.body) {
                (Some(status), Some(body)) => Some(format!("status {status}: {body}")),
                (Some(status), None) => Some(format!("status {status}")),
                _ => api.source.as_ref().map(|s| s.to_string()),
            },
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub code: u16,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "request failed");
        } else {
            tracing::warn!(error = %self, status = status.as_u16(), "request rejected");
        }

        let body = Json(ErrorBody {
            error: self.to_string(),
            details: self.details(),
            code: status.as_u16(),
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let err = AppError::fs(
            "read",
            "/media/a.jpg",
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.is_not_found());
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert!(err.to_string().contains("/media/a.jpg"));
    }

    #[test]
    fn other_io_maps_to_500() {
        let err = AppError::invalid_image("decode", "/media/a.jpg", "bad header");
        assert!(!err.is_not_found());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn validation_maps_to_400() {
        let err = AppError::validation("language", "must be de or en");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "invalid language: must be de or en");
    }

    #[test]
    fn api_error_keeps_status_and_truncated_body() {
        let body = vec![b'x'; 2000];
        let err: AppError = ApiError::new("imagepig", "https://example.test/flux", "bad status")
            .with_status(500)
            .with_body(&body)
            .into();
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        let AppError::Api(api) = &err else {
            panic!("expected api error");
        };
        assert_eq!(api.status, Some(500));
        assert_eq!(api.body.as_ref().map(String::len), Some(BODY_SNIPPET_LEN));
    }

    #[test]
    fn details_for_api_error() {
        let err: AppError = ApiError::new("imagepig", "/flux", "bad status")
            .with_status(503)
            .into();
        assert_eq!(err.details().as_deref(), Some("status 503"));
    }
}
