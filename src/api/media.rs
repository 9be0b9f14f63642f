//! Media folder and media processing endpoints.

use super::{blocking, parse_json, required};
use crate::context::AppContext;
use crate::error::{AppError, AppResult};
use crate::media::MediaProcessRequest;
use axum::{
    Json, Router,
    body::Bytes,
    extract::{Multipart, Query, State},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/media-list", get(list_media))
        .route("/api/upload-media", post(upload_media))
        .route("/api/delete-media", delete(delete_media))
        .route("/api/process-media", post(process_media))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FilenameResponse {
    pub filename: String,
}

#[derive(Debug, Deserialize)]
pub struct MediaQuery {
    pub file: Option<String>,
}

async fn list_media(State(ctx): State<AppContext>) -> AppResult<Json<Vec<String>>> {
    let library = ctx.library.clone();
    Ok(Json(blocking(move || library.list()).await?))
}

/// Store the multipart `file` field under a timestamp name.
async fn upload_media(
    State(ctx): State<AppContext>,
    mut multipart: Multipart,
) -> AppResult<Json<FilenameResponse>> {
    let form_error = |e: axum::extract::multipart::MultipartError| {
        AppError::validation("form_data", format!("Error parsing form data: {e}"))
    };

    while let Some(field) = multipart.next_field().await.map_err(form_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let original = field.file_name().unwrap_or_default().to_string();
        let data = field.bytes().await.map_err(form_error)?;

        let library = ctx.library.clone();
        let filename = blocking(move || library.upload(&original, &data)).await?;
        return Ok(Json(FilenameResponse { filename }));
    }
    Err(AppError::validation("file", "Error retrieving file"))
}

async fn delete_media(
    State(ctx): State<AppContext>,
    Query(query): Query<MediaQuery>,
) -> AppResult<Json<serde_json::Value>> {
    let file = required("file", query.file)?;
    let library = ctx.library.clone();
    blocking(move || library.delete(&file)).await?;
    Ok(Json(json!({ "status": "success" })))
}

/// Resize a media file into the asset folder (display image + `thumb_`).
async fn process_media(
    State(ctx): State<AppContext>,
    body: Bytes,
) -> AppResult<Json<FilenameResponse>> {
    let request: MediaProcessRequest = parse_json(&body)?;
    let media = ctx.media.clone();
    let filename = blocking(move || media.process_media_file(&request)).await?;
    Ok(Json(FilenameResponse { filename }))
}
