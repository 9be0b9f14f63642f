//! Post files, counters and the editor configuration.

use super::{blocking, required};
use crate::content::Language;
use crate::context::AppContext;
use crate::error::AppResult;
use crate::taxonomy::{Taxonomy, Term};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde::Deserialize;
use serde_json::json;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/config", get(get_config))
        .route("/api/list", get(list_posts))
        .route("/api/load", get(load_post))
        .route("/api/save", post(save_post))
        .route("/api/delete", delete(delete_post))
        .route("/api/tags", get(get_tags))
        .route("/api/categories", get(get_categories))
}

#[derive(Debug, Deserialize)]
pub struct FileQuery {
    pub file: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub lang: Option<String>,
}

/// Configuration as the editor sees it; secrets are not serialized.
async fn get_config(State(ctx): State<AppContext>) -> Response {
    Json(ctx.config.as_ref().clone()).into_response()
}

/// One language as a list, or both keyed by language code.
async fn list_posts(
    State(ctx): State<AppContext>,
    Query(query): Query<ListQuery>,
) -> AppResult<Response> {
    let content = ctx.content.clone();
    match query.lang.filter(|l| !l.is_empty()) {
        Some(lang) => {
            let language: Language = lang.parse()?;
            let files = blocking(move || content.list(language)).await?;
            Ok(Json(files).into_response())
        }
        None => {
            let listing = blocking(move || content.list_all()).await?;
            Ok(Json(listing).into_response())
        }
    }
}

async fn load_post(
    State(ctx): State<AppContext>,
    Query(query): Query<FileQuery>,
) -> AppResult<Response> {
    let file = required("file", query.file)?;
    let content = ctx.content.clone();
    let text = blocking(move || content.load(&file)).await?;
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], text).into_response())
}

async fn save_post(
    State(ctx): State<AppContext>,
    Query(query): Query<FileQuery>,
    body: Bytes,
) -> AppResult<Json<serde_json::Value>> {
    let file = required("file", query.file)?;
    let content = ctx.content.clone();
    blocking(move || content.save(&file, &body)).await?;
    Ok(Json(json!({ "status": "success" })))
}

async fn delete_post(
    State(ctx): State<AppContext>,
    Query(query): Query<FileQuery>,
) -> AppResult<Json<serde_json::Value>> {
    let file = required("file", query.file)?;
    let content = ctx.content.clone();
    blocking(move || content.delete(&file)).await?;
    Ok(Json(json!({ "status": "success" })))
}

async fn get_tags(State(ctx): State<AppContext>) -> AppResult<Json<Vec<Term>>> {
    let store = ctx.taxonomy.clone();
    Ok(Json(blocking(move || store.load(Taxonomy::Tags)).await?))
}

async fn get_categories(State(ctx): State<AppContext>) -> AppResult<Json<Vec<Term>>> {
    let store = ctx.taxonomy.clone();
    Ok(Json(blocking(move || store.load(Taxonomy::Categories)).await?))
}
