use super::parse_json;
use crate::context::AppContext;
use crate::error::AppResult;
use crate::posts::{CreatedPost, NewPostRequest};
use axum::{Json, Router, body::Bytes, extract::State, routing::post};

pub fn routes() -> Router<AppContext> {
    Router::new().route("/api/create-post", post(create_post))
}

async fn create_post(
    State(ctx): State<AppContext>,
    body: Bytes,
) -> AppResult<Json<CreatedPost>> {
    let request: NewPostRequest = parse_json(&body)?;
    tracing::info!(title = %request.title, language = %request.language, "create post");
    Ok(Json(ctx.posts.create_post(request).await?))
}
