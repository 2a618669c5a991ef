use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::Json as ResponseJson,
};
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::AppState;
use crate::errors::ApiError;
use crate::models::{Media, MediaType, Post, PostDraft};
use crate::orchestrator::{self, Dispatcher};
use crate::repositories::{ListPostsParams, PostStore};
use crate::validation::ValidationError;

#[derive(Debug, Deserialize)]
pub(super) struct CreatePostRequest {
    page_ids: Vec<Uuid>,
    content: String,
    link: Option<String>,
    #[serde(default)]
    media_type: MediaType,
    media_url: Option<String>,
    scheduled_for: Option<DateTime<Utc>>,
    #[serde(default)]
    publish_now: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct CreatePostResponse {
    success_count: usize,
    posts: Vec<Post>,
}

#[derive(Debug, Serialize)]
pub(super) struct ListPostsResponse {
    items: Vec<Post>,
    limit: u32,
}

#[instrument(skip_all, fields(pages = payload.page_ids.len(), publish_now = payload.publish_now, has_schedule = payload.scheduled_for.is_some()))]
pub(super) async fn create_post<S: AppState>(
    State(state): State<S>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<(StatusCode, ResponseJson<CreatePostResponse>), ApiError> {
    debug!("Processing create post request");

    let mut page_ids = Vec::with_capacity(payload.page_ids.len());
    for id in payload.page_ids {
        if !page_ids.contains(&id) {
            page_ids.push(id);
        }
    }
    if page_ids.is_empty() {
        return Err(ValidationError::NoPages.into());
    }

    let media = Media::from_parts(payload.media_type, payload.media_url.as_deref())?;
    let draft = PostDraft::new(
        &payload.content,
        payload.link.as_deref(),
        media,
        payload.scheduled_for,
        payload.publish_now,
    )?;

    let report = orchestrator::submit_to_pages(
        state.store(),
        state.publisher(),
        &draft,
        &page_ids,
        &Local::now(),
    )
    .await?;

    if !report.is_success() {
        return Err(ApiError::SubmissionFailed {
            success_count: report.success_count,
            failures: report.failures,
        });
    }

    info!(created = report.success_count, "Created posts");
    Ok((
        StatusCode::CREATED,
        ResponseJson(CreatePostResponse {
            success_count: report.success_count,
            posts: report.posts,
        }),
    ))
}

#[instrument(skip_all, fields(status = ?params.status, page_id = ?params.page_id, limit = params.limit))]
pub(super) async fn list_posts<S: AppState>(
    State(state): State<S>,
    Query(params): Query<ListPostsParams>,
) -> Result<ResponseJson<ListPostsResponse>, ApiError> {
    let limit = params.effective_limit();
    if limit == 0 {
        return Err(ApiError::BadRequest(
            "Limit must be greater than zero".to_string(),
        ));
    }
    let params = ListPostsParams {
        limit: Some(limit),
        ..params
    };

    let items = state.store().list_posts(&params).await?;
    debug!(count = items.len(), "Listed posts");

    Ok(ResponseJson(ListPostsResponse { items, limit }))
}

#[instrument(skip_all, fields(post_id = %id))]
pub(super) async fn get_post<S: AppState>(
    State(state): State<S>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<Post>, ApiError> {
    let post = state.store().find_post(id).await?.ok_or(ApiError::NotFound)?;
    Ok(ResponseJson(post))
}

#[instrument(skip_all, fields(post_id = %id))]
pub(super) async fn delete_post<S: AppState>(
    State(state): State<S>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.store().delete_post(id).await?;
    info!("Deleted post");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip_all, fields(post_id = %id))]
pub(super) async fn publish_post<S: AppState>(
    State(state): State<S>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<Post>, ApiError> {
    let store = state.store();
    let post = store.find_post(id).await?.ok_or(ApiError::NotFound)?;

    if post.status.is_terminal() {
        warn!(status = post.status.as_str(), "Refusing to publish a finished post");
        return Err(ApiError::AlreadyFinal(post.status));
    }

    let page = store
        .find_page(post.page_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    let published = Dispatcher::new(store, state.publisher())
        .publish(&page, post)
        .await?;
    Ok(ResponseJson(published))
}
