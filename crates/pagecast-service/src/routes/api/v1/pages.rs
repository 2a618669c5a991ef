use axum::{extract::State, response::Json as ResponseJson};
use tracing::{debug, instrument};

use crate::AppState;
use crate::errors::ApiError;
use crate::models::Page;
use crate::repositories::PostStore;

#[instrument(skip_all)]
pub(super) async fn list_pages<S: AppState>(
    State(state): State<S>,
) -> Result<ResponseJson<Vec<Page>>, ApiError> {
    let pages = state.store().list_pages().await?;
    debug!(count = pages.len(), "Listed pages");
    Ok(ResponseJson(pages))
}
