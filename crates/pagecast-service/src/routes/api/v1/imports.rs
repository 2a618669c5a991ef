use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Json as ResponseJson},
};
use chrono::Local;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::AppState;
use crate::csv::{self, RowWarning};
use crate::errors::ApiError;
use crate::orchestrator::{self, RowPreview, SubmissionReport};
use crate::repositories::{ListPostsParams, PostStore};

const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

#[derive(Debug, Serialize)]
pub(super) struct PreviewResponse {
    rows: Vec<RowPreview>,
    warnings: Vec<RowWarning>,
}

/// Bulk submission of a CSV body. Per-row failures land in the report, not
/// in the status code.
#[instrument(skip_all, fields(bytes = body.len()))]
pub(super) async fn import_posts<S: AppState>(
    State(state): State<S>,
    body: String,
) -> Result<ResponseJson<SubmissionReport>, ApiError> {
    let import = csv::parse(&body)?;
    debug!(
        rows = import.rows.len(),
        warnings = import.warnings.len(),
        "CSV parsed"
    );

    let mut report =
        orchestrator::submit_rows(state.store(), state.publisher(), &import.rows, &Local::now())
            .await?;

    report.warnings.extend(import.warnings);
    report.warnings.sort_by_key(|w| w.line);

    info!(
        succeeded = report.success_count,
        failed = report.failures.len(),
        warnings = report.warnings.len(),
        "CSV import finished"
    );
    Ok(ResponseJson(report))
}

#[instrument(skip_all, fields(bytes = body.len()))]
pub(super) async fn preview_import<S: AppState>(
    State(state): State<S>,
    body: String,
) -> Result<ResponseJson<PreviewResponse>, ApiError> {
    let import = csv::parse(&body)?;
    let pages = state.store().list_pages().await?;
    let rows = orchestrator::preview_rows(&import.rows, &pages, &Local::now());

    Ok(ResponseJson(PreviewResponse {
        rows,
        warnings: import.warnings,
    }))
}

#[instrument(skip_all, fields(status = ?params.status, page_id = ?params.page_id))]
pub(super) async fn export_posts<S: AppState>(
    State(state): State<S>,
    Query(params): Query<ListPostsParams>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store();
    let posts = store.list_posts(&params).await?;
    let pages = store.list_pages().await?;
    debug!(count = posts.len(), "Exporting posts");

    Ok((
        [
            (header::CONTENT_TYPE, CSV_CONTENT_TYPE),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"posts.csv\"",
            ),
        ],
        csv::export(&posts, &pages),
    ))
}

pub(super) async fn template() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, CSV_CONTENT_TYPE),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"posts-template.csv\"",
            ),
        ],
        csv::template(),
    )
}
