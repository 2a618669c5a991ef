use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

use crate::models::PostStatus;

/// Failure talking to the hosted table store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("post {id} is already {}", .status.as_str())]
    NotPending { id: Uuid, status: PostStatus },

    #[error("store request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("store returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid store URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("store returned no row for {0}")]
    EmptyResponse(&'static str),
}

/// Failure handing a post to the publish webhook.
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("publish webhook unreachable: {0}")]
    Request(#[from] reqwest::Error),

    #[error("publish webhook returned {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Failure uploading to the media store.
#[derive(Error, Debug)]
pub enum MediaError {
    #[error("media store unreachable: {0}")]
    Request(#[from] reqwest::Error),

    #[error("media store returned {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("invalid media object URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation failed: {0}")]
    ValidationError(#[from] crate::validation::ValidationError),

    #[error("Invalid CSV: {0}")]
    CsvError(#[from] crate::csv::CsvError),

    #[error("Store error: {0}")]
    StoreError(StoreError),

    #[error("Publish failed: {0}")]
    PublishError(#[from] PublishError),

    #[error("Media upload failed: {0}")]
    MediaError(#[from] MediaError),

    #[error("{0}")]
    BadRequest(String),

    #[error("Not found")]
    NotFound,

    #[error("Post is already {}", .0.as_str())]
    AlreadyFinal(PostStatus),

    #[error("Failed to create posts for: {}", .failures.join(", "))]
    SubmissionFailed {
        success_count: usize,
        failures: Vec<String>,
    },
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => ApiError::NotFound,
            StoreError::NotPending { status, .. } => ApiError::AlreadyFinal(status),
            other => ApiError::StoreError(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::ValidationError(_) | ApiError::CsvError(_) | ApiError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::AlreadyFinal(_) => StatusCode::CONFLICT,
            ApiError::StoreError(err) => {
                error!(error = %err, "Store error occurred");
                StatusCode::BAD_GATEWAY
            }
            ApiError::PublishError(err) => {
                error!(error = %err, "Publish webhook error occurred");
                StatusCode::BAD_GATEWAY
            }
            ApiError::MediaError(err) => {
                error!(error = %err, "Media store error occurred");
                StatusCode::BAD_GATEWAY
            }
            ApiError::SubmissionFailed { failures, .. } => {
                warn!(failed = failures.len(), "Submission partially failed");
                StatusCode::BAD_GATEWAY
            }
        };

        // Upstream error text is passed through so the dashboard can show it
        let body = match &self {
            ApiError::SubmissionFailed {
                success_count,
                failures,
            } => json!({
                "error": self.to_string(),
                "success_count": success_count,
                "failures": failures,
            }),
            _ => json!({ "error": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<crate::orchestrator::DispatchError> for ApiError {
    fn from(err: crate::orchestrator::DispatchError) -> Self {
        use crate::orchestrator::DispatchError;
        match err {
            DispatchError::Invalid(err) => ApiError::ValidationError(err),
            DispatchError::Store(err) => err.into(),
            DispatchError::Publish(err) => ApiError::PublishError(err),
        }
    }
}
