use axum::{
    extract::{Multipart, State},
    response::Json as ResponseJson,
};
use serde::Serialize;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::AppState;
use crate::errors::ApiError;
use crate::media::MediaStore;
use crate::models::MediaType;
use crate::validation;

#[derive(Debug, Serialize)]
pub(super) struct UploadResponse {
    url: String,
    media_type: MediaType,
}

#[instrument(skip_all)]
pub(super) async fn upload_media<S: AppState>(
    State(state): State<S>,
    mut multipart: Multipart,
) -> Result<ResponseJson<UploadResponse>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::BadRequest(err.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|err| ApiError::BadRequest(err.body_text()))?;
        debug!(%content_type, size = bytes.len(), "Received upload");

        let media_type = validation::validate_media_upload(&content_type, bytes.len())?;
        let object_name = format!(
            "{}.{}",
            Uuid::new_v4(),
            validation::extension_for(&content_type)
        );

        let url = state
            .media()
            .upload(&object_name, &content_type, bytes)
            .await?;
        info!(%object_name, media_type = media_type.as_str(), "Stored upload");

        return Ok(ResponseJson(UploadResponse { url, media_type }));
    }

    Err(ApiError::BadRequest(
        "Multipart body has no 'file' field".to_string(),
    ))
}
