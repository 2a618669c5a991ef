use async_trait::async_trait;
use axum::body::Bytes;
use reqwest::{Client, Url};
use std::fmt;
use tracing::{debug, warn};

use crate::errors::MediaError;

/// Object storage for post photos and videos.
#[async_trait]
pub trait MediaStore: Clone + Send + Sync + 'static {
    /// Stores `bytes` under `object_name` and returns its public URL.
    async fn upload(
        &self,
        object_name: &str,
        content_type: &str,
        bytes: Bytes,
    ) -> Result<String, MediaError>;
}

/// [`MediaStore`] over a bucket-style storage API (`/storage/v1/object/...`).
#[derive(Clone)]
pub struct RestMediaStore {
    http: Client,
    base_url: Url,
    bucket: String,
    api_key: String,
}

impl fmt::Debug for RestMediaStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestMediaStore")
            .field("base_url", &self.base_url)
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}

impl RestMediaStore {
    /// `base_url` is the storage root, e.g. `https://project.example.co/storage/v1/`.
    pub fn new(http: Client, base_url: Url, bucket: String, api_key: String) -> Self {
        Self {
            http,
            base_url,
            bucket,
            api_key,
        }
    }

    fn object_url(&self, object_name: &str) -> Result<Url, url::ParseError> {
        self.base_url
            .join(&format!("object/{}/{}", self.bucket, object_name))
    }

    pub fn public_url(&self, object_name: &str) -> Result<Url, url::ParseError> {
        self.base_url
            .join(&format!("object/public/{}/{}", self.bucket, object_name))
    }
}

#[async_trait]
impl MediaStore for RestMediaStore {
    async fn upload(
        &self,
        object_name: &str,
        content_type: &str,
        bytes: Bytes,
    ) -> Result<String, MediaError> {
        let url = self.object_url(object_name)?;
        let public_url = self.public_url(object_name)?;

        debug!(%url, size = bytes.len(), content_type, "Uploading media");

        let res = self
            .http
            .post(url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Content-Type", content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            warn!(status, body = %body, "Media upload rejected");
            return Err(MediaError::Rejected { status, body });
        }

        Ok(public_url.to_string())
    }
}
