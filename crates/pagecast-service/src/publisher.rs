use async_trait::async_trait;
use reqwest::{Client, Url};
use std::fmt;
use tracing::{debug, warn};

use crate::errors::PublishError;
use crate::models::PublishRequest;

/// The external workflow that actually posts to Facebook.
///
/// Only success or failure of the call is interpreted, never the body.
#[async_trait]
pub trait Publisher: Clone + Send + Sync + 'static {
    async fn publish(&self, request: &PublishRequest) -> Result<(), PublishError>;
}

#[derive(Clone)]
pub struct WebhookPublisher {
    http: Client,
    url: Url,
}

impl fmt::Debug for WebhookPublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // webhook URLs often embed a secret path segment
        f.debug_struct("WebhookPublisher")
            .field("host", &self.url.host_str())
            .finish_non_exhaustive()
    }
}

impl WebhookPublisher {
    pub fn new(http: Client, url: Url) -> Self {
        Self { http, url }
    }
}

#[async_trait]
impl Publisher for WebhookPublisher {
    async fn publish(&self, request: &PublishRequest) -> Result<(), PublishError> {
        debug!(
            post_id = %request.post_id,
            page = %request.page_name,
            "Calling publish webhook"
        );

        let res = self.http.post(self.url.clone()).json(request).send().await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            warn!(status, body = %body, post_id = %request.post_id, "Publish webhook rejected post");
            return Err(PublishError::Rejected { status, body });
        }

        Ok(())
    }
}
