use super::traits::{ListPostsParams, PostStore};
use crate::errors::StoreError;
use crate::models::{NewPost, Page, Post, StatusUpdate};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use std::fmt;
use tracing::{debug, warn};
use uuid::Uuid;

/// [`PostStore`] over a PostgREST-style HTTP API (`/rest/v1/<table>`).
#[derive(Clone)]
pub struct RestStore {
    http: Client,
    base_url: Url,
    api_key: String,
}

impl fmt::Debug for RestStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestStore")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl RestStore {
    /// `base_url` is the REST root, e.g. `https://project.example.co/rest/v1/`.
    pub fn new(http: Client, base_url: Url, api_key: String) -> Self {
        Self {
            http,
            base_url,
            api_key,
        }
    }

    fn table(&self, table: &str) -> Result<Url, StoreError> {
        Ok(self.base_url.join(table)?)
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, StoreError> {
        let url = self.table(table)?;
        debug!(%url, ?query, "Store select");
        let res = self
            .authed(self.http.get(url))
            .query(&query)
            .send()
            .await?;
        Ok(check(res).await?.json().await?)
    }
}

async fn check(res: Response) -> Result<Response, StoreError> {
    if res.status().is_success() {
        return Ok(res);
    }

    let status = res.status().as_u16();
    let body = res.text().await.unwrap_or_default();
    warn!(status, body = %body, "Store request rejected");
    Err(StoreError::Status { status, body })
}

const PENDING_ONLY: &str = "eq.pending";

fn eq(id: Uuid) -> String {
    format!("eq.{id}")
}

#[async_trait]
impl PostStore for RestStore {
    async fn list_pages(&self) -> Result<Vec<Page>, StoreError> {
        self.fetch(
            "pages",
            &[("select", "*".to_string()), ("order", "name.asc".to_string())],
        )
        .await
    }

    async fn find_page(&self, id: Uuid) -> Result<Option<Page>, StoreError> {
        let rows: Vec<Page> = self
            .fetch("pages", &[("select", "*".to_string()), ("id", eq(id))])
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn list_posts(&self, params: &ListPostsParams) -> Result<Vec<Post>, StoreError> {
        let mut query = vec![
            ("select", "*".to_string()),
            ("order", "created_at.desc".to_string()),
            (
                "limit",
                params.effective_limit().to_string(),
            ),
        ];
        if let Some(status) = params.status {
            query.push(("status", format!("eq.{}", status.as_str())));
        }
        if let Some(page_id) = params.page_id {
            query.push(("page_id", eq(page_id)));
        }

        self.fetch("posts", &query).await
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<Post>, StoreError> {
        let rows: Vec<Post> = self
            .fetch("posts", &[("select", "*".to_string()), ("id", eq(id))])
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn create_post(&self, post: &NewPost) -> Result<Post, StoreError> {
        let res = self
            .authed(self.http.post(self.table("posts")?))
            .header("Prefer", "return=representation")
            .json(post)
            .send()
            .await?;

        let rows: Vec<Post> = check(res).await?.json().await?;
        rows.into_iter()
            .next()
            .ok_or(StoreError::EmptyResponse("insert into posts"))
    }

    async fn update_status(&self, id: Uuid, update: &StatusUpdate) -> Result<Post, StoreError> {
        let res = self
            .authed(self.http.patch(self.table("posts")?))
            .query(&[("id", eq(id)), ("status", PENDING_ONLY.to_string())])
            .header("Prefer", "return=representation")
            .json(update)
            .send()
            .await?;

        let rows: Vec<Post> = check(res).await?.json().await?;
        if let Some(post) = rows.into_iter().next() {
            return Ok(post);
        }

        // Nothing matched: either the id is unknown or the post moved on
        match self.find_post(id).await? {
            Some(post) => {
                debug!(post_id = %id, status = post.status.as_str(), "Status update skipped");
                Err(StoreError::NotPending {
                    id,
                    status: post.status,
                })
            }
            None => Err(StoreError::NotFound {
                entity: "post",
                id,
            }),
        }
    }

    async fn delete_post(&self, id: Uuid) -> Result<(), StoreError> {
        let res = self
            .authed(self.http.delete(self.table("posts")?))
            .query(&[("id", eq(id))])
            .header("Prefer", "return=representation")
            .send()
            .await?;

        let rows: Vec<Post> = check(res).await?.json().await?;
        if rows.is_empty() {
            return Err(StoreError::NotFound {
                entity: "post",
                id,
            });
        }
        Ok(())
    }
}
