use crate::errors::StoreError;
use crate::models::{NewPost, Page, Post, PostStatus, StatusUpdate};
use async_trait::async_trait;
use serde::Deserialize;
use uuid::Uuid;

const DEFAULT_LIST_LIMIT: u32 = 100;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListPostsParams {
    pub status: Option<PostStatus>,
    pub page_id: Option<Uuid>,
    pub limit: Option<u32>,
}

impl ListPostsParams {
    pub fn effective_limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_LIST_LIMIT)
    }
}

/// Pages and posts as held by the hosted table store.
///
/// Posts are listed newest first, pages by name.
#[async_trait]
pub trait PostStore: Clone + Send + Sync + 'static {
    async fn list_pages(&self) -> Result<Vec<Page>, StoreError>;
    async fn find_page(&self, id: Uuid) -> Result<Option<Page>, StoreError>;
    async fn list_posts(&self, params: &ListPostsParams) -> Result<Vec<Post>, StoreError>;
    async fn find_post(&self, id: Uuid) -> Result<Option<Post>, StoreError>;
    async fn create_post(&self, post: &NewPost) -> Result<Post, StoreError>;
    /// Only a pending post changes status. Fails with [`StoreError::NotPending`]
    /// when the post has already been published or failed, and with
    /// [`StoreError::NotFound`] when no post has this id.
    async fn update_status(&self, id: Uuid, update: &StatusUpdate) -> Result<Post, StoreError>;
    /// Fails with [`StoreError::NotFound`] when nothing was deleted.
    async fn delete_post(&self, id: Uuid) -> Result<(), StoreError>;
}
