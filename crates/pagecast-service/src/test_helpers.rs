//! In-process stand-ins for the hosted store, the publish webhook and the
//! media store.

use async_trait::async_trait;
use axum::body::Bytes;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::errors::{MediaError, PublishError, StoreError};
use crate::media::MediaStore;
use crate::models::{NewPost, Page, Post, PostStatus, PublishRequest, StatusUpdate};
use crate::publisher::Publisher;
use crate::repositories::{ListPostsParams, PostStore};
use crate::ServiceState;

#[derive(Default)]
struct StoreData {
    pages: Vec<Page>,
    posts: Vec<Post>,
    offline: bool,
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    data: Arc<Mutex<StoreData>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_page(&self, name: &str, location_number: Option<&str>, fb_page_id: &str) -> Page {
        let page = Page {
            id: Uuid::new_v4(),
            name: name.to_string(),
            location_number: location_number.map(str::to_string),
            fb_page_id: fb_page_id.to_string(),
        };
        self.data.lock().unwrap().pages.push(page.clone());
        page
    }

    /// While offline every call fails the way an unreachable store would.
    pub fn set_offline(&self, offline: bool) {
        self.data.lock().unwrap().offline = offline;
    }

    pub fn post_count(&self) -> usize {
        self.data.lock().unwrap().posts.len()
    }

    pub fn posts(&self) -> Vec<Post> {
        self.data.lock().unwrap().posts.clone()
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, StoreData>, StoreError> {
        let data = self.data.lock().unwrap();
        if data.offline {
            return Err(StoreError::Status {
                status: 503,
                body: "store offline".to_string(),
            });
        }
        Ok(data)
    }
}

#[async_trait]
impl PostStore for InMemoryStore {
    async fn list_pages(&self) -> Result<Vec<Page>, StoreError> {
        let mut pages = self.guard()?.pages.clone();
        pages.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(pages)
    }

    async fn find_page(&self, id: Uuid) -> Result<Option<Page>, StoreError> {
        Ok(self.guard()?.pages.iter().find(|p| p.id == id).cloned())
    }

    async fn list_posts(&self, params: &ListPostsParams) -> Result<Vec<Post>, StoreError> {
        let data = self.guard()?;
        let mut posts: Vec<Post> = data
            .posts
            .iter()
            .rev()
            .filter(|p| params.status.is_none_or(|s| p.status == s))
            .filter(|p| params.page_id.is_none_or(|id| p.page_id == id))
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = params.limit {
            posts.truncate(limit as usize);
        }
        Ok(posts)
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<Post>, StoreError> {
        Ok(self.guard()?.posts.iter().find(|p| p.id == id).cloned())
    }

    async fn create_post(&self, post: &NewPost) -> Result<Post, StoreError> {
        let created = Post {
            id: Uuid::new_v4(),
            page_id: post.page_id,
            content: post.content.clone(),
            link: post.link.clone(),
            media_type: post.media_type,
            media_url: post.media_url.clone(),
            scheduled_for: post.scheduled_for,
            status: post.status,
            published_at: None,
            error_message: None,
            created_at: Utc::now(),
        };
        self.guard()?.posts.push(created.clone());
        Ok(created)
    }

    async fn update_status(&self, id: Uuid, update: &StatusUpdate) -> Result<Post, StoreError> {
        let mut data = self.guard()?;
        let post = data
            .posts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(StoreError::NotFound { entity: "post", id })?;
        if post.status != PostStatus::Pending {
            return Err(StoreError::NotPending {
                id,
                status: post.status,
            });
        }
        post.status = update.status;
        post.published_at = update.published_at.or(post.published_at);
        post.error_message = update.error_message.clone().or(post.error_message.take());
        Ok(post.clone())
    }

    async fn delete_post(&self, id: Uuid) -> Result<(), StoreError> {
        let mut data = self.guard()?;
        let before = data.posts.len();
        data.posts.retain(|p| p.id != id);
        if data.posts.len() == before {
            return Err(StoreError::NotFound { entity: "post", id });
        }
        Ok(())
    }
}

/// Records every webhook call; rejects calls for pages marked with [`fail_for`].
///
/// [`fail_for`]: RecordingPublisher::fail_for
#[derive(Clone, Default)]
pub struct RecordingPublisher {
    requests: Arc<Mutex<Vec<PublishRequest>>>,
    failing: Arc<Mutex<HashSet<String>>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, fb_page_id: &str) {
        self.failing.lock().unwrap().insert(fb_page_id.to_string());
    }

    pub fn requests(&self) -> Vec<PublishRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, request: &PublishRequest) -> Result<(), PublishError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.failing.lock().unwrap().contains(&request.page_id) {
            return Err(PublishError::Rejected {
                status: 500,
                body: format!("page {} rejected the post", request.page_id),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub name: String,
    pub content_type: String,
    pub size: usize,
}

#[derive(Clone, Default)]
pub struct InMemoryMediaStore {
    objects: Arc<Mutex<Vec<StoredObject>>>,
}

impl InMemoryMediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn objects(&self) -> Vec<StoredObject> {
        self.objects.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaStore for InMemoryMediaStore {
    async fn upload(
        &self,
        object_name: &str,
        content_type: &str,
        bytes: Bytes,
    ) -> Result<String, MediaError> {
        self.objects.lock().unwrap().push(StoredObject {
            name: object_name.to_string(),
            content_type: content_type.to_string(),
            size: bytes.len(),
        });
        Ok(format!("https://media.example.com/{object_name}"))
    }
}

pub type TestAppState = ServiceState<InMemoryStore, RecordingPublisher, InMemoryMediaStore>;

pub fn test_state() -> TestAppState {
    ServiceState::new(
        InMemoryStore::new(),
        RecordingPublisher::new(),
        InMemoryMediaStore::new(),
    )
}
