use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::validation::{self, ValidationError};

/// A franchise location posts can be addressed to. Owned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: Uuid,
    pub name: String,
    /// Secondary numeric code the franchise uses for the location
    #[serde(default)]
    pub location_number: Option<String>,
    /// Identifier the publish webhook knows the page by
    pub fb_page_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Pending,
    Published,
    Failed,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Pending => "pending",
            PostStatus::Published => "published",
            PostStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PostStatus::Pending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    None,
    Photo,
    Video,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::None => "none",
            MediaType::Photo => "photo",
            MediaType::Video => "video",
        }
    }

    /// Lenient parse used for CSV cells; blank means no media.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        match raw.trim().to_lowercase().as_str() {
            "" | "none" => Ok(MediaType::None),
            "photo" | "image" => Ok(MediaType::Photo),
            "video" => Ok(MediaType::Video),
            other => Err(ValidationError::UnknownMediaType(other.to_string())),
        }
    }
}

/// Media attached to a post. Only exists when there is something to attach.
#[derive(Debug, Clone, PartialEq)]
pub struct Media {
    pub kind: MediaType,
    pub url: String,
}

impl Media {
    /// Builds the optional attachment from the flat `(media_type, media_url)` pair.
    pub fn from_parts(
        kind: MediaType,
        url: Option<&str>,
    ) -> Result<Option<Self>, ValidationError> {
        let url = url.map(str::trim).filter(|u| !u.is_empty());
        match (kind, url) {
            (MediaType::None, _) => Ok(None),
            (kind, Some(url)) => {
                let url = validation::normalize_url(url)?;
                Ok(Some(Media { kind, url }))
            }
            (kind, None) => Err(ValidationError::MissingMediaUrl(kind.as_str())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub page_id: Uuid,
    pub content: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub media_type: MediaType,
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(default)]
    pub scheduled_for: Option<DateTime<Utc>>,
    pub status: PostStatus,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// A pending post without a schedule is a draft.
    pub fn is_draft(&self) -> bool {
        self.status == PostStatus::Pending && self.scheduled_for.is_none()
    }
}

/// A validated post body that has not been addressed to a page yet.
#[derive(Debug, Clone, PartialEq)]
pub struct PostDraft {
    pub content: String,
    pub link: Option<String>,
    pub media: Option<Media>,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub publish_now: bool,
}

impl PostDraft {
    pub fn new(
        content: &str,
        link: Option<&str>,
        media: Option<Media>,
        scheduled_for: Option<DateTime<Utc>>,
        publish_now: bool,
    ) -> Result<Self, ValidationError> {
        let content = validation::validate_content(content)?;
        let link = link
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(validation::normalize_url)
            .transpose()?;

        Ok(PostDraft {
            content,
            link,
            media,
            scheduled_for,
            publish_now,
        })
    }
}

/// Row inserted into the store's `posts` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewPost {
    pub page_id: Uuid,
    pub content: String,
    pub link: Option<String>,
    pub media_type: MediaType,
    pub media_url: Option<String>,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub status: PostStatus,
}

impl NewPost {
    pub fn for_page(page: &Page, draft: &PostDraft) -> Self {
        NewPost {
            page_id: page.id,
            content: draft.content.clone(),
            link: draft.link.clone(),
            media_type: draft
                .media
                .as_ref()
                .map(|m| m.kind)
                .unwrap_or_default(),
            media_url: draft.media.as_ref().map(|m| m.url.clone()),
            scheduled_for: draft.scheduled_for,
            status: PostStatus::Pending,
        }
    }
}

/// Patch applied to a stored post when it leaves `pending`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusUpdate {
    pub status: PostStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl StatusUpdate {
    pub fn published(at: DateTime<Utc>) -> Self {
        StatusUpdate {
            status: PostStatus::Published,
            published_at: Some(at),
            error_message: None,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        StatusUpdate {
            status: PostStatus::Failed,
            published_at: None,
            error_message: Some(reason.into()),
        }
    }
}

/// Body POSTed to the publish webhook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishRequest {
    /// The page's external (Facebook) id, not the store id
    pub page_id: String,
    pub page_name: String,
    pub post_id: Uuid,
    pub content: String,
    pub link: Option<String>,
    pub scheduled_for: Option<String>,
    pub publish_now: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<MediaType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
}

impl PublishRequest {
    pub fn immediate(page: &Page, post: &Post) -> Self {
        let has_media = post.media_type != MediaType::None;
        PublishRequest {
            page_id: page.fb_page_id.clone(),
            page_name: page.name.clone(),
            post_id: post.id,
            content: post.content.clone(),
            link: post.link.clone(),
            scheduled_for: post.scheduled_for.map(|at| at.to_rfc3339()),
            publish_now: true,
            media_type: has_media.then_some(post.media_type),
            media_url: if has_media {
                post.media_url.clone()
            } else {
                None
            },
        }
    }
}
