use thiserror::Error;
use url::Url;

use crate::models::MediaType;

/// Facebook's ceiling on the length of a post body, in characters.
pub const MAX_CONTENT_CHARS: usize = 63_206;

pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;
pub const MAX_VIDEO_BYTES: usize = 100 * 1024 * 1024;

const IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];
const VIDEO_TYPES: &[&str] = &["video/mp4", "video/quicktime", "video/webm"];

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Post content cannot be empty")]
    EmptyContent,
    #[error("Post content is {len} characters, the limit is {max}")]
    ContentTooLong { len: usize, max: usize },
    #[error("URL cannot be empty")]
    EmptyUrl,
    #[error("Malformed URL: {0}")]
    MalformedUrl(String),
    #[error("URL must have a host")]
    MissingHost,
    #[error("Local addresses not allowed: {0}")]
    LocalAddress(String),
    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),
    #[error("Unknown media type: {0}")]
    UnknownMediaType(String),
    #[error("A {0} post needs a media URL")]
    MissingMediaUrl(&'static str),
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),
    #[error("File is {size} bytes, the {kind} limit is {max}")]
    FileTooLarge {
        kind: &'static str,
        size: usize,
        max: usize,
    },
    #[error("At least one page must be selected")]
    NoPages,
}

/// Parses a link or media URL that the publish webhook will have to reach.
/// Guarantees: HTTP/HTTPS scheme, non-empty host, no local addresses
pub fn validate_url(url_str: &str) -> Result<Url, ValidationError> {
    let url_str = url_str.trim();
    if url_str.is_empty() {
        return Err(ValidationError::EmptyUrl);
    }

    let url =
        Url::parse(url_str).map_err(|_| ValidationError::MalformedUrl(url_str.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(ValidationError::UnsupportedScheme(scheme.to_string())),
    }

    let host = url.host_str().ok_or(ValidationError::MissingHost)?;
    if host.is_empty() {
        return Err(ValidationError::MissingHost);
    }

    // Url already lowercases registered domain names
    if host == "localhost"
        || host.starts_with("127.")
        || host.starts_with("192.168.")
        || host.starts_with("10.")
    {
        return Err(ValidationError::LocalAddress(host.to_string()));
    }

    Ok(url)
}

pub fn normalize_url(url_str: &str) -> Result<String, ValidationError> {
    Ok(validate_url(url_str)?.to_string())
}

/// Rejects blank or over-long post bodies. The body itself is kept as typed.
pub fn validate_content(content: &str) -> Result<String, ValidationError> {
    if content.trim().is_empty() {
        return Err(ValidationError::EmptyContent);
    }

    let len = content.chars().count();
    if len > MAX_CONTENT_CHARS {
        return Err(ValidationError::ContentTooLong {
            len,
            max: MAX_CONTENT_CHARS,
        });
    }

    Ok(content.to_string())
}

/// Classifies an upload by MIME type and enforces the per-kind size ceiling.
pub fn validate_media_upload(content_type: &str, size: usize) -> Result<MediaType, ValidationError> {
    let content_type = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase();

    let (kind, max) = if IMAGE_TYPES.contains(&content_type.as_str()) {
        (MediaType::Photo, MAX_IMAGE_BYTES)
    } else if VIDEO_TYPES.contains(&content_type.as_str()) {
        (MediaType::Video, MAX_VIDEO_BYTES)
    } else {
        return Err(ValidationError::UnsupportedFileType(content_type));
    };

    if size > max {
        return Err(ValidationError::FileTooLarge {
            kind: kind.as_str(),
            size,
            max,
        });
    }

    Ok(kind)
}

/// File extension used for the stored object name.
pub fn extension_for(content_type: &str) -> &'static str {
    match content_type.split(';').next().unwrap_or_default().trim() {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "video/mp4" => "mp4",
        "video/quicktime" => "mov",
        "video/webm" => "webm",
        _ => "bin",
    }
}
