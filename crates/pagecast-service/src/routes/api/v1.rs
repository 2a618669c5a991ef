use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

use crate::AppState;
use crate::validation::MAX_VIDEO_BYTES;

mod imports;
mod media;
mod pages;
mod posts;

/// Multipart framing on top of the largest accepted file.
const UPLOAD_BODY_LIMIT: usize = MAX_VIDEO_BYTES + 1024 * 1024;

pub fn create_api_v1_router<S: AppState>() -> Router<S> {
    Router::new()
        .route("/pages", get(pages::list_pages::<S>))
        .route(
            "/posts",
            get(posts::list_posts::<S>).post(posts::create_post::<S>),
        )
        .route("/posts/import", post(imports::import_posts::<S>))
        .route("/posts/import/preview", post(imports::preview_import::<S>))
        .route("/posts/export", get(imports::export_posts::<S>))
        .route("/posts/template", get(imports::template))
        .route(
            "/posts/{id}",
            get(posts::get_post::<S>).delete(posts::delete_post::<S>),
        )
        .route("/posts/{id}/publish", post(posts::publish_post::<S>))
        .route(
            "/media",
            post(media::upload_media::<S>).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
}
