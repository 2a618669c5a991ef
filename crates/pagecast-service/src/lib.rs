use axum::Router;

pub mod config;
pub mod csv;
pub mod errors;
pub mod media;
pub mod models;
pub mod orchestrator;
pub mod publisher;
pub mod repositories;
pub mod resolver;
pub mod routes;
pub mod schedule;
pub mod shutdown;
pub mod validation;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

use media::{MediaStore, RestMediaStore};
use publisher::{Publisher, WebhookPublisher};
use repositories::{PostStore, RestStore};

/// What every handler can reach: the three external collaborators.
pub trait AppState: Clone + Send + Sync + 'static {
    type Store: PostStore;
    type Publisher: Publisher;
    type Media: MediaStore;

    fn store(&self) -> &Self::Store;
    fn publisher(&self) -> &Self::Publisher;
    fn media(&self) -> &Self::Media;
}

#[derive(Clone)]
pub struct ServiceState<S, P, M> {
    store: S,
    publisher: P,
    media: M,
}

impl<S, P, M> ServiceState<S, P, M> {
    pub fn new(store: S, publisher: P, media: M) -> Self {
        Self {
            store,
            publisher,
            media,
        }
    }
}

impl<S: PostStore, P: Publisher, M: MediaStore> AppState for ServiceState<S, P, M> {
    type Store = S;
    type Publisher = P;
    type Media = M;

    fn store(&self) -> &S {
        &self.store
    }

    fn publisher(&self) -> &P {
        &self.publisher
    }

    fn media(&self) -> &M {
        &self.media
    }
}

/// State wired to the hosted store, the publish webhook and the media bucket.
pub type DefaultAppState = ServiceState<RestStore, WebhookPublisher, RestMediaStore>;

pub fn create_app<S: AppState>(state: S) -> Router {
    routes::create_router().with_state(state)
}
