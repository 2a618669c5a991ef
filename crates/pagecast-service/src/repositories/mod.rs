mod rest;
mod traits;

pub use rest::RestStore;
pub use traits::{ListPostsParams, PostStore};
