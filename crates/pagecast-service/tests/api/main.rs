#[path = "../common/mod.rs"]
mod common;

mod imports;
mod media;
mod pages;
mod posts;
