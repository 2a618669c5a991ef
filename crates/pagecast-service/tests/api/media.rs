use crate::common::server_utils::create_test_server;
use anyhow::Result;
use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use pagecast_service::AppState;
use serde_json::Value;

fn file_form(bytes: Vec<u8>, file_name: &str, mime: &str) -> MultipartForm {
    MultipartForm::new().add_part(
        "file",
        Part::bytes(bytes).file_name(file_name).mime_type(mime),
    )
}

#[tokio::test]
async fn test_upload_photo() -> Result<()> {
    let (server, state) = create_test_server();

    let response = server
        .post("/api/v1/media")
        .multipart(file_form(vec![0xFF, 0xD8, 0xFF, 0xE0], "storefront.jpg", "image/jpeg"))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["media_type"], "photo");
    let url = body["url"].as_str().unwrap();
    assert!(url.starts_with("https://media.example.com/"));
    assert!(url.ends_with(".jpg"));

    let objects = state.media().objects();
    assert_eq!(objects.len(), 1);
    assert_eq!(objects[0].content_type, "image/jpeg");
    assert_eq!(objects[0].size, 4);

    Ok(())
}

#[tokio::test]
async fn test_upload_video() -> Result<()> {
    let (server, _state) = create_test_server();

    let response = server
        .post("/api/v1/media")
        .multipart(file_form(vec![0; 1024], "tour.mp4", "video/mp4"))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["media_type"], "video");
    assert!(body["url"].as_str().unwrap().ends_with(".mp4"));

    Ok(())
}

#[tokio::test]
async fn test_upload_rejects_unsupported_type() -> Result<()> {
    let (server, state) = create_test_server();

    let response = server
        .post("/api/v1/media")
        .multipart(file_form(b"%PDF-1.7".to_vec(), "menu.pdf", "application/pdf"))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(state.media().objects().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_upload_rejects_oversized_photo() -> Result<()> {
    let (server, state) = create_test_server();

    let response = server
        .post("/api/v1/media")
        .multipart(file_form(
            vec![0; 10 * 1024 * 1024 + 1],
            "huge.png",
            "image/png",
        ))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(state.media().objects().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_upload_without_file_field() -> Result<()> {
    let (server, _state) = create_test_server();

    let form = MultipartForm::new().add_text("caption", "no file here");
    let response = server.post("/api/v1/media").multipart(form).await;
    response.assert_status(StatusCode::BAD_REQUEST);

    Ok(())
}
