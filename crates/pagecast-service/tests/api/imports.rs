use crate::common::{fixtures::seed_pages, server_utils::create_test_server};
use anyhow::Result;
use axum::http::{StatusCode, header};
use pagecast_service::AppState;
use pagecast_service::models::PostStatus;
use serde_json::{Value, json};

const HEADER: &str = "location_name,location_number,post_content,link,scheduled_for,media_type,media_url";

#[tokio::test]
async fn test_import_counts_unresolved_row_as_failure() -> Result<()> {
    let (server, state) = create_test_server();
    seed_pages(&state);

    let csv = format!(
        "{HEADER}\n\
         Downtown,1234,\"Buy one, get one\",,,,\n\
         Nowhere,9999,Lost row,,,,\n\
         harbor,,Sunset deals,https://example.com/sunset,12/31/2099 6:30 PM,,\n"
    );

    let response = server.post("/api/v1/posts/import").text(csv).await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["success_count"], 2);
    assert_eq!(body["failures"], json!(["9999 (Location not found)"]));
    assert!(body["warnings"].as_array().unwrap().is_empty());

    let posts = state.store().posts();
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0].content, "Buy one, get one");
    assert!(posts[0].scheduled_for.is_none());
    assert!(posts[1].scheduled_for.is_some());
    assert!(posts.iter().all(|p| p.status == PostStatus::Pending));
    assert!(state.publisher().requests().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_import_collects_row_warnings() -> Result<()> {
    let (server, state) = create_test_server();
    seed_pages(&state);

    let csv = format!(
        "{HEADER}\n\
         Downtown,1234,Only five fields,,\n\
         ,,No location,,,,\n\
         Harbor,5678,Kept,,,,\n"
    );

    let response = server.post("/api/v1/posts/import").text(csv).await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["success_count"], 1);
    let warnings = body["warnings"].as_array().unwrap();
    assert_eq!(warnings.len(), 2);
    assert_eq!(warnings[0]["line"], 2);
    assert_eq!(warnings[1]["line"], 3);

    Ok(())
}

#[tokio::test]
async fn test_import_reads_spreadsheet_dates_and_flags_the_rest() -> Result<()> {
    let (server, state) = create_test_server();
    seed_pages(&state);

    let csv = format!(
        "{HEADER}\n\
         Downtown,1234,With seconds,,12/31/2099 2:00:00 PM,,\n\
         Harbor,5678,Month name,,\"December 31, 2099\",,\n\
         Airport,,Vague,,sometime soon,,\n"
    );

    let response = server.post("/api/v1/posts/import").text(csv).await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["success_count"], 3);
    let warnings = body["warnings"].as_array().unwrap();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0]["line"], 4);
    assert!(
        warnings[0]["reason"]
            .as_str()
            .unwrap()
            .contains("\"sometime soon\"")
    );

    let posts = state.store().posts();
    assert!(posts[0].scheduled_for.is_some());
    assert!(posts[1].scheduled_for.is_some());
    assert!(posts[2].is_draft());
    assert!(state.publisher().requests().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_import_accepts_byte_order_mark() -> Result<()> {
    let (server, state) = create_test_server();
    seed_pages(&state);

    let csv = format!("\u{feff}{HEADER}\nDowntown,1234,Saved from Excel,,,,\n");

    let response = server.post("/api/v1/posts/import").text(csv).await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["success_count"], 1);
    assert!(body["warnings"].as_array().unwrap().is_empty());
    assert_eq!(state.store().posts()[0].content, "Saved from Excel");

    Ok(())
}

#[tokio::test]
async fn test_import_invalid_row_fields_fail_without_dispatch() -> Result<()> {
    let (server, state) = create_test_server();
    seed_pages(&state);

    let csv = format!(
        "{HEADER}\n\
         Downtown,1234,Needs a file,,,video,\n\
         Harbor,5678,Odd media,,,hologram,https://example.com/x\n\
         Airport,,Fine,,,photo,https://example.com/a.jpg\n"
    );

    let body: Value = server.post("/api/v1/posts/import").text(csv).await.json();
    assert_eq!(body["success_count"], 1);
    let failures = body["failures"].as_array().unwrap();
    assert_eq!(failures.len(), 2);
    assert!(failures[0].as_str().unwrap().starts_with("Downtown ("));
    assert!(failures[1].as_str().unwrap().starts_with("Harbor ("));
    assert_eq!(state.store().post_count(), 1);

    Ok(())
}

#[tokio::test]
async fn test_import_rejects_missing_columns() -> Result<()> {
    let (server, state) = create_test_server();
    seed_pages(&state);

    server
        .post("/api/v1/posts/import")
        .text("location_name,link\nDowntown,https://example.com\n")
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    server
        .post("/api/v1/posts/import")
        .text("post_content,link\nHello,\n")
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    server
        .post("/api/v1/posts/import")
        .text("")
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    assert_eq!(state.store().post_count(), 0);

    Ok(())
}

#[tokio::test]
async fn test_import_header_only_is_empty_report() -> Result<()> {
    let (server, state) = create_test_server();
    seed_pages(&state);

    let response = server.post("/api/v1/posts/import").text(HEADER).await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["success_count"], 0);
    assert!(body["failures"].as_array().unwrap().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_preview_does_not_dispatch() -> Result<()> {
    let (server, state) = create_test_server();
    let pages = seed_pages(&state);

    let csv = format!(
        "{HEADER}\n\
         Downtown,5678,Code wins over name,,,,\n\
         Nowhere,,Unknown,,,,\n\
         Airport,,Later,,2099-12-31,,\n"
    );

    let response = server.post("/api/v1/posts/import/preview").text(csv).await;
    response.assert_status_ok();

    let body: Value = response.json();
    let rows = body["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 3);

    assert_eq!(rows[0]["page_id"], pages.harbor.id.to_string());
    assert_eq!(rows[0]["path"], "draft");
    assert!(rows[1]["page_id"].is_null());
    assert_eq!(rows[1]["error"], "Location not found: Nowhere");
    assert_eq!(rows[2]["page_name"], "Airport");
    assert_eq!(rows[2]["path"], "scheduled");

    assert_eq!(state.store().post_count(), 0);
    assert!(state.publisher().requests().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_export_as_csv() -> Result<()> {
    let (server, state) = create_test_server();
    let pages = seed_pages(&state);

    server
        .post("/api/v1/posts")
        .json(&json!({
            "page_ids": [pages.downtown.id],
            "content": "Tacos, burritos and more",
        }))
        .await
        .assert_status(StatusCode::CREATED);

    let response = server.get("/api/v1/posts/export").await;
    response.assert_status_ok();
    assert_eq!(
        response.header(header::CONTENT_TYPE),
        "text/csv; charset=utf-8"
    );

    let text = response.text();
    let mut lines = text.lines();
    assert_eq!(lines.next().unwrap(), format!("{HEADER},status"));
    assert_eq!(
        lines.next().unwrap(),
        "Downtown,1234,\"Tacos, burritos and more\",,,,,draft"
    );
    assert!(lines.next().is_none());

    let filtered = server
        .get("/api/v1/posts/export")
        .add_query_param("status", "published")
        .await
        .text();
    assert_eq!(filtered.lines().count(), 1);

    Ok(())
}

#[tokio::test]
async fn test_template_round_trips_through_preview() -> Result<()> {
    let (server, state) = create_test_server();
    seed_pages(&state);

    let response = server.get("/api/v1/posts/template").await;
    response.assert_status_ok();
    let template = response.text();
    assert!(template.starts_with(HEADER));

    let body: Value = server
        .post("/api/v1/posts/import/preview")
        .text(template)
        .await
        .json();
    let rows = body["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["page_name"], "Downtown");
    assert!(rows[0]["error"].is_null());

    Ok(())
}
