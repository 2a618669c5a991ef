use crate::common::{fixtures::seed_pages, server_utils::create_test_server};
use anyhow::Result;
use axum::http::StatusCode;
use pagecast_service::AppState;
use serde_json::Value;

#[tokio::test]
async fn test_health_endpoint() -> Result<()> {
    let (server, _state) = create_test_server();

    let response = server.get("/health").await;
    response.assert_status_ok();
    assert_eq!(response.text(), "OK");

    Ok(())
}

#[tokio::test]
async fn test_list_pages_sorted_by_name() -> Result<()> {
    let (server, state) = create_test_server();
    seed_pages(&state);

    let response = server.get("/api/v1/pages").await;
    response.assert_status_ok();

    let pages: Value = response.json();
    let names: Vec<&str> = pages
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Airport", "Downtown", "Harbor"]);
    assert_eq!(pages[1]["location_number"], "1234");
    assert_eq!(pages[1]["fb_page_id"], "fb-downtown");
    assert!(pages[0]["location_number"].is_null());

    Ok(())
}

#[tokio::test]
async fn test_store_outage_is_bad_gateway() -> Result<()> {
    let (server, state) = create_test_server();
    state.store().set_offline(true);

    let response = server.get("/api/v1/pages").await;
    response.assert_status(StatusCode::BAD_GATEWAY);

    let body: Value = response.json();
    assert!(
        body["error"].as_str().unwrap().contains("store offline"),
        "upstream text should be passed through: {body}"
    );

    Ok(())
}

#[tokio::test]
async fn test_unknown_route_is_not_found() -> Result<()> {
    let (server, _state) = create_test_server();

    let response = server.get("/api/v2/pages").await;
    response.assert_status(StatusCode::NOT_FOUND);

    Ok(())
}
