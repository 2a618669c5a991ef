use crate::common::{fixtures::seed_pages, server_utils::create_test_server};
use anyhow::Result;
use axum::http::StatusCode;
use chrono::{Duration, Utc};
use pagecast_service::AppState;
use pagecast_service::models::{MediaType, PostStatus};
use serde_json::{Value, json};
use uuid::Uuid;

#[tokio::test]
async fn test_create_draft_for_many_pages() -> Result<()> {
    let (server, state) = create_test_server();
    let pages = seed_pages(&state);

    let response = server
        .post("/api/v1/posts")
        .json(&json!({
            "page_ids": [pages.downtown.id, pages.harbor.id],
            "content": "Grand reopening this Saturday",
            "link": "https://example.com/reopening",
        }))
        .await;
    response.assert_status(StatusCode::CREATED);

    let body: Value = response.json();
    assert_eq!(body["success_count"], 2);
    assert_eq!(body["posts"].as_array().unwrap().len(), 2);
    assert_eq!(body["posts"][0]["status"], "pending");
    assert!(body["posts"][0]["scheduled_for"].is_null());

    assert_eq!(state.store().post_count(), 2);
    assert!(state.publisher().requests().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_create_publish_now_calls_webhook_per_page() -> Result<()> {
    let (server, state) = create_test_server();
    let pages = seed_pages(&state);

    let response = server
        .post("/api/v1/posts")
        .json(&json!({
            "page_ids": [pages.downtown.id, pages.airport.id],
            "content": "Fresh batch just out of the oven",
            "media_type": "photo",
            "media_url": "https://media.example.com/batch.jpg",
            "publish_now": true,
        }))
        .await;
    response.assert_status(StatusCode::CREATED);

    let body: Value = response.json();
    for post in body["posts"].as_array().unwrap() {
        assert_eq!(post["status"], "published");
        assert!(!post["published_at"].is_null());
    }

    let mut targets: Vec<String> = state
        .publisher()
        .requests()
        .into_iter()
        .map(|r| r.page_id)
        .collect();
    targets.sort();
    assert_eq!(targets, vec!["fb-airport", "fb-downtown"]);

    let request = &state.publisher().requests()[0];
    assert!(request.publish_now);
    assert_eq!(request.media_type, Some(MediaType::Photo));

    Ok(())
}

#[tokio::test]
async fn test_create_scheduled_in_future_is_not_published() -> Result<()> {
    let (server, state) = create_test_server();
    let pages = seed_pages(&state);
    let when = Utc::now() + Duration::days(3);

    let response = server
        .post("/api/v1/posts")
        .json(&json!({
            "page_ids": [pages.harbor.id],
            "content": "Trivia night",
            "scheduled_for": when.to_rfc3339(),
        }))
        .await;
    response.assert_status(StatusCode::CREATED);

    let body: Value = response.json();
    assert_eq!(body["posts"][0]["status"], "pending");
    assert!(!body["posts"][0]["scheduled_for"].is_null());
    assert!(state.publisher().requests().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_create_reports_partial_failure() -> Result<()> {
    let (server, state) = create_test_server();
    let pages = seed_pages(&state);
    state.publisher().fail_for("fb-harbor");

    let response = server
        .post("/api/v1/posts")
        .json(&json!({
            "page_ids": [pages.downtown.id, pages.harbor.id],
            "content": "Happy hour moved to 5pm",
            "publish_now": true,
        }))
        .await;
    response.assert_status(StatusCode::BAD_GATEWAY);

    let body: Value = response.json();
    assert_eq!(body["success_count"], 1);
    let failures = body["failures"].as_array().unwrap();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].as_str().unwrap().starts_with("Harbor ("));

    // successes are not rolled back and the failed page's post is marked
    let posts = state.store().posts();
    assert_eq!(posts.len(), 2);
    let harbor = posts.iter().find(|p| p.page_id == pages.harbor.id).unwrap();
    assert_eq!(harbor.status, PostStatus::Failed);
    assert!(harbor.error_message.is_some());
    let downtown = posts.iter().find(|p| p.page_id == pages.downtown.id).unwrap();
    assert_eq!(downtown.status, PostStatus::Published);

    Ok(())
}

#[tokio::test]
async fn test_create_with_unknown_page_id() -> Result<()> {
    let (server, state) = create_test_server();
    let pages = seed_pages(&state);
    let missing = Uuid::new_v4();

    let response = server
        .post("/api/v1/posts")
        .json(&json!({
            "page_ids": [pages.downtown.id, missing],
            "content": "Hello",
        }))
        .await;
    response.assert_status(StatusCode::BAD_GATEWAY);

    let body: Value = response.json();
    assert_eq!(body["success_count"], 1);
    assert_eq!(body["failures"][0], format!("{missing} (Page not found)"));
    assert_eq!(state.store().post_count(), 1);

    Ok(())
}

#[tokio::test]
async fn test_create_validation_errors() -> Result<()> {
    let (server, state) = create_test_server();
    let pages = seed_pages(&state);

    let cases = [
        json!({ "page_ids": [], "content": "Hello" }),
        json!({ "page_ids": [pages.downtown.id], "content": "   " }),
        json!({ "page_ids": [pages.downtown.id], "content": "Hi", "link": "ftp://example.com/x" }),
        json!({ "page_ids": [pages.downtown.id], "content": "Hi", "media_type": "video" }),
        json!({ "page_ids": [pages.downtown.id], "content": "x".repeat(63_207) }),
    ];

    for payload in cases {
        let response = server.post("/api/v1/posts").json(&payload).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert!(body["error"].is_string());
    }

    assert_eq!(state.store().post_count(), 0);
    assert!(state.publisher().requests().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_list_posts_filters() -> Result<()> {
    let (server, state) = create_test_server();
    let pages = seed_pages(&state);
    state.publisher().fail_for("fb-harbor");

    for (page, publish_now) in [
        (pages.downtown.id, false),
        (pages.harbor.id, true),
        (pages.airport.id, true),
    ] {
        server
            .post("/api/v1/posts")
            .json(&json!({
                "page_ids": [page],
                "content": "Weekend special",
                "publish_now": publish_now,
            }))
            .await;
    }

    let response = server.get("/api/v1/posts").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["items"].as_array().unwrap().len(), 3);
    assert_eq!(body["limit"], 100);

    let response = server
        .get("/api/v1/posts")
        .add_query_param("status", "failed")
        .await;
    let body: Value = response.json();
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["page_id"], pages.harbor.id.to_string());

    let response = server
        .get("/api/v1/posts")
        .add_query_param("page_id", pages.downtown.id)
        .await;
    let body: Value = response.json();
    assert_eq!(body["items"].as_array().unwrap().len(), 1);

    let response = server.get("/api/v1/posts?limit=2").await;
    let body: Value = response.json();
    assert_eq!(body["items"].as_array().unwrap().len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_list_posts_invalid_query() -> Result<()> {
    let (server, _state) = create_test_server();

    server
        .get("/api/v1/posts?limit=0")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    server
        .get("/api/v1/posts?limit=-1")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    server
        .get("/api/v1/posts?status=archived")
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn test_get_post_by_id() -> Result<()> {
    let (server, state) = create_test_server();
    let pages = seed_pages(&state);

    let created: Value = server
        .post("/api/v1/posts")
        .json(&json!({ "page_ids": [pages.downtown.id], "content": "Hello" }))
        .await
        .json();
    let id = created["posts"][0]["id"].as_str().unwrap().to_string();

    let response = server.get(&format!("/api/v1/posts/{id}")).await;
    response.assert_status_ok();
    let post: Value = response.json();
    assert_eq!(post["content"], "Hello");
    assert_eq!(post["media_type"], "none");

    server
        .get(&format!("/api/v1/posts/{}", Uuid::new_v4()))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    server
        .get("/api/v1/posts/not-a-uuid")
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn test_delete_post() -> Result<()> {
    let (server, state) = create_test_server();
    let pages = seed_pages(&state);

    let created: Value = server
        .post("/api/v1/posts")
        .json(&json!({ "page_ids": [pages.downtown.id], "content": "Soon gone" }))
        .await
        .json();
    let id = created["posts"][0]["id"].as_str().unwrap().to_string();

    server
        .delete(&format!("/api/v1/posts/{id}"))
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let body: Value = server.get("/api/v1/posts").await.json();
    assert!(body["items"].as_array().unwrap().is_empty());

    // a second delete finds nothing
    server
        .delete(&format!("/api/v1/posts/{id}"))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn test_publish_pending_post() -> Result<()> {
    let (server, state) = create_test_server();
    let pages = seed_pages(&state);

    let created: Value = server
        .post("/api/v1/posts")
        .json(&json!({ "page_ids": [pages.harbor.id], "content": "Draft to publish" }))
        .await
        .json();
    let id = created["posts"][0]["id"].as_str().unwrap().to_string();

    let response = server.post(&format!("/api/v1/posts/{id}/publish")).await;
    response.assert_status_ok();
    let post: Value = response.json();
    assert_eq!(post["status"], "published");

    let requests = state.publisher().requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].page_id, "fb-harbor");
    assert_eq!(requests[0].page_name, "Harbor");
    assert_eq!(requests[0].post_id.to_string(), id);

    // published is terminal
    let response = server.post(&format!("/api/v1/posts/{id}/publish")).await;
    response.assert_status(StatusCode::CONFLICT);
    assert_eq!(state.publisher().requests().len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_publish_failure_marks_post_failed() -> Result<()> {
    let (server, state) = create_test_server();
    let pages = seed_pages(&state);
    state.publisher().fail_for("fb-downtown");

    let created: Value = server
        .post("/api/v1/posts")
        .json(&json!({ "page_ids": [pages.downtown.id], "content": "Will bounce" }))
        .await
        .json();
    let id = created["posts"][0]["id"].as_str().unwrap().to_string();

    let response = server.post(&format!("/api/v1/posts/{id}/publish")).await;
    response.assert_status(StatusCode::BAD_GATEWAY);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("rejected"));

    let post: Value = server.get(&format!("/api/v1/posts/{id}")).await.json();
    assert_eq!(post["status"], "failed");

    server
        .post(&format!("/api/v1/posts/{}/publish", Uuid::new_v4()))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    Ok(())
}
