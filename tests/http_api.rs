//! HTTP API tests driving the router in-process.

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use pr_review_service::api;
use pr_review_service::selector::AssignmentPolicy;
use pr_review_service::store::{MemoryStore, Store};
use pr_review_service::ReviewService;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn app() -> Router {
    let service = ReviewService::with_rng(
        MemoryStore::new(),
        AssignmentPolicy::default(),
        StdRng::seed_from_u64(17),
    );
    api::router(Arc::new(service), Duration::from_secs(5))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, uri, Some(body)).await
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None).await
}

async fn seed_core_team(app: &Router) {
    let (status, _) = post(
        app,
        "/team/add",
        json!({
            "team_name": "core",
            "members": [
                {"user_id": "A", "username": "alice", "is_active": true},
                {"user_id": "B", "username": "bob", "is_active": true},
                {"user_id": "C", "username": "carol", "is_active": true},
                {"user_id": "D", "username": "dave", "is_active": false}
            ]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_health() {
    let response = app()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"OK");
}

#[tokio::test]
async fn test_team_endpoints() {
    let app = app();
    seed_core_team(&app).await;

    let (status, body) = get(&app, "/team/get?team_name=core").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["team_name"], "core");
    assert_eq!(body["members"].as_array().unwrap().len(), 4);
    assert_eq!(body["members"][0]["username"], "alice");

    let (status, body) = post(&app, "/team/add", json!({"team_name": "core", "members": []})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "TEAM_EXISTS");

    let (status, body) = get(&app, "/team/get?team_name=ghost").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, body) = get(&app, "/team/get").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn test_pull_request_flow() {
    let app = app();
    seed_core_team(&app).await;

    let (status, body) = post(
        &app,
        "/pullRequest/create",
        json!({"pull_request_id": "p1", "pull_request_name": "Add search", "author_id": "A"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["pr"]["status"], "OPEN");
    assert_eq!(body["pr"]["assigned_reviewers"].as_array().unwrap().len(), 2);
    assert!(body["pr"]["createdAt"].is_string());
    assert!(body["pr"].get("mergedAt").is_none());

    let (status, body) = post(
        &app,
        "/pullRequest/reassign",
        json!({"pull_request_id": "p1", "old_user_id": "B"}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "NO_CANDIDATE");

    let (status, body) = post(&app, "/users/setIsActive", json!({"user_id": "D", "is_active": true})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["team_name"], "core");
    assert_eq!(body["user"]["is_active"], true);

    let (status, body) = post(
        &app,
        "/pullRequest/reassign",
        json!({"pull_request_id": "p1", "old_user_id": "B"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["replaced_by"], "D");

    let (status, body) = get(&app, "/users/getReview?user_id=D").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], "D");
    assert_eq!(body["pull_requests"][0]["pull_request_id"], "p1");
    assert_eq!(body["pull_requests"][0]["status"], "OPEN");

    let (status, body) = post(&app, "/pullRequest/merge", json!({"pull_request_id": "p1"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pr"]["status"], "MERGED");
    assert!(body["pr"]["mergedAt"].is_string());

    let (status, again) = post(&app, "/pullRequest/merge", json!({"pull_request_id": "p1"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again, body);

    let (status, body) = post(
        &app,
        "/pullRequest/reassign",
        json!({"pull_request_id": "p1", "old_user_id": "C"}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "PR_MERGED");

    let (status, body) = get(&app, "/pullRequest/get?pull_request_id=p1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pr"]["status"], "MERGED");
}

#[tokio::test]
async fn test_pull_request_errors() {
    let app = app();
    seed_core_team(&app).await;

    let create = json!({"pull_request_id": "p1", "pull_request_name": "x", "author_id": "A"});
    post(&app, "/pullRequest/create", create.clone()).await;

    let (status, body) = post(&app, "/pullRequest/create", create).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "PR_EXISTS");

    let (status, body) = post(
        &app,
        "/pullRequest/create",
        json!({"pull_request_id": "p2", "pull_request_name": "x", "author_id": "nobody"}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, body) = post(
        &app,
        "/pullRequest/reassign",
        json!({"pull_request_id": "p1", "old_user_id": "A"}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "NOT_ASSIGNED");

    let (status, body) = post(&app, "/pullRequest/merge", json!({"pull_request_id": "p9"})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["message"], "PR not found");
}

#[tokio::test]
async fn test_invalid_requests() {
    let app = app();

    let request = Request::post("/pullRequest/create")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"]["code"], "INVALID_REQUEST");
    assert_eq!(body["error"]["message"], "Invalid request body");

    let (status, body) = get(&app, "/users/getReview").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_REQUEST");
    assert_eq!(body["error"]["message"], "user_id is required");

    let (status, body) = get(&app, "/team/get?team_name=").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "team_name is required");

    let (status, _) = get(&app, "/pullRequest/create").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_unknown_user_has_empty_reviews() {
    let app = app();

    let (status, body) = get(&app, "/users/getReview?user_id=ghost").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"user_id": "ghost", "pull_requests": []}));
}

#[tokio::test]
async fn test_empty_body_identifiers_are_not_found() {
    let app = app();
    seed_core_team(&app).await;

    let (status, body) = post(&app, "/users/setIsActive", json!({"user_id": "", "is_active": true})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, body) = post(&app, "/pullRequest/merge", json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, body) = post(
        &app,
        "/pullRequest/reassign",
        json!({"pull_request_id": "", "old_user_id": "B"}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_body_decoded_without_content_type() {
    let app = app();

    let request = Request::post("/team/add")
        .body(Body::from(r#"{"team_name": "plain", "members": []}"#))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let (status, body) = get(&app, "/team/get?team_name=plain").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["team_name"], "plain");
}

#[tokio::test]
async fn test_request_times_out_behind_held_transaction() {
    let store = MemoryStore::new();
    let app = api::router(
        Arc::new(ReviewService::new(store.clone(), AssignmentPolicy::default())),
        Duration::from_millis(50),
    );

    // Every memory transaction waits for this one to finish
    let held = store.begin().await.unwrap();

    let (status, _) = get(&app, "/team/get?team_name=core").await;
    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);

    drop(held);
    let (status, _) = get(&app, "/team/get?team_name=core").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
