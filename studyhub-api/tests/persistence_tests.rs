//! Router over an on-disk database
//!
//! Data written through the API must survive reopening the database file.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use studyhub_api::{build_router, AppState};
use studyhub_common::config::RootFolderInitializer;
use studyhub_common::events::EventBus;
use tower::util::ServiceExt;

async fn send(app: &axum::Router, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn test_registered_user_survives_restart() {
    let temp_dir = tempfile::tempdir().unwrap();
    let initializer = RootFolderInitializer::new(temp_dir.path().join("data"));
    initializer.ensure_directory_exists().unwrap();
    let db_path = initializer.database_path();

    {
        let pool = studyhub_common::db::init_database(&db_path).await.unwrap();
        let app = build_router(AppState::new(pool.clone(), EventBus::new(10)));

        let (status, body) = send(
            &app,
            "POST",
            "/api/auth/register",
            json!({ "username": "persisted", "email": "p@example.com", "role": "tutor" }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        pool.close().await;
    }

    let pool = studyhub_common::db::init_database(&db_path).await.unwrap();
    let app = build_router(AppState::new(pool, EventBus::new(10)));

    let request = Request::builder()
        .uri("/api/users/tutors")
        .header("X-User-Id", "1")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let tutors: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(tutors[0]["username"], "persisted");
}
