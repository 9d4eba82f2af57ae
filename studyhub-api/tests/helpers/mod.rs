//! Shared fixtures for studyhub-api integration tests
//!
//! Every test gets a fresh in-memory database with the full schema and a
//! router built exactly as `main` builds it.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, NaiveDate};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use studyhub_api::db::users::NewUser;
use studyhub_api::{build_router, AppState};
use studyhub_common::db::Role;
use studyhub_common::events::EventBus;
use tower::util::ServiceExt;

pub struct TestApp {
    pub app: Router,
    pub pool: SqlitePool,
    pub event_bus: EventBus,
}

impl TestApp {
    pub async fn new() -> Self {
        // One connection: every handle sees the same in-memory database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");
        studyhub_common::db::init_schema(&pool)
            .await
            .expect("Failed to create schema");

        let event_bus = EventBus::new(100);
        let app = build_router(AppState::new(pool.clone(), event_bus.clone()));

        Self {
            app,
            pool,
            event_bus,
        }
    }

    /// Insert a user directly, bypassing the HTTP layer
    pub async fn user(&self, username: &str, role: Role) -> i64 {
        self.user_with_subjects(username, role, &[]).await
    }

    pub async fn user_with_subjects(&self, username: &str, role: Role, subjects: &[i64]) -> i64 {
        let email = format!("{}@example.com", username);
        let new_user = NewUser {
            username,
            email: &email,
            first_name: "",
            last_name: "",
            role,
            bio: "",
        };
        studyhub_api::db::users::insert(&self.pool, &new_user, subjects, chrono::Utc::now())
            .await
            .expect("Failed to insert user")
    }

    pub async fn subject(&self, name: &str) -> i64 {
        studyhub_api::db::subjects::insert(&self.pool, name, "", chrono::Utc::now())
            .await
            .expect("Failed to insert subject")
    }

    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        user: Option<i64>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(id) = user {
            builder = builder.header("X-User-Id", id.to_string());
        }
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("Response body should be JSON")
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, user: i64) -> (StatusCode, Value) {
        self.request("GET", uri, Some(user), None).await
    }

    pub async fn post(&self, uri: &str, user: i64, body: Value) -> (StatusCode, Value) {
        self.request("POST", uri, Some(user), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, user: i64, body: Value) -> (StatusCode, Value) {
        self.request("PATCH", uri, Some(user), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, user: i64) -> (StatusCode, Value) {
        self.request("DELETE", uri, Some(user), None).await
    }

    /// Notifications stored for a user, newest first
    pub async fn notifications_of(&self, user: i64) -> Vec<Value> {
        let (status, body) = self.get("/api/notifications", user).await;
        assert_eq!(status, StatusCode::OK);
        body.as_array().cloned().unwrap_or_default()
    }
}

/// A date `days` from today (UTC)
pub fn days_from_today(days: i64) -> NaiveDate {
    studyhub_common::time::today() + Duration::days(days)
}

/// Error code of an error response
pub fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or_default()
}

/// Field an error response is attributed to
pub fn error_field(body: &Value) -> Option<&str> {
    body["error"]["field"].as_str()
}
