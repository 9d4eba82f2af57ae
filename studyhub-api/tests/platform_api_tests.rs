//! Integration tests for accounts, subjects, forum, materials,
//! notifications, support intake and health

mod helpers;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use helpers::{error_code, error_field, TestApp};
use serde_json::json;
use studyhub_common::db::Role;
use tower::util::ServiceExt;

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_no_identity_required() {
    let app = TestApp::new().await;

    let (status, body) = app.request("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "studyhub-api");
    assert!(body["version"].is_string());
}

// =============================================================================
// Accounts and subjects
// =============================================================================

#[tokio::test]
async fn test_register_and_me() {
    let app = TestApp::new().await;
    let maths = app.subject("Mathematics").await;

    let (status, user) = app
        .request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "username": "ada",
                "email": "ada@example.com",
                "first_name": "Ada",
                "role": "tutor",
                "subject_ids": [maths]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", user);
    assert_eq!(user["role"], "tutor");
    assert_eq!(user["subjects"][0]["name"], "Mathematics");

    let id = user["id"].as_i64().unwrap();
    let (status, me) = app.get("/api/auth/me", id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "ada");
    assert_eq!(me["first_name"], "Ada");
}

#[tokio::test]
async fn test_register_validation() {
    let app = TestApp::new().await;
    app.user("taken", Role::Student).await;

    let (status, body) = app
        .request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "username": "taken", "email": "t@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "CONFLICT");

    let (status, body) = app
        .request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "username": "newbie", "email": "not-an-email" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_field(&body), Some("email"));

    let (status, body) = app
        .request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "username": "newbie", "email": "n@example.com", "subject_ids": [77] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_field(&body), Some("subject_ids"));
}

#[tokio::test]
async fn test_profile_update_replaces_subjects() {
    let app = TestApp::new().await;
    let maths = app.subject("Mathematics").await;
    let physics = app.subject("Physics").await;
    let user = app.user_with_subjects("sam", Role::Student, &[maths]).await;

    let (status, body) = app
        .patch(
            "/api/auth/me",
            user,
            json!({ "bio": "Second year", "subject_ids": [physics] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["bio"], "Second year");
    let subjects = body["subjects"].as_array().unwrap();
    assert_eq!(subjects.len(), 1);
    assert_eq!(subjects[0]["name"], "Physics");
    assert_eq!(body["email"], "sam@example.com");
}

#[tokio::test]
async fn test_user_directory_filters() {
    let app = TestApp::new().await;
    let maths = app.subject("Mathematics").await;
    let tutor = app.user_with_subjects("tom", Role::Tutor, &[maths]).await;
    app.user("tina", Role::Tutor).await;
    let student = app.user("sam", Role::Student).await;

    let (_, tutors) = app.get("/api/users/tutors", student).await;
    assert_eq!(tutors.as_array().unwrap().len(), 2);

    let (_, maths_tutors) = app
        .get(&format!("/api/users/tutors?subject={}", maths), student)
        .await;
    let maths_tutors = maths_tutors.as_array().unwrap();
    assert_eq!(maths_tutors.len(), 1);
    assert_eq!(maths_tutors[0]["id"], tutor);

    let (_, students) = app.get("/api/users?role=student", tutor).await;
    assert_eq!(students.as_array().unwrap().len(), 1);

    let (status, _) = app.get("/api/users/999", tutor).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_subjects_public_list_and_unique_create() {
    let app = TestApp::new().await;
    let user = app.user("sam", Role::Student).await;
    app.subject("Physics").await;

    let (status, subject) = app
        .post("/api/auth/subjects", user, json!({ "name": "Chemistry" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(subject["name"], "Chemistry");

    let (status, _) = app
        .post("/api/auth/subjects", user, json!({ "name": "Chemistry" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .request("POST", "/api/auth/subjects", None, Some(json!({ "name": "Biology" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, list) = app.request("GET", "/api/auth/subjects", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Chemistry", "Physics"]);
}

// =============================================================================
// Forum
// =============================================================================

#[tokio::test]
async fn test_discussion_reply_tree_and_notifications() {
    let app = TestApp::new().await;
    let author = app.user("alice", Role::Student).await;
    let replier = app.user("bob", Role::Student).await;
    let third = app.user("carol", Role::Tutor).await;

    let (status, discussion) = app
        .post(
            "/api/discussions",
            author,
            json!({ "title": "Integration tricks", "content": "Share yours" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", discussion);
    let id = discussion["id"].as_i64().unwrap();
    let replies_uri = format!("/api/discussions/{}/replies", id);

    let (_, top) = app
        .post(&replies_uri, replier, json!({ "content": "Substitution" }))
        .await;
    let top_id = top["id"].as_i64().unwrap();
    let (status, nested) = app
        .post(
            &replies_uri,
            third,
            json!({ "content": "By parts too", "parent": top_id }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(nested["parent"], top_id);
    app.post(&replies_uri, author, json!({ "content": "Thanks all" }))
        .await;

    let (status, detail) = app.get(&format!("/api/discussions/{}", id), replier).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["reply_count"], 3);
    let roots = detail["replies"].as_array().unwrap();
    assert_eq!(roots.len(), 2);
    assert_eq!(roots[0]["id"], top_id);
    assert_eq!(roots[0]["children"][0]["content"], "By parts too");
    assert!(roots[1]["children"].as_array().unwrap().is_empty());

    // Author hears about both foreign replies, never their own
    let author_inbox = app.notifications_of(author).await;
    assert_eq!(author_inbox.len(), 2);
    assert!(author_inbox.iter().all(|n| n["notification_type"] == "new_reply"));

    // Parent author hears about the nested reply
    assert_eq!(app.notifications_of(replier).await.len(), 1);
    assert!(app.notifications_of(third).await.is_empty());
}

#[tokio::test]
async fn test_reply_parent_must_share_discussion() {
    let app = TestApp::new().await;
    let user = app.user("alice", Role::Student).await;

    let (_, first) = app
        .post("/api/discussions", user, json!({ "title": "A", "content": "a" }))
        .await;
    let (_, second) = app
        .post("/api/discussions", user, json!({ "title": "B", "content": "b" }))
        .await;
    let (_, reply) = app
        .post(
            &format!("/api/discussions/{}/replies", first["id"]),
            user,
            json!({ "content": "in A" }),
        )
        .await;

    let (status, body) = app
        .post(
            &format!("/api/discussions/{}/replies", second["id"]),
            user,
            json!({ "content": "misplaced", "parent": reply["id"] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_field(&body), Some("parent"));

    let (status, body) = app
        .post(
            &format!("/api/discussions/{}/replies", second["id"]),
            user,
            json!({ "content": "   " }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_field(&body), Some("content"));
}

#[tokio::test]
async fn test_discussion_author_only_edits() {
    let app = TestApp::new().await;
    let author = app.user("alice", Role::Student).await;
    let other = app.user("bob", Role::Student).await;

    let (_, discussion) = app
        .post("/api/discussions", author, json!({ "title": "Draft", "content": "text" }))
        .await;
    let uri = format!("/api/discussions/{}", discussion["id"]);

    let (status, _) = app.patch(&uri, other, json!({ "title": "Hijacked" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.patch(&uri, author, json!({ "title": "Final" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Final");
    assert_eq!(body["content"], "text");

    let (status, _) = app.delete(&uri, other).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.delete(&uri, author).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_discussion_in_subject_notifies_affiliated_users() {
    let app = TestApp::new().await;
    let maths = app.subject("Mathematics").await;
    let author = app.user_with_subjects("alice", Role::Student, &[maths]).await;
    let peer = app.user_with_subjects("bob", Role::Tutor, &[maths]).await;
    let outsider = app.user("carol", Role::Student).await;

    app.post(
        "/api/discussions",
        author,
        json!({ "title": "Limits", "content": "Help", "subject": maths }),
    )
    .await;

    let inbox = app.notifications_of(peer).await;
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0]["notification_type"], "new_discussion");
    assert!(app.notifications_of(author).await.is_empty());
    assert!(app.notifications_of(outsider).await.is_empty());

    let (_, filtered) = app
        .get(&format!("/api/discussions?subject={}", maths), outsider)
        .await;
    assert_eq!(filtered.as_array().unwrap().len(), 1);
    assert_eq!(filtered[0]["subject_name"], "Mathematics");
}

#[tokio::test]
async fn test_subject_audience_failure_does_not_fail_create() {
    let app = TestApp::new().await;
    let maths = app.subject("Mathematics").await;
    let author = app.user_with_subjects("alice", Role::Tutor, &[maths]).await;

    // Audience lookup now fails after the row is written
    sqlx::query("DROP TABLE user_subjects")
        .execute(&app.pool)
        .await
        .unwrap();

    let (status, body) = app
        .post(
            "/api/discussions",
            author,
            json!({ "title": "Limits", "content": "Help", "subject": maths }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["title"], "Limits");

    let (status, body) = app
        .post(
            "/api/materials",
            author,
            json!({
                "title": "Calculus notes",
                "description": "PDF",
                "subject": maths,
                "link": "https://example.com/notes"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);

    let discussions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM discussions")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    let materials: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM study_materials")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!((discussions, materials), (1, 1));
}

// =============================================================================
// Materials
// =============================================================================

#[tokio::test]
async fn test_material_create_notifies_and_orders() {
    let app = TestApp::new().await;
    let maths = app.subject("Mathematics").await;
    let author = app.user_with_subjects("tom", Role::Tutor, &[maths]).await;
    let student = app.user_with_subjects("sam", Role::Student, &[maths]).await;

    for title in ["Calculus notes", "Algebra cheatsheet"] {
        let (status, body) = app
            .post(
                "/api/materials",
                author,
                json!({
                    "title": title,
                    "description": "PDF",
                    "subject": maths,
                    "link": "https://example.com/notes"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        assert_eq!(body["author_username"], "tom");
    }

    let inbox = app.notifications_of(student).await;
    assert_eq!(inbox.len(), 2);
    assert_eq!(inbox[0]["notification_type"], "new_material");
    assert!(app.notifications_of(author).await.is_empty());

    let (_, newest_first) = app.get("/api/materials", student).await;
    assert_eq!(newest_first[0]["title"], "Algebra cheatsheet");

    let (_, by_title) = app.get("/api/materials?ordering=title", student).await;
    assert_eq!(by_title[0]["title"], "Algebra cheatsheet");
    let (_, by_title_desc) = app.get("/api/materials?ordering=-title", student).await;
    assert_eq!(by_title_desc[0]["title"], "Calculus notes");

    let (status, body) = app.get("/api/materials?ordering=popularity", student).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_field(&body), Some("ordering"));
}

#[tokio::test]
async fn test_material_validation_and_ownership() {
    let app = TestApp::new().await;
    let maths = app.subject("Mathematics").await;
    let author = app.user("tom", Role::Tutor).await;
    let other = app.user("sam", Role::Student).await;

    let (status, body) = app
        .post("/api/materials", author, json!({ "title": "x", "description": "y" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_field(&body), Some("subject"));

    let (_, material) = app
        .post(
            "/api/materials",
            author,
            json!({ "title": "Notes", "description": "v1", "subject": maths }),
        )
        .await;
    let uri = format!("/api/materials/{}", material["id"]);

    let (status, _) = app.patch(&uri, other, json!({ "description": "v2" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = app.patch(&uri, author, json!({ "description": "v2" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["description"], "v2");

    let (status, _) = app.delete(&uri, author).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.get(&uri, author).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Notifications
// =============================================================================

#[tokio::test]
async fn test_mark_read_and_read_all() {
    let app = TestApp::new().await;
    let maths = app.subject("Mathematics").await;
    let author = app.user("tom", Role::Tutor).await;
    let student = app.user_with_subjects("sam", Role::Student, &[maths]).await;
    let stranger = app.user("eve", Role::Student).await;

    for title in ["One", "Two", "Three"] {
        app.post(
            "/api/materials",
            author,
            json!({ "title": title, "description": "d", "subject": maths }),
        )
        .await;
    }

    let inbox = app.notifications_of(student).await;
    assert_eq!(inbox.len(), 3);
    let first_id = inbox[0]["id"].as_i64().unwrap();

    // Someone else's notification looks missing
    let (status, _) = app
        .post(&format!("/api/notifications/{}/read", first_id), stranger, json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .post(&format!("/api/notifications/{}/read", first_id), student, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, unread) = app.get("/api/notifications?unread=true", student).await;
    assert_eq!(unread.as_array().unwrap().len(), 2);

    let (status, body) = app
        .post("/api/notifications/read-all", student, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], 2);

    let (_, unread) = app.get("/api/notifications?unread=true", student).await;
    assert!(unread.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_notification_stream_is_sse() {
    let app = TestApp::new().await;
    let user = app.user("sam", Role::Student).await;

    let response = app
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/notifications/stream")
                .header("X-User-Id", user.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(content_type.starts_with("text/event-stream"));
}

// =============================================================================
// Support
// =============================================================================

#[tokio::test]
async fn test_support_query_is_public() {
    let app = TestApp::new().await;

    let (status, body) = app
        .request(
            "POST",
            "/api/support",
            None,
            Some(json!({
                "name": "Visitor",
                "email": "visitor@example.com",
                "subject": "Billing",
                "message": "How much does it cost?"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Your query has been submitted successfully");

    let stored: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM support_queries")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(stored, 1);
}

#[tokio::test]
async fn test_support_query_validation() {
    let app = TestApp::new().await;

    let (status, body) = app
        .request(
            "POST",
            "/api/support",
            None,
            Some(json!({ "name": "Visitor", "email": "nope", "subject": "s", "message": "m" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_field(&body), Some("email"));

    let (status, body) = app
        .request(
            "POST",
            "/api/support",
            None,
            Some(json!({ "name": "Visitor", "email": "v@example.com", "subject": "s" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_field(&body), Some("message"));
}
