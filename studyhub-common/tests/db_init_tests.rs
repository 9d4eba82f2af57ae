//! Tests for database initialization
//!
//! - Automatic database creation on first run
//! - Reopening an existing database
//! - Full schema present after init, including the active-slot index

use studyhub_common::db::init::{init_database, init_schema};
use studyhub_common::db::CURRENT_SCHEMA_VERSION;
use tempfile::TempDir;

const EXPECTED_TABLES: &[&str] = &[
    "schema_version",
    "subjects",
    "users",
    "user_subjects",
    "tutoring_sessions",
    "session_reviews",
    "discussions",
    "replies",
    "study_materials",
    "notifications",
    "support_queries",
];

#[tokio::test]
async fn test_database_creation_when_missing() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("data").join("studyhub.db");

    let result = init_database(&db_path).await;
    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("studyhub.db");

    let pool1 = init_database(&db_path).await.unwrap();
    pool1.close().await;

    let pool2 = init_database(&db_path).await;
    assert!(pool2.is_ok(), "Failed to open existing database: {:?}", pool2.err());
}

#[tokio::test]
async fn test_all_tables_created() {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("studyhub.db")).await.unwrap();

    for table in EXPECTED_TABLES {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name = ?)",
        )
        .bind(table)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert!(exists, "table {} missing", table);
    }
}

#[tokio::test]
async fn test_schema_version_recorded_and_slot_index_present() {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();

    init_schema(&pool).await.unwrap();
    // Idempotent
    init_schema(&pool).await.unwrap();

    let version: i32 = sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(version, CURRENT_SCHEMA_VERSION);

    let index_exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='index' AND name='idx_sessions_active_tutor_slot')",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert!(index_exists);
}

#[tokio::test]
async fn test_foreign_keys_enforced() {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    init_schema(&pool).await.unwrap();

    let result = sqlx::query(
        "INSERT INTO session_reviews (session_id, reviewer_id, rating, created_at, updated_at) VALUES (999, 999, 5, 'x', 'x')",
    )
    .execute(&pool)
    .await;
    assert!(result.is_err(), "review for a missing session must be rejected");
}
