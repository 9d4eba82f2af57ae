//! Database schema migrations
//!
//! Versioned schema migrations tracked in the `schema_version` table. Every
//! migration is idempotent: it inspects the live schema before changing it,
//! so running it against a database already in the target shape is a no-op.
//!
//! # Migration Guidelines
//!
//! 1. **Never modify existing migrations** - users may upgrade from any older version
//! 2. **Always add new migrations** - one function per schema change
//! 3. **Use ALTER TABLE** - prefer ALTER TABLE over DROP/CREATE to preserve data

use crate::{Error, Result};
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Current schema version
///
/// **IMPORTANT:** Increment this when adding new migrations
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Columns introduced by the confirmation/cancellation workflow
///
/// Databases created before the workflow existed only carried
/// `id, tutor_id, student_id, subject_id, title, date, time, duration,
/// status, notes, created_at, updated_at`.
const SESSION_WORKFLOW_COLUMNS: &[(&str, &str)] = &[
    ("confirmation_required", "INTEGER NOT NULL DEFAULT 1"),
    ("is_confirmed", "INTEGER NOT NULL DEFAULT 0"),
    ("confirmed_at", "TEXT"),
    ("cancelled_by", "INTEGER REFERENCES users(id) ON DELETE SET NULL"),
    ("cancellation_reason", "TEXT NOT NULL DEFAULT ''"),
    ("max_students", "INTEGER NOT NULL DEFAULT 1"),
];

/// Get current schema version from database
///
/// Returns 0 if schema_version table doesn't exist or has no rows
async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let table_exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM sqlite_master
            WHERE type='table' AND name='schema_version'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        return Ok(0);
    }

    let version: Option<i32> =
        sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;

    Ok(version.unwrap_or(0))
}

/// Set schema version in database
async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;

    Ok(())
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current_version = get_schema_version(pool).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(());
    }

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Database schema version ({}) is newer than code version ({})",
            current_version, CURRENT_SCHEMA_VERSION
        );
        warn!("This may indicate a downgrade. Proceeding with caution.");
        return Ok(());
    }

    info!(
        "Running database migrations: v{} -> v{}",
        current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        migrate_v1(pool).await?;
        set_schema_version(pool, 1).await?;
        info!("✓ Migration v1 completed");
    }

    if current_version < 2 {
        migrate_v2(pool).await?;
        set_schema_version(pool, 2).await?;
        info!("✓ Migration v2 completed");
    }

    info!("All migrations completed successfully");
    Ok(())
}

async fn table_exists(pool: &SqlitePool, table: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name = ?)",
    )
    .bind(table)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

/// Migration v1: add confirmation/cancellation workflow columns to tutoring_sessions
async fn migrate_v1(pool: &SqlitePool) -> Result<()> {
    info!("Running migration v1: Add session workflow columns");

    if !table_exists(pool, "tutoring_sessions").await? {
        info!("  tutoring_sessions table doesn't exist yet - skipping migration");
        return Ok(());
    }

    for (column, definition) in SESSION_WORKFLOW_COLUMNS {
        let has_column: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM pragma_table_info('tutoring_sessions') WHERE name = ?",
        )
        .bind(column)
        .fetch_one(pool)
        .await?;

        if has_column > 0 {
            continue;
        }

        let sql = format!(
            "ALTER TABLE tutoring_sessions ADD COLUMN {} {}",
            column, definition
        );
        sqlx::query(&sql).execute(pool).await?;
        info!("  ✓ Added {} column to tutoring_sessions", column);
    }

    Ok(())
}

/// Migration v2: one active session per tutor slot
///
/// Partial unique index over `(tutor_id, date, time)` restricted to
/// `pending`/`scheduled` rows. Concurrent bookings that both pass the
/// application-level conflict check are rejected by SQLite on write.
///
/// Fails if the existing data already double-books a slot; those rows must be
/// resolved by hand before the index can be created.
async fn migrate_v2(pool: &SqlitePool) -> Result<()> {
    info!("Running migration v2: Unique active tutor slot index");

    if !table_exists(pool, "tutoring_sessions").await? {
        info!("  tutoring_sessions table doesn't exist yet - skipping migration");
        return Ok(());
    }

    let duplicates: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM (
            SELECT tutor_id, date, time
            FROM tutoring_sessions
            WHERE status IN ('pending', 'scheduled')
            GROUP BY tutor_id, date, time
            HAVING COUNT(*) > 1
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if duplicates > 0 {
        return Err(Error::Internal(format!(
            "Cannot create unique slot index: {} tutor slot(s) are double-booked",
            duplicates
        )));
    }

    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_sessions_active_tutor_slot
        ON tutoring_sessions(tutor_id, date, time)
        WHERE status IN ('pending', 'scheduled')
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    async fn create_version_table(pool: &SqlitePool) {
        sqlx::query(
            "CREATE TABLE schema_version (version INTEGER PRIMARY KEY, applied_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP)",
        )
        .execute(pool)
        .await
        .unwrap();
    }

    /// Session table as created before the confirmation workflow existed
    async fn create_legacy_sessions_table(pool: &SqlitePool) {
        sqlx::query(
            r#"
            CREATE TABLE tutoring_sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tutor_id INTEGER NOT NULL,
                student_id INTEGER,
                subject_id INTEGER NOT NULL,
                title TEXT NOT NULL DEFAULT 'Tutoring Session',
                date TEXT NOT NULL,
                time TEXT NOT NULL,
                duration INTEGER NOT NULL DEFAULT 60,
                status TEXT NOT NULL DEFAULT 'scheduled',
                notes TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await
        .unwrap();
    }

    async fn insert_legacy_session(pool: &SqlitePool, tutor_id: i64, status: &str) {
        sqlx::query(
            r#"
            INSERT INTO tutoring_sessions (tutor_id, subject_id, date, time, status, created_at, updated_at)
            VALUES (?, 1, '2025-01-10', '14:00:00', ?, '2025-01-01T00:00:00Z', '2025-01-01T00:00:00Z')
            "#,
        )
        .bind(tutor_id)
        .bind(status)
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_get_schema_version_no_table() {
        let pool = setup_test_db().await;
        let version = get_schema_version(&pool).await.unwrap();
        assert_eq!(version, 0);
    }

    #[tokio::test]
    async fn test_set_and_get_schema_version() {
        let pool = setup_test_db().await;
        create_version_table(&pool).await;

        set_schema_version(&pool, 1).await.unwrap();
        let version = get_schema_version(&pool).await.unwrap();
        assert_eq!(version, 1);
    }

    #[tokio::test]
    async fn test_migrate_v1_no_table() {
        let pool = setup_test_db().await;
        migrate_v1(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn test_migrate_v1_adds_workflow_columns() {
        let pool = setup_test_db().await;
        create_legacy_sessions_table(&pool).await;

        migrate_v1(&pool).await.unwrap();

        for (column, _) in SESSION_WORKFLOW_COLUMNS {
            let has_column: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM pragma_table_info('tutoring_sessions') WHERE name = ?",
            )
            .bind(column)
            .fetch_one(&pool)
            .await
            .unwrap();
            assert_eq!(has_column, 1, "column {} missing", column);
        }
    }

    #[tokio::test]
    async fn test_migrate_v1_idempotent() {
        let pool = setup_test_db().await;
        create_legacy_sessions_table(&pool).await;

        migrate_v1(&pool).await.unwrap();
        migrate_v1(&pool).await.unwrap();

        let column_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM pragma_table_info('tutoring_sessions') WHERE name = 'is_confirmed'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(column_count, 1);
    }

    #[tokio::test]
    async fn test_migrate_v2_creates_slot_index() {
        let pool = setup_test_db().await;
        create_legacy_sessions_table(&pool).await;

        migrate_v2(&pool).await.unwrap();

        let index_exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='index' AND name='idx_sessions_active_tutor_slot')",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert!(index_exists);

        // Cancelled rows do not occupy the slot
        insert_legacy_session(&pool, 7, "cancelled").await;
        insert_legacy_session(&pool, 7, "pending").await;
        let duplicate = sqlx::query(
            r#"
            INSERT INTO tutoring_sessions (tutor_id, subject_id, date, time, status, created_at, updated_at)
            VALUES (7, 1, '2025-01-10', '14:00:00', 'scheduled', '2025-01-01T00:00:00Z', '2025-01-01T00:00:00Z')
            "#,
        )
        .execute(&pool)
        .await;
        assert!(duplicate.is_err(), "second active session in the slot must be rejected");
    }

    #[tokio::test]
    async fn test_migrate_v2_refuses_double_booked_data() {
        let pool = setup_test_db().await;
        create_legacy_sessions_table(&pool).await;
        insert_legacy_session(&pool, 3, "scheduled").await;
        insert_legacy_session(&pool, 3, "scheduled").await;

        let result = migrate_v2(&pool).await;
        assert!(matches!(result, Err(Error::Internal(_))));
    }

    #[tokio::test]
    async fn test_run_migrations_complete_flow() {
        let pool = setup_test_db().await;
        create_version_table(&pool).await;
        create_legacy_sessions_table(&pool).await;

        run_migrations(&pool).await.unwrap();

        let version = get_schema_version(&pool).await.unwrap();
        assert_eq!(version, CURRENT_SCHEMA_VERSION);

        let has_column: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM pragma_table_info('tutoring_sessions') WHERE name = 'cancelled_by'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(has_column, 1);

        // Second run is a no-op
        run_migrations(&pool).await.unwrap();
        assert_eq!(get_schema_version(&pool).await.unwrap(), CURRENT_SCHEMA_VERSION);
    }
}
