//! Notification queries

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use studyhub_common::db::NotificationType;
use studyhub_common::Result;

use crate::models::Notification;

const NOTIFICATION_SELECT: &str = r#"
    SELECT id, notification_type, title, message, link, is_read, created_at
    FROM notifications
"#;

/// Store a notification and return it as persisted
pub async fn insert(
    pool: &SqlitePool,
    user_id: i64,
    notification_type: NotificationType,
    title: &str,
    message: &str,
    link: &str,
    now: DateTime<Utc>,
) -> Result<Notification> {
    let result = sqlx::query(
        r#"
        INSERT INTO notifications (user_id, notification_type, title, message, link, is_read, created_at)
        VALUES (?, ?, ?, ?, ?, 0, ?)
        "#,
    )
    .bind(user_id)
    .bind(notification_type)
    .bind(title)
    .bind(message)
    .bind(link)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(Notification {
        id: result.last_insert_rowid(),
        notification_type,
        title: title.to_string(),
        message: message.to_string(),
        link: link.to_string(),
        is_read: false,
        created_at: now,
    })
}

/// A user's notifications, newest first
pub async fn list_for_user(
    pool: &SqlitePool,
    user_id: i64,
    unread_only: bool,
) -> Result<Vec<Notification>> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(NOTIFICATION_SELECT);
    qb.push(" WHERE user_id = ").push_bind(user_id);
    if unread_only {
        qb.push(" AND is_read = 0");
    }
    qb.push(" ORDER BY created_at DESC, id DESC");

    Ok(qb.build_query_as::<Notification>().fetch_all(pool).await?)
}

/// Mark one of the user's notifications read
///
/// Returns false when no such notification belongs to the user.
pub async fn mark_read(pool: &SqlitePool, user_id: i64, id: i64) -> Result<bool> {
    let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() == 1)
}

/// Mark every unread notification of the user read, returning how many changed
pub async fn mark_all_read(pool: &SqlitePool, user_id: i64) -> Result<u64> {
    let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE user_id = ? AND is_read = 0")
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
