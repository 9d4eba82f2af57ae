//! Support ticket intake

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use studyhub_common::Result;

pub async fn insert(
    pool: &SqlitePool,
    name: &str,
    email: &str,
    subject: &str,
    message: &str,
    now: DateTime<Utc>,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO support_queries (name, email, subject, message, created_at, resolved)
        VALUES (?, ?, ?, ?, ?, 0)
        "#,
    )
    .bind(name)
    .bind(email)
    .bind(subject)
    .bind(message)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}
