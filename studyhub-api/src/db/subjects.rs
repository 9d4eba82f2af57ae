//! Subject catalog queries

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use studyhub_common::Result;

use crate::models::Subject;

pub async fn list(pool: &SqlitePool) -> Result<Vec<Subject>> {
    let subjects = sqlx::query_as::<_, Subject>(
        "SELECT id, name, description FROM subjects ORDER BY name ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(subjects)
}

pub async fn get(pool: &SqlitePool, id: i64) -> Result<Option<Subject>> {
    let subject =
        sqlx::query_as::<_, Subject>("SELECT id, name, description FROM subjects WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;

    Ok(subject)
}

pub async fn exists(pool: &SqlitePool, id: i64) -> Result<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT id FROM subjects WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(found.is_some())
}

/// Ids from `ids` that have no subject row
pub async fn missing(pool: &SqlitePool, ids: &[i64]) -> Result<Vec<i64>> {
    let mut missing = Vec::new();
    for &id in ids {
        if !exists(pool, id).await? {
            missing.push(id);
        }
    }
    Ok(missing)
}

/// Insert a subject; a duplicate name surfaces as a unique violation
pub async fn insert(
    pool: &SqlitePool,
    name: &str,
    description: &str,
    now: DateTime<Utc>,
) -> Result<i64> {
    let result = sqlx::query("INSERT INTO subjects (name, description, created_at) VALUES (?, ?, ?)")
        .bind(name)
        .bind(description)
        .bind(now)
        .execute(pool)
        .await?;

    Ok(result.last_insert_rowid())
}
