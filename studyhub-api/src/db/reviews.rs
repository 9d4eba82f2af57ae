//! Session review queries

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::collections::HashMap;
use studyhub_common::Result;

use crate::models::{SessionReview, TutoringSession};

const REVIEW_SELECT: &str = r#"
    SELECT r.id, r.session_id AS session, r.reviewer_id AS reviewer,
           u.username AS reviewer_username, r.rating, r.comment,
           r.created_at, r.updated_at
    FROM session_reviews r
    JOIN users u ON u.id = r.reviewer_id
"#;

pub async fn get(pool: &SqlitePool, id: i64) -> Result<Option<SessionReview>> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(REVIEW_SELECT);
    qb.push(" WHERE r.id = ").push_bind(id);

    Ok(qb.build_query_as::<SessionReview>().fetch_optional(pool).await?)
}

pub async fn for_session(pool: &SqlitePool, session_id: i64) -> Result<Option<SessionReview>> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(REVIEW_SELECT);
    qb.push(" WHERE r.session_id = ").push_bind(session_id);

    Ok(qb.build_query_as::<SessionReview>().fetch_optional(pool).await?)
}

/// Newest first
pub async fn list(pool: &SqlitePool) -> Result<Vec<SessionReview>> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(REVIEW_SELECT);
    qb.push(" ORDER BY r.created_at DESC, r.id DESC");

    Ok(qb.build_query_as::<SessionReview>().fetch_all(pool).await?)
}

/// Fill `review` on each session with a single query
pub async fn attach(pool: &SqlitePool, sessions: &mut [TutoringSession]) -> Result<()> {
    if sessions.is_empty() {
        return Ok(());
    }

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(REVIEW_SELECT);
    qb.push(" WHERE r.session_id IN (");
    let mut ids = qb.separated(", ");
    for session in sessions.iter() {
        ids.push_bind(session.id);
    }
    ids.push_unseparated(")");

    let found: Vec<SessionReview> = qb.build_query_as::<SessionReview>().fetch_all(pool).await?;
    let mut by_session: HashMap<i64, SessionReview> =
        found.into_iter().map(|r| (r.session, r)).collect();

    for session in sessions.iter_mut() {
        session.review = by_session.remove(&session.id);
    }
    Ok(())
}

/// Insert a review; a second review of the session is a unique violation
pub async fn insert(
    pool: &SqlitePool,
    session_id: i64,
    reviewer_id: i64,
    rating: i64,
    comment: &str,
    now: DateTime<Utc>,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO session_reviews (session_id, reviewer_id, rating, comment, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(session_id)
    .bind(reviewer_id)
    .bind(rating)
    .bind(comment)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn update(
    pool: &SqlitePool,
    id: i64,
    rating: i64,
    comment: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    sqlx::query("UPDATE session_reviews SET rating = ?, comment = ?, updated_at = ? WHERE id = ?")
        .bind(rating)
        .bind(comment)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM session_reviews WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() == 1)
}
