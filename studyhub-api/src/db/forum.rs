//! Discussion and reply queries

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use studyhub_common::Result;

use crate::models::{Discussion, DiscussionFilter, Reply};

const DISCUSSION_SELECT: &str = r#"
    SELECT d.id, d.author_id AS author, u.username AS author_username,
           d.subject_id AS subject, s.name AS subject_name,
           d.title, d.content,
           (SELECT COUNT(*) FROM replies r WHERE r.discussion_id = d.id) AS reply_count,
           d.created_at, d.updated_at
    FROM discussions d
    JOIN users u ON u.id = d.author_id
    LEFT JOIN subjects s ON s.id = d.subject_id
"#;

const REPLY_SELECT: &str = r#"
    SELECT r.id, r.discussion_id AS discussion, r.author_id AS author,
           u.username AS author_username, r.parent_id AS parent, r.content,
           r.created_at, r.updated_at
    FROM replies r
    JOIN users u ON u.id = r.author_id
"#;

/// Newest first
pub async fn list_discussions(
    pool: &SqlitePool,
    filter: &DiscussionFilter,
) -> Result<Vec<Discussion>> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(DISCUSSION_SELECT);
    qb.push(" WHERE 1 = 1");
    if let Some(subject) = filter.subject {
        qb.push(" AND d.subject_id = ").push_bind(subject);
    }
    if let Some(author) = filter.author {
        qb.push(" AND d.author_id = ").push_bind(author);
    }
    qb.push(" ORDER BY d.created_at DESC, d.id DESC");

    Ok(qb.build_query_as::<Discussion>().fetch_all(pool).await?)
}

pub async fn get_discussion(pool: &SqlitePool, id: i64) -> Result<Option<Discussion>> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(DISCUSSION_SELECT);
    qb.push(" WHERE d.id = ").push_bind(id);

    Ok(qb.build_query_as::<Discussion>().fetch_optional(pool).await?)
}

pub async fn insert_discussion(
    pool: &SqlitePool,
    author_id: i64,
    subject_id: Option<i64>,
    title: &str,
    content: &str,
    now: DateTime<Utc>,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO discussions (author_id, subject_id, title, content, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(author_id)
    .bind(subject_id)
    .bind(title)
    .bind(content)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn update_discussion(
    pool: &SqlitePool,
    id: i64,
    subject_id: Option<i64>,
    title: &str,
    content: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        "UPDATE discussions SET subject_id = ?, title = ?, content = ?, updated_at = ? WHERE id = ?",
    )
    .bind(subject_id)
    .bind(title)
    .bind(content)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Delete a discussion; replies go with it through the foreign key cascade
pub async fn delete_discussion(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM discussions WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() == 1)
}

/// All replies of a discussion in creation order
pub async fn replies_of(pool: &SqlitePool, discussion_id: i64) -> Result<Vec<Reply>> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(REPLY_SELECT);
    qb.push(" WHERE r.discussion_id = ")
        .push_bind(discussion_id)
        .push(" ORDER BY r.created_at ASC, r.id ASC");

    Ok(qb.build_query_as::<Reply>().fetch_all(pool).await?)
}

pub async fn get_reply(pool: &SqlitePool, id: i64) -> Result<Option<Reply>> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(REPLY_SELECT);
    qb.push(" WHERE r.id = ").push_bind(id);

    Ok(qb.build_query_as::<Reply>().fetch_optional(pool).await?)
}

pub async fn insert_reply(
    pool: &SqlitePool,
    discussion_id: i64,
    author_id: i64,
    parent_id: Option<i64>,
    content: &str,
    now: DateTime<Utc>,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO replies (discussion_id, author_id, parent_id, content, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(discussion_id)
    .bind(author_id)
    .bind(parent_id)
    .bind(content)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}
