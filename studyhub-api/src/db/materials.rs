//! Study material queries

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use studyhub_common::Result;

use crate::models::{MaterialOrdering, StudyMaterial};

const MATERIAL_SELECT: &str = r#"
    SELECT m.id, m.author_id AS author, u.username AS author_username,
           m.subject_id AS subject, s.name AS subject_name,
           m.title, m.description, m.file, m.link, m.created_at, m.updated_at
    FROM study_materials m
    JOIN users u ON u.id = m.author_id
    JOIN subjects s ON s.id = m.subject_id
"#;

/// Editable material columns
pub struct MaterialFields<'a> {
    pub subject_id: i64,
    pub title: &'a str,
    pub description: &'a str,
    pub link: &'a str,
}

pub async fn list(
    pool: &SqlitePool,
    subject: Option<i64>,
    author: Option<i64>,
    ordering: MaterialOrdering,
) -> Result<Vec<StudyMaterial>> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(MATERIAL_SELECT);
    qb.push(" WHERE 1 = 1");
    if let Some(subject) = subject {
        qb.push(" AND m.subject_id = ").push_bind(subject);
    }
    if let Some(author) = author {
        qb.push(" AND m.author_id = ").push_bind(author);
    }
    qb.push(" ORDER BY ").push(ordering.order_by());

    Ok(qb.build_query_as::<StudyMaterial>().fetch_all(pool).await?)
}

pub async fn get(pool: &SqlitePool, id: i64) -> Result<Option<StudyMaterial>> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(MATERIAL_SELECT);
    qb.push(" WHERE m.id = ").push_bind(id);

    Ok(qb.build_query_as::<StudyMaterial>().fetch_optional(pool).await?)
}

pub async fn insert(
    pool: &SqlitePool,
    author_id: i64,
    fields: &MaterialFields<'_>,
    now: DateTime<Utc>,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO study_materials (author_id, subject_id, title, description, link, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(author_id)
    .bind(fields.subject_id)
    .bind(fields.title)
    .bind(fields.description)
    .bind(fields.link)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn update(
    pool: &SqlitePool,
    id: i64,
    fields: &MaterialFields<'_>,
    now: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE study_materials
        SET subject_id = ?, title = ?, description = ?, link = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(fields.subject_id)
    .bind(fields.title)
    .bind(fields.description)
    .bind(fields.link)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM study_materials WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() == 1)
}
