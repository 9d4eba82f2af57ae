//! User account queries

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use studyhub_common::db::Role;
use studyhub_common::Result;

use crate::models::{Actor, Subject, User, UserFilter};

const USER_SELECT: &str = r#"
    SELECT u.id, u.username, u.email, u.first_name, u.last_name, u.role, u.bio,
           u.avatar, u.date_joined
    FROM users u
"#;

/// Columns written at registration
pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub role: Role,
    pub bio: &'a str,
}

/// Resolve an authenticated user id to an actor
pub async fn find_actor(pool: &SqlitePool, id: i64) -> Result<Option<Actor>> {
    let actor = sqlx::query_as::<_, Actor>("SELECT id, username, role FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(actor)
}

/// Role of a user, `None` when the user does not exist
pub async fn role_of(pool: &SqlitePool, id: i64) -> Result<Option<Role>> {
    let role: Option<Role> = sqlx::query_scalar("SELECT role FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(role)
}

pub async fn get(pool: &SqlitePool, id: i64) -> Result<Option<User>> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(USER_SELECT);
    qb.push(" WHERE u.id = ").push_bind(id);

    let user = qb.build_query_as::<User>().fetch_optional(pool).await?;
    match user {
        Some(mut user) => {
            user.subjects = subjects_of(pool, user.id).await?;
            Ok(Some(user))
        }
        None => Ok(None),
    }
}

pub async fn list(pool: &SqlitePool, filter: &UserFilter) -> Result<Vec<User>> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(USER_SELECT);
    qb.push(" WHERE 1 = 1");
    if let Some(role) = filter.role {
        qb.push(" AND u.role = ").push_bind(role);
    }
    if let Some(subject) = filter.subject {
        qb.push(" AND EXISTS (SELECT 1 FROM user_subjects us WHERE us.user_id = u.id AND us.subject_id = ")
            .push_bind(subject)
            .push(")");
    }
    qb.push(" ORDER BY u.username ASC");

    let mut users = qb.build_query_as::<User>().fetch_all(pool).await?;
    for user in users.iter_mut() {
        user.subjects = subjects_of(pool, user.id).await?;
    }
    Ok(users)
}

pub async fn subjects_of(pool: &SqlitePool, user_id: i64) -> Result<Vec<Subject>> {
    let subjects = sqlx::query_as::<_, Subject>(
        r#"
        SELECT s.id, s.name, s.description
        FROM subjects s
        JOIN user_subjects us ON us.subject_id = s.id
        WHERE us.user_id = ?
        ORDER BY s.name ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(subjects)
}

/// Ids of users affiliated with a subject
pub async fn affiliated_with(pool: &SqlitePool, subject_id: i64) -> Result<Vec<i64>> {
    let ids = sqlx::query_scalar("SELECT user_id FROM user_subjects WHERE subject_id = ? ORDER BY user_id")
        .bind(subject_id)
        .fetch_all(pool)
        .await?;

    Ok(ids)
}

/// Insert a user with their subject affiliation
///
/// A taken username surfaces as a unique violation.
pub async fn insert(
    pool: &SqlitePool,
    user: &NewUser<'_>,
    subject_ids: &[i64],
    now: DateTime<Utc>,
) -> Result<i64> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        r#"
        INSERT INTO users (username, email, first_name, last_name, role, bio, date_joined)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user.username)
    .bind(user.email)
    .bind(user.first_name)
    .bind(user.last_name)
    .bind(user.role)
    .bind(user.bio)
    .bind(now)
    .execute(&mut *tx)
    .await?;
    let id = result.last_insert_rowid();

    for subject_id in subject_ids {
        sqlx::query("INSERT OR IGNORE INTO user_subjects (user_id, subject_id) VALUES (?, ?)")
            .bind(id)
            .bind(subject_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(id)
}

/// Profile values after an edit
pub struct ProfileUpdate<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: &'a str,
    pub bio: &'a str,
}

/// Update profile fields and, when given, replace the subject affiliation
pub async fn update_profile(
    pool: &SqlitePool,
    id: i64,
    profile: &ProfileUpdate<'_>,
    subject_ids: Option<&[i64]>,
) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("UPDATE users SET first_name = ?, last_name = ?, email = ?, bio = ? WHERE id = ?")
        .bind(profile.first_name)
        .bind(profile.last_name)
        .bind(profile.email)
        .bind(profile.bio)
        .bind(id)
        .execute(&mut *tx)
        .await?;

    if let Some(subject_ids) = subject_ids {
        sqlx::query("DELETE FROM user_subjects WHERE user_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        for subject_id in subject_ids {
            sqlx::query("INSERT OR IGNORE INTO user_subjects (user_id, subject_id) VALUES (?, ?)")
                .bind(id)
                .bind(subject_id)
                .execute(&mut *tx)
                .await?;
        }
    }

    tx.commit().await?;
    Ok(())
}
