//! Tutoring session queries
//!
//! Status transitions are compare-and-set: every UPDATE names the statuses
//! it may leave from and reports whether a row changed. The partial unique
//! index `idx_sessions_active_tutor_slot` backs the slot conflict check.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use studyhub_common::db::SessionStatus;
use studyhub_common::Result;

use crate::db::reviews;
use crate::lifecycle::{SessionChanges, SessionDraft};
use crate::models::{SessionFilter, TutoringSession};

const SESSION_SELECT: &str = r#"
    SELECT s.id,
           s.tutor_id AS tutor, t.username AS tutor_username,
           s.student_id AS student, st.username AS student_username,
           s.subject_id AS subject, sub.name AS subject_name,
           s.title, s.date, s.time, s.duration, s.status, s.notes,
           s.confirmation_required, s.is_confirmed, s.confirmed_at,
           s.cancelled_by, s.cancellation_reason, s.max_students,
           s.created_at, s.updated_at
    FROM tutoring_sessions s
    JOIN users t ON t.id = s.tutor_id
    LEFT JOIN users st ON st.id = s.student_id
    JOIN subjects sub ON sub.id = s.subject_id
"#;

/// Which listing to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionView {
    /// Every session, oldest slot first
    All,
    /// Active sessions on or after the given date, soonest first
    Upcoming(NaiveDate),
    /// Completed sessions, latest date first
    Completed,
    /// Sessions where the user is tutor or student, latest slot first
    InvolvingUser(i64),
}

/// Load one session with its review
pub async fn get(pool: &SqlitePool, id: i64) -> Result<Option<TutoringSession>> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(SESSION_SELECT);
    qb.push(" WHERE s.id = ").push_bind(id);

    let session = qb.build_query_as::<TutoringSession>().fetch_optional(pool).await?;
    match session {
        Some(mut session) => {
            session.review = reviews::for_session(pool, session.id).await?;
            Ok(Some(session))
        }
        None => Ok(None),
    }
}

pub async fn list(
    pool: &SqlitePool,
    view: SessionView,
    filter: &SessionFilter,
) -> Result<Vec<TutoringSession>> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(SESSION_SELECT);
    qb.push(" WHERE 1 = 1");

    match view {
        SessionView::All => {}
        SessionView::Upcoming(today) => {
            qb.push(" AND s.date >= ")
                .push_bind(today)
                .push(" AND s.status IN ('pending', 'scheduled')");
        }
        SessionView::Completed => {
            qb.push(" AND s.status = 'completed'");
        }
        SessionView::InvolvingUser(user_id) => {
            qb.push(" AND (s.tutor_id = ")
                .push_bind(user_id)
                .push(" OR s.student_id = ")
                .push_bind(user_id)
                .push(")");
        }
    }

    if let Some(subject) = filter.subject {
        qb.push(" AND s.subject_id = ").push_bind(subject);
    }
    if let Some(tutor) = filter.tutor {
        qb.push(" AND s.tutor_id = ").push_bind(tutor);
    }
    if let Some(student) = filter.student {
        qb.push(" AND s.student_id = ").push_bind(student);
    }
    if let Some(status) = filter.status {
        qb.push(" AND s.status = ").push_bind(status);
    }

    qb.push(match view {
        SessionView::All | SessionView::Upcoming(_) => {
            " ORDER BY s.date ASC, s.time ASC, s.id ASC"
        }
        SessionView::Completed => " ORDER BY s.date DESC, s.time DESC, s.id DESC",
        SessionView::InvolvingUser(_) => " ORDER BY s.date DESC, s.time DESC, s.id DESC",
    });

    let mut sessions = qb.build_query_as::<TutoringSession>().fetch_all(pool).await?;
    reviews::attach(pool, &mut sessions).await?;
    Ok(sessions)
}

/// Whether the tutor already holds an active session at the exact slot
pub async fn slot_taken(
    pool: &SqlitePool,
    tutor_id: i64,
    date: NaiveDate,
    time: NaiveTime,
    exclude_id: Option<i64>,
) -> Result<bool> {
    let found: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT id FROM tutoring_sessions
        WHERE tutor_id = ? AND date = ? AND time = ?
          AND status IN ('pending', 'scheduled')
          AND id != ?
        LIMIT 1
        "#,
    )
    .bind(tutor_id)
    .bind(date)
    .bind(time)
    .bind(exclude_id.unwrap_or(-1))
    .fetch_optional(pool)
    .await?;

    Ok(found.is_some())
}

/// Insert a validated draft, returning the new id
pub async fn insert(pool: &SqlitePool, draft: &SessionDraft, now: DateTime<Utc>) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO tutoring_sessions (
            tutor_id, student_id, subject_id, title, date, time, duration, status,
            notes, confirmation_required, is_confirmed, max_students, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?, ?)
        "#,
    )
    .bind(draft.tutor_id)
    .bind(draft.student_id)
    .bind(draft.subject_id)
    .bind(&draft.title)
    .bind(draft.date)
    .bind(draft.time)
    .bind(draft.duration)
    .bind(draft.initial_status())
    .bind(&draft.notes)
    .bind(draft.confirmation_required)
    .bind(draft.max_students)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Write edited fields if status and student are still as last read
///
/// Returns false when a concurrent write moved the session first.
pub async fn apply_changes(
    pool: &SqlitePool,
    id: i64,
    expected_status: SessionStatus,
    expected_student: Option<i64>,
    changes: &SessionChanges,
    now: DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE tutoring_sessions
        SET subject_id = ?, student_id = ?, title = ?, date = ?, time = ?, duration = ?,
            notes = ?, status = ?, max_students = ?, updated_at = ?
        WHERE id = ? AND status = ? AND student_id IS ?
        "#,
    )
    .bind(changes.subject_id)
    .bind(changes.student_id)
    .bind(&changes.title)
    .bind(changes.date)
    .bind(changes.time)
    .bind(changes.duration)
    .bind(&changes.notes)
    .bind(changes.status)
    .bind(changes.max_students)
    .bind(now)
    .bind(id)
    .bind(expected_status)
    .bind(expected_student)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// pending -> scheduled, stamping the confirmation
pub async fn confirm(pool: &SqlitePool, id: i64, now: DateTime<Utc>) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE tutoring_sessions
        SET status = 'scheduled', is_confirmed = 1, confirmed_at = ?, updated_at = ?
        WHERE id = ? AND status = 'pending'
        "#,
    )
    .bind(now)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// pending|scheduled -> cancelled
pub async fn cancel(
    pool: &SqlitePool,
    id: i64,
    cancelled_by: i64,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE tutoring_sessions
        SET status = 'cancelled', cancelled_by = ?, cancellation_reason = ?, updated_at = ?
        WHERE id = ? AND status IN ('pending', 'scheduled')
        "#,
    )
    .bind(cancelled_by)
    .bind(reason)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM tutoring_sessions WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() == 1)
}
