//! Session lifecycle engine
//!
//! Every operation takes the acting user explicitly, runs the pure guards in
//! [`guards`], persists with compare-and-set updates and finally dispatches
//! notifications. State machine:
//!
//! ```text
//! pending --confirm (tutor)--> scheduled --mark completed (tutor)--> completed
//!    |                            |
//!    +------cancel (tutor or student)------> cancelled
//! ```

pub mod guards;

pub use guards::*;

use studyhub_common::db::{NotificationType, SessionStatus};
use studyhub_common::events::PlatformEvent;
use studyhub_common::time;
use tracing::{info, warn};

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::models::{
    Actor, CreateReviewRequest, CreateSessionRequest, SessionReview, TutoringSession,
    UpdateReviewRequest, UpdateSessionRequest,
};
use crate::notify::{self, Notice};
use crate::AppState;

/// Message when a compare-and-set lost against a concurrent write
const CONCURRENT_CHANGE: &str = "Session was changed by another request; reload and retry";

fn session_link(id: i64) -> String {
    format!("/sessions/{}", id)
}

async fn load_session(state: &AppState, id: i64) -> ApiResult<TutoringSession> {
    db::sessions::get(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Session {} not found", id)))
}

fn slot_error_on_unique(err: studyhub_common::Error) -> ApiError {
    if err.is_unique_violation() {
        ApiError::validation(SLOT_TAKEN)
    } else {
        err.into()
    }
}

fn emit_transition(
    state: &AppState,
    session: &TutoringSession,
    old_status: SessionStatus,
    actor: &Actor,
) {
    state.event_bus.emit_lossy(PlatformEvent::SessionStatusChanged {
        session_id: session.id,
        tutor_id: session.tutor,
        student_id: session.student,
        old_status,
        new_status: session.status,
        actor_id: actor.id,
        timestamp: time::now(),
    });
}

/// Create a session for the actor
pub async fn create_session(
    state: &AppState,
    actor: &Actor,
    req: &CreateSessionRequest,
) -> ApiResult<TutoringSession> {
    let draft = check_create(actor, req)?;

    check_subject_exists(db::subjects::exists(&state.db, draft.subject_id).await?)?;
    if draft.tutor_id != actor.id {
        check_tutor_role(db::users::role_of(&state.db, draft.tutor_id).await?)?;
    }
    if let Some(student_id) = draft.student_id {
        if student_id != actor.id {
            check_student_role(db::users::role_of(&state.db, student_id).await?)?;
        }
    }

    if draft.initial_status().is_active()
        && db::sessions::slot_taken(&state.db, draft.tutor_id, draft.date, draft.time, None).await?
    {
        return Err(ApiError::validation(SLOT_TAKEN));
    }

    let id = db::sessions::insert(&state.db, &draft, time::now())
        .await
        .map_err(slot_error_on_unique)?;
    let session = load_session(state, id).await?;

    info!(
        session_id = session.id,
        actor = actor.id,
        status = %session.status,
        "Session created"
    );

    if let Some(recipient) = session.counterpart_of(actor.id) {
        let notice = if actor.is_student() {
            Notice::new(
                NotificationType::SessionCreated,
                "New session request",
                format!(
                    "{} requested a {} session on {} at {}",
                    actor.username, session.subject_name, session.date, session.time
                ),
                session_link(session.id),
            )
        } else {
            Notice::new(
                NotificationType::SessionCreated,
                "New session scheduled",
                format!(
                    "{} scheduled a {} session with you on {} at {}",
                    actor.username, session.subject_name, session.date, session.time
                ),
                session_link(session.id),
            )
        };
        notify::send(state, recipient, &notice).await;
    }

    Ok(session)
}

/// Apply a partial update
pub async fn update_session(
    state: &AppState,
    actor: &Actor,
    id: i64,
    req: &UpdateSessionRequest,
) -> ApiResult<TutoringSession> {
    let session = load_session(state, id).await?;
    let changes = check_update(actor, &session, req)?;

    if let Some(subject_id) = changes.changed_subject {
        check_subject_exists(db::subjects::exists(&state.db, subject_id).await?)?;
    }
    if let Some(student_id) = changes.attached_student {
        check_student_role(db::users::role_of(&state.db, student_id).await?)?;
    }
    if changes.rescheduled
        && changes.status.is_active()
        && db::sessions::slot_taken(&state.db, session.tutor, changes.date, changes.time, Some(id))
            .await?
    {
        return Err(ApiError::validation(SLOT_TAKEN));
    }

    let applied = db::sessions::apply_changes(
        &state.db,
        id,
        session.status,
        session.student,
        &changes,
        time::now(),
    )
    .await
    .map_err(slot_error_on_unique)?;

    if !applied {
        warn!(session_id = id, actor = actor.id, "Session update lost a concurrent write");
        let current = load_session(state, id).await?;
        check_update(actor, &current, req)?;
        return Err(ApiError::Conflict(CONCURRENT_CHANGE.to_string()));
    }

    let updated = load_session(state, id).await?;
    if changes.status_changed(session.status) {
        info!(
            session_id = id,
            actor = actor.id,
            from = %session.status,
            to = %updated.status,
            "Session status changed"
        );
        emit_transition(state, &updated, session.status, actor);
    } else {
        info!(session_id = id, actor = actor.id, "Session updated");
    }

    if let Some(recipient) = updated.counterpart_of(actor.id) {
        let message = if changes.status_changed(session.status) {
            format!("Session '{}' was marked {}", updated.title, updated.status)
        } else if changes.attached_student.is_some() {
            format!("{} booked your session '{}'", actor.username, updated.title)
        } else {
            format!("{} updated session '{}'", actor.username, updated.title)
        };
        let notice = Notice::new(
            NotificationType::SessionUpdated,
            "Session updated",
            message,
            session_link(id),
        );
        notify::send(state, recipient, &notice).await;
    }

    Ok(updated)
}

/// pending -> scheduled by the assigned tutor
pub async fn confirm_session(state: &AppState, actor: &Actor, id: i64) -> ApiResult<TutoringSession> {
    let session = load_session(state, id).await?;
    check_confirm(actor, &session)?;

    if !db::sessions::confirm(&state.db, id, time::now()).await? {
        // Lost the race: report what the winner left behind
        let current = load_session(state, id).await?;
        check_confirm(actor, &current)?;
        return Err(ApiError::Conflict(CONCURRENT_CHANGE.to_string()));
    }

    let confirmed = load_session(state, id).await?;
    info!(session_id = id, actor = actor.id, "Session confirmed");
    emit_transition(state, &confirmed, session.status, actor);

    if let Some(student) = confirmed.student {
        let notice = Notice::new(
            NotificationType::SessionUpdated,
            "Session confirmed",
            format!(
                "{} confirmed your session on {} at {}",
                actor.username, confirmed.date, confirmed.time
            ),
            session_link(id),
        );
        notify::send(state, student, &notice).await;
    }

    Ok(confirmed)
}

/// pending|scheduled -> cancelled by either participant
pub async fn cancel_session(
    state: &AppState,
    actor: &Actor,
    id: i64,
    reason: Option<&str>,
) -> ApiResult<TutoringSession> {
    let session = load_session(state, id).await?;
    check_cancel(actor, &session)?;

    let reason = reason.unwrap_or_default();
    if !db::sessions::cancel(&state.db, id, actor.id, reason, time::now()).await? {
        let current = load_session(state, id).await?;
        check_cancel(actor, &current)?;
        return Err(ApiError::Conflict(CONCURRENT_CHANGE.to_string()));
    }

    let cancelled = load_session(state, id).await?;
    info!(session_id = id, actor = actor.id, "Session cancelled");
    emit_transition(state, &cancelled, session.status, actor);

    if let Some(recipient) = cancelled.counterpart_of(actor.id) {
        let message = if reason.is_empty() {
            format!("{} cancelled session '{}'", actor.username, cancelled.title)
        } else {
            format!(
                "{} cancelled session '{}': {}",
                actor.username, cancelled.title, reason
            )
        };
        let notice = Notice::new(
            NotificationType::SessionCancelled,
            "Session cancelled",
            message,
            session_link(id),
        );
        notify::send(state, recipient, &notice).await;
    }

    Ok(cancelled)
}

pub async fn delete_session(state: &AppState, actor: &Actor, id: i64) -> ApiResult<()> {
    let session = load_session(state, id).await?;
    check_delete(actor, &session)?;

    if !db::sessions::delete(&state.db, id).await? {
        return Err(ApiError::NotFound(format!("Session {} not found", id)));
    }
    info!(session_id = id, actor = actor.id, "Session deleted");
    Ok(())
}

/// Review a completed session
pub async fn create_review(
    state: &AppState,
    actor: &Actor,
    req: &CreateReviewRequest,
) -> ApiResult<SessionReview> {
    let session = match req.session {
        Some(id) => db::sessions::get(&state.db, id).await?,
        None => None,
    };
    let rating = check_review_create(session.as_ref(), req.rating)?;
    // check_review_create rejects a missing session
    let session_id = session.map(|s| s.id).unwrap_or_default();

    let id = db::reviews::insert(
        &state.db,
        session_id,
        actor.id,
        rating,
        req.comment.trim(),
        time::now(),
    )
    .await
    .map_err(|e| {
        if e.is_unique_violation() {
            ApiError::field("session", ALREADY_REVIEWED)
        } else {
            e.into()
        }
    })?;

    info!(session_id, review_id = id, actor = actor.id, rating, "Session reviewed");

    db::reviews::get(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::Internal(format!("Review {} vanished after insert", id)))
}

pub async fn update_review(
    state: &AppState,
    actor: &Actor,
    id: i64,
    req: &UpdateReviewRequest,
) -> ApiResult<SessionReview> {
    let review = load_review(state, id).await?;
    check_review_owner(actor, &review)?;

    let rating = req.rating.unwrap_or(review.rating);
    check_rating(rating)?;
    let comment = req.comment.as_deref().unwrap_or(&review.comment).trim();

    db::reviews::update(&state.db, id, rating, comment, time::now()).await?;
    load_review(state, id).await
}

pub async fn delete_review(state: &AppState, actor: &Actor, id: i64) -> ApiResult<()> {
    let review = load_review(state, id).await?;
    check_review_owner(actor, &review)?;

    db::reviews::delete(&state.db, id).await?;
    info!(review_id = id, actor = actor.id, "Review deleted");
    Ok(())
}

pub async fn load_review(state: &AppState, id: i64) -> ApiResult<SessionReview> {
    db::reviews::get(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Review {} not found", id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime, Utc};
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::SqlitePool;
    use studyhub_common::db::Role;

    async fn pool_with_tutor() -> (SqlitePool, i64, i64) {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        studyhub_common::db::init_schema(&pool).await.unwrap();

        let subject = db::subjects::insert(&pool, "Physics", "", Utc::now()).await.unwrap();
        let tutor = db::users::insert(
            &pool,
            &db::users::NewUser {
                username: "tutor_tia",
                email: "tia@example.com",
                first_name: "",
                last_name: "",
                role: Role::Tutor,
                bio: "",
            },
            &[],
            Utc::now(),
        )
        .await
        .unwrap();
        (pool, tutor, subject)
    }

    fn draft(tutor_id: i64, subject_id: i64) -> SessionDraft {
        SessionDraft {
            tutor_id,
            student_id: None,
            subject_id,
            title: "Optics".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            time: NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
            duration: 60,
            notes: String::new(),
            confirmation_required: true,
            max_students: 1,
        }
    }

    #[tokio::test]
    async fn test_duplicate_active_slot_maps_to_slot_taken() {
        let (pool, tutor, subject) = pool_with_tutor().await;
        db::sessions::insert(&pool, &draft(tutor, subject), Utc::now()).await.unwrap();

        let err = db::sessions::insert(&pool, &draft(tutor, subject), Utc::now())
            .await
            .unwrap_err();
        match slot_error_on_unique(err) {
            ApiError::Validation { field, message } => {
                assert_eq!(field, None);
                assert_eq!(message, SLOT_TAKEN);
            }
            other => panic!("expected slot validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_other_database_errors_pass_through() {
        let (pool, tutor, _) = pool_with_tutor().await;

        // Unknown subject trips the foreign key, not the slot index
        let err = db::sessions::insert(&pool, &draft(tutor, 9999), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(slot_error_on_unique(err), ApiError::Common(_)));
    }
}
