//! Guard clauses for session lifecycle operations
//!
//! Each function inspects the actor, the current session state and the
//! request, and either returns what to write or a tagged [`GuardError`].
//! Nothing here touches the database: facts that need a lookup (does the
//! subject exist, which role does a user have) are passed in by the caller.

use chrono::{NaiveDate, NaiveTime};
use studyhub_common::db::{Role, SessionStatus};
use studyhub_common::time::truncate_to_seconds;
use thiserror::Error;

use crate::models::{
    Actor, CreateSessionRequest, SessionReview, TutoringSession, UpdateSessionRequest,
    DEFAULT_DURATION_MINUTES, DEFAULT_SESSION_TITLE,
};

/// Message for an occupied tutor slot
pub const SLOT_TAKEN: &str = "Tutor already has a session at this time";

/// Message for a second review of the same session
pub const ALREADY_REVIEWED: &str = "This session has already been reviewed";

const REQUIRED: &str = "This field is required.";

/// Rejection reason of a guard
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardError {
    #[error("{message}")]
    Validation {
        field: Option<&'static str>,
        message: String,
    },

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),
}

impl GuardError {
    pub fn field(field: &'static str, message: impl Into<String>) -> Self {
        GuardError::Validation {
            field: Some(field),
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        GuardError::Validation {
            field: None,
            message: message.into(),
        }
    }

    /// Field the error is attributed to, if any
    pub fn field_name(&self) -> Option<&'static str> {
        match self {
            GuardError::Validation { field, .. } => *field,
            _ => None,
        }
    }
}

pub type GuardResult<T> = std::result::Result<T, GuardError>;

/// Validated values for a new session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionDraft {
    pub tutor_id: i64,
    pub student_id: Option<i64>,
    pub subject_id: i64,
    pub title: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub duration: i64,
    pub notes: String,
    pub confirmation_required: bool,
    pub max_students: i64,
}

impl SessionDraft {
    /// Sessions needing confirmation start pending, others go straight to scheduled
    pub fn initial_status(&self) -> SessionStatus {
        if self.confirmation_required {
            SessionStatus::Pending
        } else {
            SessionStatus::Scheduled
        }
    }
}

/// Resolve participants and validate the shape of a create request
///
/// A tutor always creates for themselves and may name a student. A student
/// always books for themselves and must name a tutor.
pub fn check_create(actor: &Actor, req: &CreateSessionRequest) -> GuardResult<SessionDraft> {
    let date = req.date.ok_or_else(|| GuardError::field("date", REQUIRED))?;
    let time = req.time.ok_or_else(|| GuardError::field("time", REQUIRED))?;
    let subject_id = req.subject.ok_or_else(|| GuardError::field("subject", REQUIRED))?;

    let (tutor_id, student_id) = match actor.role {
        Role::Tutor => {
            if let Some(tutor) = req.tutor {
                if tutor != actor.id {
                    return Err(GuardError::field(
                        "tutor",
                        "Tutors can only create sessions for themselves",
                    ));
                }
            }
            (actor.id, req.student)
        }
        Role::Student => {
            let tutor = req
                .tutor
                .ok_or_else(|| GuardError::field("tutor", "Please select a tutor"))?;
            if let Some(student) = req.student {
                if student != actor.id {
                    return Err(GuardError::field(
                        "student",
                        "Students can only book sessions for themselves",
                    ));
                }
            }
            (tutor, Some(actor.id))
        }
    };

    let duration = req.duration.unwrap_or(DEFAULT_DURATION_MINUTES);
    check_duration(duration)?;
    let max_students = req.max_students.unwrap_or(1);
    check_max_students(max_students)?;

    let title = match req.title.as_deref().map(str::trim) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => DEFAULT_SESSION_TITLE.to_string(),
    };

    Ok(SessionDraft {
        tutor_id,
        student_id,
        subject_id,
        title,
        date,
        time: truncate_to_seconds(time),
        duration,
        notes: req.notes.clone().unwrap_or_default(),
        confirmation_required: req.confirmation_required.unwrap_or(true),
        max_students,
    })
}

/// The referenced subject must exist
pub fn check_subject_exists(exists: bool) -> GuardResult<()> {
    if exists {
        Ok(())
    } else {
        Err(GuardError::field("subject", "Subject not found"))
    }
}

/// The referenced tutor must exist with role tutor
pub fn check_tutor_role(role: Option<Role>) -> GuardResult<()> {
    match role {
        Some(Role::Tutor) => Ok(()),
        Some(_) => Err(GuardError::field("tutor", "Selected user is not a tutor")),
        None => Err(GuardError::field("tutor", "Tutor not found")),
    }
}

/// The referenced student must exist with role student
pub fn check_student_role(role: Option<Role>) -> GuardResult<()> {
    match role {
        Some(Role::Student) => Ok(()),
        Some(_) => Err(GuardError::field("student", "Selected user is not a student")),
        None => Err(GuardError::field("student", "Student not found")),
    }
}

fn check_duration(duration: i64) -> GuardResult<()> {
    if duration < 1 {
        return Err(GuardError::field("duration", "Duration must be at least 1 minute"));
    }
    Ok(())
}

fn check_max_students(max_students: i64) -> GuardResult<()> {
    if max_students < 1 {
        return Err(GuardError::field(
            "max_students",
            "Ensure this value is greater than or equal to 1.",
        ));
    }
    Ok(())
}

/// Session field values after applying a PATCH
#[derive(Debug, Clone, PartialEq)]
pub struct SessionChanges {
    pub subject_id: i64,
    pub student_id: Option<i64>,
    pub title: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub duration: i64,
    pub notes: String,
    pub status: SessionStatus,
    pub max_students: i64,
    /// Date or time moved
    pub rescheduled: bool,
    /// Student newly attached by this update
    pub attached_student: Option<i64>,
    /// Subject replaced by this update
    pub changed_subject: Option<i64>,
}

impl SessionChanges {
    pub fn status_changed(&self, before: SessionStatus) -> bool {
        self.status != before
    }
}

/// Validate a PATCH against the current session
///
/// Only participants may edit, apart from a student claiming an open slot
/// for themselves. Cancelled sessions are frozen, completed ones
/// keep their status. The only status move allowed here is the tutor marking
/// a scheduled session completed; confirm and cancel have their own
/// operations.
pub fn check_update(
    actor: &Actor,
    session: &TutoringSession,
    req: &UpdateSessionRequest,
) -> GuardResult<SessionChanges> {
    if !session.is_participant(actor.id) && !is_self_booking(actor, session, req) {
        return Err(GuardError::Forbidden(
            "Only the tutor or student can modify this session".to_string(),
        ));
    }

    if session.status == SessionStatus::Cancelled {
        return Err(GuardError::invalid("Cannot modify a cancelled session"));
    }

    let status = match req.status {
        None => session.status,
        Some(next) if next == session.status => next,
        Some(_) if session.status == SessionStatus::Completed => {
            return Err(GuardError::field(
                "status",
                "Cannot change status of a completed session",
            ));
        }
        Some(SessionStatus::Completed) if session.status == SessionStatus::Scheduled => {
            if actor.id != session.tutor {
                return Err(GuardError::Forbidden(
                    "Only the tutor can mark a session completed".to_string(),
                ));
            }
            SessionStatus::Completed
        }
        Some(next) => {
            return Err(GuardError::field(
                "status",
                format!(
                    "Cannot move a session from {} to {} here; use the confirm or cancel endpoint",
                    session.status, next
                ),
            ));
        }
    };

    let attached_student = match req.student {
        None => None,
        Some(student) if session.student == Some(student) => None,
        Some(_) if session.student.is_some() => {
            return Err(GuardError::field("student", "Session already has a student"));
        }
        Some(_) if session.status == SessionStatus::Completed => {
            return Err(GuardError::field("student", "Cannot book a completed session"));
        }
        Some(student) => {
            if actor.is_student() && student != actor.id {
                return Err(GuardError::field(
                    "student",
                    "Students can only book sessions for themselves",
                ));
            }
            Some(student)
        }
    };

    let duration = req.duration.unwrap_or(session.duration);
    check_duration(duration)?;
    let max_students = req.max_students.unwrap_or(session.max_students);
    check_max_students(max_students)?;

    let date = req.date.unwrap_or(session.date);
    let time = req.time.map(truncate_to_seconds).unwrap_or(session.time);
    let changed_subject = req.subject.filter(|s| *s != session.subject);

    let title = match req.title.as_deref().map(str::trim) {
        Some("") => DEFAULT_SESSION_TITLE.to_string(),
        Some(t) => t.to_string(),
        None => session.title.clone(),
    };

    Ok(SessionChanges {
        subject_id: changed_subject.unwrap_or(session.subject),
        student_id: attached_student.or(session.student),
        title,
        date,
        time,
        duration,
        notes: req.notes.clone().unwrap_or_else(|| session.notes.clone()),
        status,
        max_students,
        rescheduled: date != session.date || time != session.time,
        attached_student,
        changed_subject,
    })
}

/// A student claiming an open slot, and touching nothing else
fn is_self_booking(actor: &Actor, session: &TutoringSession, req: &UpdateSessionRequest) -> bool {
    actor.is_student()
        && session.student.is_none()
        && req.student == Some(actor.id)
        && req.subject.is_none()
        && req.title.is_none()
        && req.date.is_none()
        && req.time.is_none()
        && req.duration.is_none()
        && req.notes.is_none()
        && req.status.is_none()
        && req.max_students.is_none()
}

/// Only the assigned tutor confirms, and only a pending session
pub fn check_confirm(actor: &Actor, session: &TutoringSession) -> GuardResult<()> {
    if actor.id != session.tutor {
        return Err(GuardError::Forbidden(
            "Only the tutor can confirm this session".to_string(),
        ));
    }
    if session.status != SessionStatus::Pending {
        return Err(GuardError::invalid("Can only confirm pending sessions"));
    }
    Ok(())
}

/// Either participant cancels a session that is still active
pub fn check_cancel(actor: &Actor, session: &TutoringSession) -> GuardResult<()> {
    if !session.is_participant(actor.id) {
        return Err(GuardError::Forbidden(
            "Only the tutor or student can cancel this session".to_string(),
        ));
    }
    match session.status {
        SessionStatus::Cancelled => Err(GuardError::invalid("Session is already cancelled")),
        SessionStatus::Completed => Err(GuardError::invalid("Cannot cancel completed sessions")),
        SessionStatus::Pending | SessionStatus::Scheduled => Ok(()),
    }
}

pub fn check_delete(actor: &Actor, session: &TutoringSession) -> GuardResult<()> {
    if !session.is_participant(actor.id) {
        return Err(GuardError::Forbidden(
            "Only the tutor or student can delete this session".to_string(),
        ));
    }
    Ok(())
}

pub fn check_rating(rating: i64) -> GuardResult<()> {
    if !(1..=5).contains(&rating) {
        return Err(GuardError::field("rating", "Rating must be between 1 and 5"));
    }
    Ok(())
}

/// A review targets an existing completed session that has no review yet
///
/// The reviewer is not required to be a participant.
pub fn check_review_create(
    session: Option<&TutoringSession>,
    rating: Option<i64>,
) -> GuardResult<i64> {
    let session = session.ok_or_else(|| GuardError::field("session", "Session not found"))?;
    let rating = rating.ok_or_else(|| GuardError::field("rating", REQUIRED))?;
    check_rating(rating)?;

    if session.status != SessionStatus::Completed {
        return Err(GuardError::invalid("Can only review completed sessions"));
    }
    if session.review.is_some() {
        return Err(GuardError::field("session", ALREADY_REVIEWED));
    }
    Ok(rating)
}

/// Only the reviewer edits or deletes a review
pub fn check_review_owner(actor: &Actor, review: &SessionReview) -> GuardResult<()> {
    if review.reviewer != actor.id {
        return Err(GuardError::Forbidden(
            "Only the reviewer can change this review".to_string(),
        ));
    }
    Ok(())
}
