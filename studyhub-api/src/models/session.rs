//! Tutoring sessions and their reviews

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use studyhub_common::db::SessionStatus;

/// Default session title
pub const DEFAULT_SESSION_TITLE: &str = "Tutoring Session";

/// Default session length in minutes
pub const DEFAULT_DURATION_MINUTES: i64 = 60;

/// Tutoring session as returned by the API
///
/// Participant and subject names are joined in for display.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TutoringSession {
    pub id: i64,
    pub tutor: i64,
    pub tutor_username: String,
    pub student: Option<i64>,
    pub student_username: Option<String>,
    pub subject: i64,
    pub subject_name: String,
    pub title: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub duration: i64,
    pub status: SessionStatus,
    pub notes: String,
    pub confirmation_required: bool,
    pub is_confirmed: bool,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<i64>,
    pub cancellation_reason: String,
    pub max_students: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub review: Option<SessionReview>,
}

impl TutoringSession {
    pub fn is_participant(&self, user_id: i64) -> bool {
        self.tutor == user_id || self.student == Some(user_id)
    }

    /// The participant on the other side of `user_id`, if any
    pub fn counterpart_of(&self, user_id: i64) -> Option<i64> {
        if self.tutor == user_id {
            self.student
        } else {
            Some(self.tutor)
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct CreateSessionRequest {
    pub subject: Option<i64>,
    pub tutor: Option<i64>,
    pub student: Option<i64>,
    pub title: Option<String>,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub duration: Option<i64>,
    pub notes: Option<String>,
    pub confirmation_required: Option<bool>,
    pub max_students: Option<i64>,
}

/// Partial session update; absent fields stay unchanged
#[derive(Debug, Default, Clone, Deserialize)]
pub struct UpdateSessionRequest {
    pub subject: Option<i64>,
    pub student: Option<i64>,
    pub title: Option<String>,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub duration: Option<i64>,
    pub notes: Option<String>,
    pub status: Option<SessionStatus>,
    pub max_students: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelSessionRequest {
    pub reason: Option<String>,
}

/// Query filters for session listings
#[derive(Debug, Default, Clone, Deserialize)]
pub struct SessionFilter {
    pub subject: Option<i64>,
    pub tutor: Option<i64>,
    pub student: Option<i64>,
    pub status: Option<SessionStatus>,
}

/// Post-completion review, one per session
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct SessionReview {
    pub id: i64,
    pub session: i64,
    pub reviewer: i64,
    pub reviewer_username: String,
    pub rating: i64,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    pub session: Option<i64>,
    pub rating: Option<i64>,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateReviewRequest {
    pub rating: Option<i64>,
    pub comment: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_request_parses_partial_body() {
        let req: UpdateSessionRequest =
            serde_json::from_str(r#"{"status": "completed", "time": "15:30:00"}"#).unwrap();
        assert_eq!(req.status, Some(SessionStatus::Completed));
        assert_eq!(req.time, NaiveTime::from_hms_opt(15, 30, 0));
        assert!(req.date.is_none());
        assert!(req.student.is_none());
    }

    #[test]
    fn test_create_request_dates() {
        let req: CreateSessionRequest = serde_json::from_str(
            r#"{"subject": 1, "tutor": 2, "date": "2025-01-10", "time": "14:00:00"}"#,
        )
        .unwrap();
        assert_eq!(req.date, NaiveDate::from_ymd_opt(2025, 1, 10));
        assert_eq!(req.time, NaiveTime::from_hms_opt(14, 0, 0));
        assert!(req.confirmation_required.is_none());
    }
}
