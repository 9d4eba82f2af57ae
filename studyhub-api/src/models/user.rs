//! Users and the subject catalog

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use studyhub_common::db::Role;

/// Subject catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Subject {
    pub id: i64,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateSubjectRequest {
    pub name: Option<String>,
    #[serde(default)]
    pub description: String,
}

/// Authenticated identity performing a request
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Actor {
    pub id: i64,
    pub username: String,
    pub role: Role,
}

impl Actor {
    pub fn is_tutor(&self) -> bool {
        self.role == Role::Tutor
    }

    pub fn is_student(&self) -> bool {
        self.role == Role::Student
    }
}

/// Public user profile
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub bio: String,
    pub avatar: Option<String>,
    pub date_joined: DateTime<Utc>,
    /// Affiliated subjects, loaded separately
    #[sqlx(skip)]
    pub subjects: Vec<Subject>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub subject_ids: Vec<i64>,
}

/// Profile edit; absent fields stay unchanged
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    /// Replaces the whole affiliation set when present
    pub subject_ids: Option<Vec<i64>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub subject: Option<i64>,
}

/// Loose email shape check; real verification belongs to the identity provider
pub fn is_plausible_email(email: &str) -> bool {
    let trimmed = email.trim();
    match trimmed.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !trimmed.contains(' '),
        None => false,
    }
}
