//! Study materials

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StudyMaterial {
    pub id: i64,
    pub author: i64,
    pub author_username: String,
    pub subject: i64,
    pub subject_name: String,
    pub title: String,
    pub description: String,
    pub file: Option<String>,
    pub link: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateMaterialRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub subject: Option<i64>,
    #[serde(default)]
    pub link: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateMaterialRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub subject: Option<i64>,
    pub link: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MaterialFilter {
    pub subject: Option<i64>,
    pub author: Option<i64>,
    pub ordering: Option<String>,
}

/// Accepted `ordering` values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MaterialOrdering {
    CreatedAsc,
    #[default]
    CreatedDesc,
    TitleAsc,
    TitleDesc,
}

impl MaterialOrdering {
    /// Parse an `ordering` query value; `None` for unknown keys
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "created_at" => Some(Self::CreatedAsc),
            "-created_at" => Some(Self::CreatedDesc),
            "title" => Some(Self::TitleAsc),
            "-title" => Some(Self::TitleDesc),
            _ => None,
        }
    }

    pub fn order_by(&self) -> &'static str {
        match self {
            Self::CreatedAsc => "m.created_at ASC, m.id ASC",
            Self::CreatedDesc => "m.created_at DESC, m.id DESC",
            Self::TitleAsc => "m.title ASC, m.id ASC",
            Self::TitleDesc => "m.title DESC, m.id DESC",
        }
    }
}
