//! Support intake

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SupportQueryRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
}
