use chrono::{DateTime, Utc};
use serde::Serialize;

/// A processing failure recorded against a site.
#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    pub id: i32,
    pub site_id: i32,
    /// Linked PDF row when one existed for the URI pair at failure time.
    pub pdf_id: Option<i32>,
    pub pdf_uri: String,
    pub parent_uri: String,
    pub error_message: String,
    pub created_at: DateTime<Utc>,
}
