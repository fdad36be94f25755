use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- Chat --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChatRequest {
    /// Missing and empty are treated the same: both are rejected before any
    /// outbound call is made.
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// -- Session --

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub is_logged_in: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<SessionProfile>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub avatar_url: Option<String>,
}

// -- Forum --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadSummary {
    pub id: Uuid,
    pub title: String,
    pub category: String,
    pub author_name: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    /// Derived from the replies table at query time, never stored.
    pub reply_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyRecord {
    pub id: Uuid,
    pub thread_id: Uuid,
    pub author_name: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ThreadDetailResponse {
    pub thread: ThreadSummary,
    pub replies: Vec<ReplyRecord>,
}

// -- Booking --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BookingRequest {
    pub counselor_id: i64,
    pub date: String,
    pub time: String,
}

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingRecord {
    pub id: Uuid,
    pub counselor_id: i64,
    pub counselor_name: String,
    pub date: String,
    pub time: String,
    pub requester_name: String,
    pub requester_email: String,
    pub created_at: DateTime<Utc>,
}

// -- Screening --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScreeningRequest {
    pub test_type: String,
    pub score: i64,
}

#[derive(Debug, Serialize)]
pub struct ScreeningResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentSummary {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScreeningRecord {
    pub test_type: String,
    pub score: i64,
    pub created_at: DateTime<Utc>,
}
