use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity attached to an active session after a successful OAuth callback.
/// Lives in the process-side session store; lost on restart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub google_sub: String,
    pub name: String,
    pub email: String,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One entry of the fixed counselor directory, initialized once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Counselor {
    pub id: i64,
    pub name: String,
    pub specialization: String,
}
