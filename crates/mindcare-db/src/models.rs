/// Database row types — these map directly to SQLite rows.
/// Distinct from mindcare-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub google_sub: String,
    pub name: String,
    pub email: String,
    pub avatar_url: Option<String>,
    pub created_at: String,
}

pub struct ThreadRow {
    pub id: String,
    pub title: String,
    pub category: String,
    pub author_name: String,
    pub body: String,
    pub created_at: String,
    /// Derived via LEFT JOIN against replies, never stored.
    pub reply_count: i64,
}

pub struct ReplyRow {
    pub id: String,
    pub thread_id: String,
    pub author_name: String,
    pub body: String,
    pub created_at: String,
}

pub struct BookingRow {
    pub id: String,
    pub counselor_id: i64,
    pub date: String,
    pub time: String,
    pub requester_name: String,
    pub requester_email: String,
    pub created_at: String,
}

pub struct ScreeningRow {
    pub test_type: String,
    pub score: i64,
    pub created_at: String,
}
