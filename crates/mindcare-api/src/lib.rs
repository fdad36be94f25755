pub mod assistant;
pub mod auth;
pub mod booking;
pub mod chat;
pub mod counselors;
pub mod forum;
pub mod mailer;
pub mod middleware;
pub mod screening;
pub mod sessions;

use tracing::warn;
use uuid::Uuid;

/// Parse a stored uuid, falling back to the nil uuid on corruption so a
/// single bad row cannot take down a whole listing.
pub(crate) fn parse_row_uuid(raw: &str, context: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt uuid '{}' on {}: {}", raw, context, e);
        Uuid::default()
    })
}

pub(crate) fn parse_created_at(raw: &str, context: &str) -> chrono::DateTime<chrono::Utc> {
    raw.parse::<chrono::DateTime<chrono::Utc>>()
        .or_else(|_| {
            // SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
            // Parse as naive UTC and convert.
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt created_at '{}' on {}: {}", raw, context, e);
            chrono::DateTime::default()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sqlite_naive_timestamps() {
        let parsed = parse_created_at("2024-05-01 10:30:00", "test");
        assert_eq!(parsed.to_rfc3339(), "2024-05-01T10:30:00+00:00");
    }

    #[test]
    fn corrupt_timestamp_falls_back_to_default() {
        assert_eq!(
            parse_created_at("not-a-date", "test"),
            chrono::DateTime::<chrono::Utc>::default()
        );
    }
}
