use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            google_sub  TEXT NOT NULL UNIQUE,
            name        TEXT NOT NULL,
            email       TEXT NOT NULL UNIQUE,
            avatar_url  TEXT,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS threads (
            id           TEXT PRIMARY KEY,
            title        TEXT NOT NULL,
            category     TEXT NOT NULL,
            author_name  TEXT NOT NULL,
            body         TEXT NOT NULL,
            created_at   TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS replies (
            id           TEXT PRIMARY KEY,
            thread_id    TEXT NOT NULL REFERENCES threads(id) ON DELETE CASCADE,
            author_name  TEXT NOT NULL,
            body         TEXT NOT NULL,
            created_at   TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_replies_thread
            ON replies(thread_id, created_at);

        -- No uniqueness on (counselor_id, date, time): double-booking is
        -- representable and the availability query is advisory only.
        CREATE TABLE IF NOT EXISTS bookings (
            id               TEXT PRIMARY KEY,
            counselor_id     INTEGER NOT NULL,
            date             TEXT NOT NULL,
            time             TEXT NOT NULL,
            requester_name   TEXT NOT NULL,
            requester_email  TEXT NOT NULL,
            created_at       TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_bookings_slot
            ON bookings(counselor_id, date);

        CREATE TABLE IF NOT EXISTS screening_results (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id),
            test_type   TEXT NOT NULL,
            score       INTEGER NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_screenings_user
            ON screening_results(user_id, created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
