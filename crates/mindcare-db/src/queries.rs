use crate::Database;
use crate::models::{BookingRow, ReplyRow, ScreeningRow, ThreadRow, UserRow};
use anyhow::Result;
use rusqlite::Connection;

impl Database {
    // -- Users --

    /// Find-or-create a user by identity-provider subject id. The first
    /// callback for a given sub inserts exactly one row; later callbacks
    /// reuse the row (keeping its id) and refresh the profile fields.
    pub fn upsert_user_by_sub(
        &self,
        id: &str,
        google_sub: &str,
        name: &str,
        email: &str,
        avatar_url: Option<&str>,
    ) -> Result<UserRow> {
        self.with_conn(|conn| {
            if let Some(existing) = query_user_by_sub(conn, google_sub)? {
                conn.execute(
                    "UPDATE users SET name = ?1, email = ?2, avatar_url = ?3 WHERE id = ?4",
                    rusqlite::params![name, email, avatar_url, existing.id],
                )?;
                return query_user_by_id(conn, &existing.id)?
                    .ok_or_else(|| anyhow::anyhow!("User vanished during upsert: {}", existing.id));
            }

            conn.execute(
                "INSERT INTO users (id, google_sub, name, email, avatar_url) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, google_sub, name, email, avatar_url],
            )?;
            query_user_by_id(conn, id)?
                .ok_or_else(|| anyhow::anyhow!("User vanished after insert: {}", id))
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    // -- Threads & replies --

    pub fn insert_thread(
        &self,
        id: &str,
        title: &str,
        category: &str,
        author_name: &str,
        body: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO threads (id, title, category, author_name, body) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, title, category, author_name, body],
            )?;
            Ok(())
        })
    }

    /// All threads, newest first, with derived reply counts. No pagination.
    pub fn list_threads(&self) -> Result<Vec<ThreadRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT t.id, t.title, t.category, t.author_name, t.body, t.created_at,
                        COUNT(r.id) AS reply_count
                 FROM threads t
                 LEFT JOIN replies r ON r.thread_id = t.id
                 GROUP BY t.id
                 ORDER BY t.created_at DESC, t.rowid DESC",
            )?;

            let rows = stmt
                .query_map([], map_thread_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    pub fn get_thread(&self, id: &str) -> Result<Option<ThreadRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT t.id, t.title, t.category, t.author_name, t.body, t.created_at,
                        COUNT(r.id) AS reply_count
                 FROM threads t
                 LEFT JOIN replies r ON r.thread_id = t.id
                 WHERE t.id = ?1
                 GROUP BY t.id",
            )?;

            stmt.query_row([id], map_thread_row).optional()
        })
    }

    pub fn insert_reply(
        &self,
        id: &str,
        thread_id: &str,
        author_name: &str,
        body: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO replies (id, thread_id, author_name, body) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, thread_id, author_name, body],
            )?;
            Ok(())
        })
    }

    /// Replies for one thread, oldest first.
    pub fn list_replies(&self, thread_id: &str) -> Result<Vec<ReplyRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, thread_id, author_name, body, created_at
                 FROM replies
                 WHERE thread_id = ?1
                 ORDER BY created_at ASC, rowid ASC",
            )?;

            let rows = stmt
                .query_map([thread_id], |row| {
                    Ok(ReplyRow {
                        id: row.get(0)?,
                        thread_id: row.get(1)?,
                        author_name: row.get(2)?,
                        body: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    // -- Bookings --

    /// Persists unconditionally: nothing checks for an existing booking in
    /// the same slot, so double-booking is possible. The availability query
    /// is advisory only.
    pub fn insert_booking(
        &self,
        id: &str,
        counselor_id: i64,
        date: &str,
        time: &str,
        requester_name: &str,
        requester_email: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO bookings (id, counselor_id, date, time, requester_name, requester_email)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![id, counselor_id, date, time, requester_name, requester_email],
            )?;
            Ok(())
        })
    }

    /// Already-booked time strings for (counselor, date), sorted, duplicates
    /// preserved. The free-slot complement is left to the caller.
    pub fn booked_times(&self, counselor_id: i64, date: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT time FROM bookings
                 WHERE counselor_id = ?1 AND date = ?2
                 ORDER BY time ASC",
            )?;

            let rows = stmt
                .query_map(rusqlite::params![counselor_id, date], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    pub fn list_bookings(&self) -> Result<Vec<BookingRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, counselor_id, date, time, requester_name, requester_email, created_at
                 FROM bookings
                 ORDER BY date ASC, time ASC",
            )?;

            let rows = stmt
                .query_map([], |row| {
                    Ok(BookingRow {
                        id: row.get(0)?,
                        counselor_id: row.get(1)?,
                        date: row.get(2)?,
                        time: row.get(3)?,
                        requester_name: row.get(4)?,
                        requester_email: row.get(5)?,
                        created_at: row.get(6)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    // -- Screening results --

    pub fn insert_screening(
        &self,
        id: &str,
        user_id: &str,
        test_type: &str,
        score: i64,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO screening_results (id, user_id, test_type, score) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, user_id, test_type, score],
            )?;
            Ok(())
        })
    }

    /// One user's screening history, oldest first.
    pub fn screenings_for_user(&self, user_id: &str) -> Result<Vec<ScreeningRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT test_type, score, created_at
                 FROM screening_results
                 WHERE user_id = ?1
                 ORDER BY created_at ASC, rowid ASC",
            )?;

            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(ScreeningRow {
                        test_type: row.get(0)?,
                        score: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Every user with at least one screening record, for the roster view.
    pub fn students_with_screenings(&self) -> Result<Vec<(String, String)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT u.id, u.name
                 FROM users u
                 JOIN screening_results s ON s.user_id = u.id
                 ORDER BY u.name ASC",
            )?;

            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

fn map_thread_row(row: &rusqlite::Row<'_>) -> std::result::Result<ThreadRow, rusqlite::Error> {
    Ok(ThreadRow {
        id: row.get(0)?,
        title: row.get(1)?,
        category: row.get(2)?,
        author_name: row.get(3)?,
        body: row.get(4)?,
        created_at: row.get(5)?,
        reply_count: row.get(6)?,
    })
}

fn query_user_by_sub(conn: &Connection, google_sub: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, google_sub, name, email, avatar_url, created_at FROM users WHERE google_sub = ?1",
    )?;

    stmt.query_row([google_sub], map_user_row).optional()
}

fn query_user_by_id(conn: &Connection, id: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, google_sub, name, email, avatar_url, created_at FROM users WHERE id = ?1",
    )?;

    stmt.query_row([id], map_user_row).optional()
}

fn map_user_row(row: &rusqlite::Row<'_>) -> std::result::Result<UserRow, rusqlite::Error> {
    Ok(UserRow {
        id: row.get(0)?,
        google_sub: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        avatar_url: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::Database;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn upsert_user_is_idempotent_per_sub() {
        let db = db();

        let first = db
            .upsert_user_by_sub("u1", "sub-123", "Asha", "asha@example.com", None)
            .unwrap();
        assert_eq!(first.id, "u1");

        // Second callback with the same sub must not create a second row,
        // even with a fresh candidate id, and must refresh profile fields.
        let second = db
            .upsert_user_by_sub(
                "u2",
                "sub-123",
                "Asha K.",
                "asha@example.com",
                Some("https://example.com/a.png"),
            )
            .unwrap();
        assert_eq!(second.id, "u1");
        assert_eq!(second.name, "Asha K.");
        assert_eq!(second.avatar_url.as_deref(), Some("https://example.com/a.png"));

        let count: i64 = db
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?)
            })
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn new_thread_has_zero_replies() {
        let db = db();
        db.insert_thread("t1", "Exam stress", "Academic", "Asha", "anyone else?")
            .unwrap();

        let thread = db.get_thread("t1").unwrap().unwrap();
        assert_eq!(thread.reply_count, 0);

        let listed = db.list_threads().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].reply_count, 0);
    }

    #[test]
    fn threads_list_newest_first() {
        let db = db();
        db.insert_thread("t1", "First", "General", "A", "...").unwrap();
        db.insert_thread("t2", "Second", "General", "B", "...").unwrap();
        db.insert_thread("t3", "Third", "General", "C", "...").unwrap();

        let ids: Vec<String> = db.list_threads().unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["t3", "t2", "t1"]);
    }

    #[test]
    fn replies_ordered_oldest_first_and_counted() {
        let db = db();
        db.insert_thread("t1", "Sleep", "Wellness", "A", "...").unwrap();
        db.insert_reply("r1", "t1", "B", "me too").unwrap();
        db.insert_reply("r2", "t1", "C", "try a routine").unwrap();

        let replies = db.list_replies("t1").unwrap();
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0].id, "r1");
        assert_eq!(replies[1].id, "r2");

        assert_eq!(db.get_thread("t1").unwrap().unwrap().reply_count, 2);
    }

    #[test]
    fn missing_thread_is_none() {
        let db = db();
        assert!(db.get_thread("nope").unwrap().is_none());
    }

    #[test]
    fn deleting_thread_cascades_to_replies() {
        let db = db();
        db.insert_thread("t1", "Sleep", "Wellness", "A", "...").unwrap();
        db.insert_reply("r1", "t1", "B", "me too").unwrap();

        // No delete endpoint exists; the cascade is schema-level only.
        db.with_conn(|conn| {
            conn.execute("DELETE FROM threads WHERE id = 't1'", [])?;
            Ok(())
        })
        .unwrap();

        assert!(db.list_replies("t1").unwrap().is_empty());
    }

    #[test]
    fn double_booking_same_slot_succeeds() {
        let db = db();
        db.insert_booking("b1", 1, "2024-05-01", "10:00", "Asha", "asha@example.com")
            .unwrap();

        // Deliberately no conflict error: the second insert for the same
        // (counselor, date, time) must also succeed.
        db.insert_booking("b2", 1, "2024-05-01", "10:00", "Ravi", "ravi@example.com")
            .unwrap();

        let times = db.booked_times(1, "2024-05-01").unwrap();
        assert_eq!(times, vec!["10:00", "10:00"]);
    }

    #[test]
    fn booked_times_sorted_and_scoped() {
        let db = db();
        db.insert_booking("b1", 1, "2024-05-01", "14:00", "A", "a@x.com").unwrap();
        db.insert_booking("b2", 1, "2024-05-01", "09:00", "B", "b@x.com").unwrap();
        db.insert_booking("b3", 2, "2024-05-01", "10:00", "C", "c@x.com").unwrap();
        db.insert_booking("b4", 1, "2024-05-02", "08:00", "D", "d@x.com").unwrap();

        let times = db.booked_times(1, "2024-05-01").unwrap();
        assert_eq!(times, vec!["09:00", "14:00"]);
    }

    #[test]
    fn bookings_listed_by_date_then_time() {
        let db = db();
        db.insert_booking("b1", 1, "2024-05-02", "09:00", "A", "a@x.com").unwrap();
        db.insert_booking("b2", 2, "2024-05-01", "15:00", "B", "b@x.com").unwrap();
        db.insert_booking("b3", 1, "2024-05-01", "10:00", "C", "c@x.com").unwrap();

        let ids: Vec<String> = db.list_bookings().unwrap().into_iter().map(|b| b.id).collect();
        assert_eq!(ids, vec!["b3", "b2", "b1"]);
    }

    #[test]
    fn screening_history_and_roster() {
        let db = db();
        db.upsert_user_by_sub("u1", "sub-1", "Asha", "asha@example.com", None)
            .unwrap();
        db.upsert_user_by_sub("u2", "sub-2", "Ravi", "ravi@example.com", None)
            .unwrap();
        db.upsert_user_by_sub("u3", "sub-3", "Meera", "meera@example.com", None)
            .unwrap();

        db.insert_screening("s1", "u1", "phq9", 7).unwrap();
        db.insert_screening("s2", "u1", "gad7", 4).unwrap();
        db.insert_screening("s3", "u2", "phq9", 12).unwrap();

        let history = db.screenings_for_user("u1").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].test_type, "phq9");
        assert_eq!(history[1].test_type, "gad7");

        // Only users with at least one screening appear on the roster.
        let roster = db.students_with_screenings().unwrap();
        let names: Vec<&str> = roster.iter().map(|(_, n)| n.as_str()).collect();
        assert_eq!(names, vec!["Asha", "Ravi"]);
    }

    #[test]
    fn screening_requires_existing_user() {
        let db = db();
        assert!(db.insert_screening("s1", "ghost", "phq9", 3).is_err());
    }
}
