//! SQLite-based session storage.
//!
//! Timestamps are stored as fixed-width RFC 3339 text (microsecond
//! precision, `Z` suffix) so that string order matches time order.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, warn};

use super::{data_dir, migrations, SessionStore};
use crate::error::{CoreError, DatabaseError, Result};
use crate::session::{Interruption, Session, SessionStatus};

pub const DEFAULT_DATABASE_FILE: &str = "deepwork.db";

const SESSION_COLUMNS: &str =
    "id, title, goal, scheduled_duration, start_time, end_time, status, created_at";

/// SQLite database for sessions and interruptions.
pub struct Database {
    conn: Connection,
    in_transaction: bool,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `<data_dir>/deepwork.db`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        Self::open_at(data_dir()?.join(DEFAULT_DATABASE_FILE))
    }

    /// Open (or create) the database file at `path`.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        conn.busy_timeout(Duration::from_secs(5))?;
        debug!(path = %path.display(), "opened session database");
        Self::init(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migrations::migrate(&conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self {
            conn,
            in_transaction: false,
        })
    }

    fn interruptions_for(&self, session_id: i64) -> Result<Vec<Interruption>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, session_id, reason, pause_time
             FROM interruptions
             WHERE session_id = ?1
             ORDER BY id",
        )?;
        let rows = stmt.query_map(params![session_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut interruptions = Vec::new();
        for row in rows {
            let (id, session_id, reason, pause_time) = row?;
            interruptions.push(Interruption {
                id,
                session_id,
                reason,
                pause_time: parse_timestamp("interruptions", &pause_time)?,
            });
        }
        Ok(interruptions)
    }

    fn query_sessions(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Session>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, SessionRow::from_row)?;
        let mut sessions = Vec::new();
        for row in rows {
            let row = row?;
            let interruptions = self.interruptions_for(row.id)?;
            sessions.push(row.into_session(interruptions)?);
        }
        Ok(sessions)
    }

    /// Undo whatever the open transaction wrote. SQLite keeps a transaction
    /// open after a failed COMMIT, so this runs on that path too.
    fn rollback(&self) {
        if self.conn.is_autocommit() {
            return;
        }
        if let Err(e) = self.conn.execute_batch("ROLLBACK") {
            warn!("rollback failed: {e}");
        }
    }

    fn insert_interruption_row(&self, interruption: &Interruption) -> Result<Interruption> {
        self.conn.execute(
            "INSERT INTO interruptions (session_id, reason, pause_time) VALUES (?1, ?2, ?3)",
            params![
                interruption.session_id,
                interruption.reason,
                format_timestamp(interruption.pause_time),
            ],
        )?;
        Ok(Interruption {
            id: self.conn.last_insert_rowid(),
            ..interruption.clone()
        })
    }
}

impl SessionStore for Database {
    fn insert(&mut self, session: &Session) -> Result<Session> {
        self.transaction(|db| {
            db.conn.execute(
                "INSERT INTO sessions (title, goal, scheduled_duration, start_time, end_time, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    session.title,
                    session.goal,
                    session.scheduled_duration,
                    session.start_time.map(format_timestamp),
                    session.end_time.map(format_timestamp),
                    session.status.as_str(),
                    format_timestamp(session.created_at),
                ],
            )?;
            let id = db.conn.last_insert_rowid();

            for interruption in &session.interruptions {
                db.insert_interruption_row(&Interruption {
                    session_id: id,
                    ..interruption.clone()
                })?;
            }

            debug!(session_id = id, "inserted session");
            db.fetch_by_id(id)?
                .ok_or_else(|| CoreError::session_not_found(id))
        })
    }

    fn fetch_by_id(&self, id: i64) -> Result<Option<Session>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"),
                params![id],
                SessionRow::from_row,
            )
            .optional()?;
        match row {
            Some(row) => {
                let interruptions = self.interruptions_for(row.id)?;
                Ok(Some(row.into_session(interruptions)?))
            }
            None => Ok(None),
        }
    }

    fn list_all(&self, offset: usize, limit: usize) -> Result<Vec<Session>> {
        self.query_sessions(
            &format!("SELECT {SESSION_COLUMNS} FROM sessions ORDER BY id LIMIT ?1 OFFSET ?2"),
            params![clamp_i64(limit), clamp_i64(offset)],
        )
    }

    fn list_recent(&self) -> Result<Vec<Session>> {
        self.query_sessions(
            &format!("SELECT {SESSION_COLUMNS} FROM sessions ORDER BY created_at DESC, id DESC"),
            [],
        )
    }

    fn update(&mut self, session: &Session) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE sessions
             SET title = ?1, goal = ?2, scheduled_duration = ?3,
                 start_time = ?4, end_time = ?5, status = ?6
             WHERE id = ?7",
            params![
                session.title,
                session.goal,
                session.scheduled_duration,
                session.start_time.map(format_timestamp),
                session.end_time.map(format_timestamp),
                session.status.as_str(),
                session.id,
            ],
        )?;
        if changed == 0 {
            return Err(CoreError::session_not_found(session.id));
        }
        Ok(())
    }

    fn insert_interruption(&mut self, interruption: &Interruption) -> Result<Interruption> {
        self.insert_interruption_row(interruption)
    }

    fn delete(&mut self, id: i64) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    fn transaction<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        // Nested call from inside our own transaction: join it.
        if self.in_transaction {
            return f(self);
        }
        // IMMEDIATE takes the write lock up front, so a read-check-write
        // sequence cannot race another connection.
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        self.in_transaction = true;
        let result = f(self).and_then(|value| {
            self.conn.execute_batch("COMMIT")?;
            Ok(value)
        });
        self.in_transaction = false;
        if result.is_err() {
            self.rollback();
        }
        result
    }
}

struct SessionRow {
    id: i64,
    title: String,
    goal: String,
    scheduled_duration: f64,
    start_time: Option<String>,
    end_time: Option<String>,
    status: String,
    created_at: String,
}

impl SessionRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            goal: row.get(2)?,
            scheduled_duration: row.get(3)?,
            start_time: row.get(4)?,
            end_time: row.get(5)?,
            status: row.get(6)?,
            created_at: row.get(7)?,
        })
    }

    fn into_session(self, interruptions: Vec<Interruption>) -> Result<Session> {
        let status: SessionStatus = self.status.parse().map_err(|_| DatabaseError::Corrupt {
            table: "sessions",
            message: format!("unknown status '{}' for session {}", self.status, self.id),
        })?;
        Ok(Session {
            id: self.id,
            title: self.title,
            goal: self.goal,
            scheduled_duration: self.scheduled_duration,
            start_time: self
                .start_time
                .as_deref()
                .map(|s| parse_timestamp("sessions", s))
                .transpose()?,
            end_time: self
                .end_time
                .as_deref()
                .map(|s| parse_timestamp("sessions", s))
                .transpose()?,
            status,
            created_at: parse_timestamp("sessions", &self.created_at)?,
            interruptions,
        })
    }
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(table: &'static str, value: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::Corrupt {
            table,
            message: format!("bad timestamp '{value}': {e}"),
        })
}

fn clamp_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn new_session(title: &str, created_at: DateTime<Utc>) -> Session {
        Session {
            id: 0,
            title: title.into(),
            goal: "ship it".into(),
            scheduled_duration: 25.0,
            start_time: None,
            end_time: None,
            status: SessionStatus::Planned,
            created_at,
            interruptions: Vec::new(),
        }
    }

    /// Microsecond precision survives the round trip.
    fn now() -> DateTime<Utc> {
        let now = Utc::now();
        parse_timestamp("test", &format_timestamp(now)).unwrap()
    }

    #[test]
    fn insert_assigns_ids_and_fetches_back() {
        let mut db = Database::open_memory().unwrap();
        let created = now();
        let stored = db.insert(&new_session("a", created)).unwrap();
        assert!(stored.id > 0);
        let fetched = db.fetch_by_id(stored.id).unwrap().unwrap();
        assert_eq!(fetched, stored);
        assert_eq!(fetched.created_at, created);
    }

    #[test]
    fn fetch_missing_is_none() {
        let db = Database::open_memory().unwrap();
        assert!(db.fetch_by_id(99).unwrap().is_none());
    }

    #[test]
    fn update_persists_transition_fields() {
        let mut db = Database::open_memory().unwrap();
        let mut s = db.insert(&new_session("a", now())).unwrap();
        s.start_time = Some(now());
        s.end_time = Some(now() + ChronoDuration::minutes(5));
        s.status = SessionStatus::Completed;
        db.update(&s).unwrap();
        assert_eq!(db.fetch_by_id(s.id).unwrap().unwrap(), s);
    }

    #[test]
    fn update_missing_is_not_found() {
        let mut db = Database::open_memory().unwrap();
        let mut s = new_session("ghost", now());
        s.id = 12;
        assert!(matches!(db.update(&s), Err(CoreError::NotFound { id: 12, .. })));
    }

    #[test]
    fn interruptions_come_back_in_insertion_order() {
        let mut db = Database::open_memory().unwrap();
        let s = db.insert(&new_session("a", now())).unwrap();
        let t = now();
        for (i, reason) in ["email", "slack", "door"].iter().enumerate() {
            db.insert_interruption(&Interruption {
                id: 0,
                session_id: s.id,
                reason: reason.to_string(),
                pause_time: t + ChronoDuration::seconds(i as i64),
            })
            .unwrap();
        }
        let fetched = db.fetch_by_id(s.id).unwrap().unwrap();
        let reasons: Vec<&str> = fetched.interruptions.iter().map(|i| i.reason.as_str()).collect();
        assert_eq!(reasons, vec!["email", "slack", "door"]);
        assert!(fetched.interruptions.iter().all(|i| i.id > 0));
    }

    #[test]
    fn delete_cascades_to_interruptions() {
        let mut db = Database::open_memory().unwrap();
        let s = db.insert(&new_session("a", now())).unwrap();
        db.insert_interruption(&Interruption {
            id: 0,
            session_id: s.id,
            reason: "call".into(),
            pause_time: now(),
        })
        .unwrap();
        assert!(db.delete(s.id).unwrap());
        assert!(!db.delete(s.id).unwrap());
        let orphans: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM interruptions", [], |row| row.get(0))
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[test]
    fn list_all_pages_by_id() {
        let mut db = Database::open_memory().unwrap();
        for i in 0..5 {
            db.insert(&new_session(&format!("s{i}"), now())).unwrap();
        }
        let page = db.list_all(1, 2).unwrap();
        let titles: Vec<&str> = page.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["s1", "s2"]);
        assert_eq!(db.list_all(0, 100).unwrap().len(), 5);
        assert!(db.list_all(10, 100).unwrap().is_empty());
    }

    #[test]
    fn list_recent_is_newest_first() {
        let mut db = Database::open_memory().unwrap();
        let base = now();
        db.insert(&new_session("old", base)).unwrap();
        db.insert(&new_session("new", base + ChronoDuration::hours(1))).unwrap();
        db.insert(&new_session("mid", base + ChronoDuration::minutes(30))).unwrap();
        let titles: Vec<String> = db.list_recent().unwrap().into_iter().map(|s| s.title).collect();
        assert_eq!(titles, vec!["new", "mid", "old"]);
    }

    #[test]
    fn failed_transaction_rolls_back() {
        let mut db = Database::open_memory().unwrap();
        let s = db.insert(&new_session("a", now())).unwrap();
        let result: Result<()> = db.transaction(|db| {
            let mut changed = s.clone();
            changed.status = SessionStatus::Active;
            db.update(&changed)?;
            Err(CoreError::session_not_found(0))
        });
        assert!(result.is_err());
        assert_eq!(
            db.fetch_by_id(s.id).unwrap().unwrap().status,
            SessionStatus::Planned
        );
    }

    #[test]
    fn busy_commit_rolls_back_and_frees_the_connection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.db");
        let mut db = Database::open_at(&path).unwrap();
        db.conn().busy_timeout(Duration::from_millis(50)).unwrap();
        let s = db.insert(&new_session("a", now())).unwrap();

        // A read transaction on another connection blocks our COMMIT.
        let reader = Connection::open(&path).unwrap();
        reader.execute_batch("BEGIN").unwrap();
        let count: i64 = reader
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);

        let mut started = s.clone();
        started.status = SessionStatus::Active;
        let result = db.transaction(|db| db.update(&started));
        assert!(matches!(result, Err(CoreError::Database(DatabaseError::Locked))));
        assert!(db.conn().is_autocommit());
        assert_eq!(db.fetch_by_id(s.id).unwrap().unwrap().status, SessionStatus::Planned);

        reader.execute_batch("COMMIT").unwrap();
        db.transaction(|db| db.update(&started)).unwrap();

        let other = Database::open_at(&path).unwrap();
        assert_eq!(other.fetch_by_id(s.id).unwrap().unwrap().status, SessionStatus::Active);
    }

    #[test]
    fn nested_transaction_joins_the_outer_one() {
        let mut db = Database::open_memory().unwrap();
        let result: Result<Session> = db.transaction(|db| {
            let inserted = db.insert(&new_session("inner", now()))?;
            assert!(!db.conn().is_autocommit());
            Err(CoreError::session_not_found(inserted.id))
        });
        assert!(result.is_err());
        assert!(db.list_all(0, 10).unwrap().is_empty());
    }

    #[test]
    fn file_database_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.db");
        let id = {
            let mut db = Database::open_at(&path).unwrap();
            db.insert(&new_session("kept", now())).unwrap().id
        };
        let db = Database::open_at(&path).unwrap();
        assert_eq!(db.fetch_by_id(id).unwrap().unwrap().title, "kept");
    }
}
