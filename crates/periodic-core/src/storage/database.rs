//! SQLite-based session storage and history.
//!
//! Provides persistent storage for:
//! - The live session snapshot (key-value table)
//! - Periods kept at the end of each completed session
//! - Totals per period type

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{data_dir, SessionStore};
use crate::error::{DatabaseError, Result};
use crate::timer::{Period, PeriodType, Session};

const SESSION_KEY: &str = "session";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: i64,
    pub period_type: PeriodType,
    pub note: Option<String>,
    pub duration_ms: u64,
    pub elapsed_ms: u64,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Stats {
    pub total_periods: u64,
    pub work_ms: u64,
    pub break_ms: u64,
    pub fun_ms: u64,
    pub today_periods: u64,
    pub today_work_ms: u64,
}

/// SQLite database holding the session snapshot and period history.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `<data_dir>/periodic.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    pub fn open() -> Result<Self> {
        Self::open_at(&data_dir()?.join("periodic.db"))
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS kv (
                    key   TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS history (
                    id           INTEGER PRIMARY KEY AUTOINCREMENT,
                    period_type  TEXT NOT NULL,
                    note         TEXT,
                    duration_ms  INTEGER NOT NULL,
                    elapsed_ms   INTEGER NOT NULL,
                    completed_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_history_completed_at ON history(completed_at);",
            )
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))
    }

    /// Append one finished period to the history.
    pub fn record_period(
        &self,
        period: &Period,
        completed_at: DateTime<Utc>,
    ) -> Result<i64, DatabaseError> {
        self.conn.execute(
            "INSERT INTO history (period_type, note, duration_ms, elapsed_ms, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                period.period_type.as_str(),
                period.note,
                period.duration_ms as i64,
                period.elapsed_ms as i64,
                completed_at.to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Most recent history entries, newest first.
    pub fn history(&self, limit: usize) -> Result<Vec<HistoryRecord>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, period_type, note, duration_ms, elapsed_ms, completed_at
             FROM history
             ORDER BY completed_at DESC, id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, period_type, note, duration_ms, elapsed_ms, completed_at) = row?;
            let Ok(period_type) = period_type.parse::<PeriodType>() else {
                warn!(id, period_type = %period_type, "skipping history row with unknown type");
                continue;
            };
            let completed_at = DateTime::parse_from_rfc3339(&completed_at)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
            records.push(HistoryRecord {
                id,
                period_type,
                note,
                duration_ms: duration_ms.max(0) as u64,
                elapsed_ms: elapsed_ms.max(0) as u64,
                completed_at,
            });
        }
        Ok(records)
    }

    pub fn stats(&self) -> Result<Stats, DatabaseError> {
        let today = Utc::now().format("%Y-%m-%d").to_string();
        let mut stmt = self.conn.prepare(
            "SELECT period_type, COUNT(*), COALESCE(SUM(elapsed_ms), 0),
                    SUM(CASE WHEN completed_at >= ?1 THEN 1 ELSE 0 END),
                    COALESCE(SUM(CASE WHEN completed_at >= ?1 THEN elapsed_ms ELSE 0 END), 0)
             FROM history
             GROUP BY period_type",
        )?;

        let mut stats = Stats::default();
        let rows = stmt.query_map(params![format!("{today}T00:00:00+00:00")], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(4)?,
            ))
        })?;

        for row in rows {
            let (period_type, count, elapsed, today_count, today_elapsed) = row?;
            let [count, elapsed, today_count, today_elapsed] =
                [count, elapsed, today_count, today_elapsed].map(|n| n.max(0) as u64);
            stats.total_periods += count;
            stats.today_periods += today_count;
            match period_type.parse::<PeriodType>() {
                Ok(PeriodType::Work) => {
                    stats.work_ms += elapsed;
                    stats.today_work_ms += today_elapsed;
                }
                Ok(PeriodType::Break) => stats.break_ms += elapsed,
                Ok(PeriodType::Fun) => stats.fun_ms += elapsed,
                Err(_) => {}
            }
        }
        Ok(stats)
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

impl SessionStore for Database {
    fn save(&mut self, session: &Session) -> Result<()> {
        let json = serde_json::to_string(session)?;
        self.kv_set(SESSION_KEY, &json)?;
        Ok(())
    }

    fn load(&mut self) -> Result<Option<Session>> {
        let Some(json) = self.kv_get(SESSION_KEY)? else {
            return Ok(None);
        };
        let session = Session::from_stored_json(&json);
        if session.is_none() {
            warn!("stored session has an unexpected shape; using the template instead");
        }
        Ok(session)
    }

    fn record_completed(&mut self, periods: &[Period], at: DateTime<Utc>) -> Result<()> {
        for period in periods {
            self.record_period(period, at)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::PeriodTemplate;

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "hello");
    }

    #[test]
    fn session_roundtrip() {
        let mut db = Database::open_memory().unwrap();
        assert!(db.load().unwrap().is_none());
        let session = Session::from_template(&PeriodTemplate::default_list());
        db.save(&session).unwrap();
        assert_eq!(db.load().unwrap(), Some(session));
    }

    #[test]
    fn corrupt_session_loads_as_none() {
        let mut db = Database::open_memory().unwrap();
        db.kv_set(SESSION_KEY, r#"{"steps": []}"#).unwrap();
        assert!(db.load().unwrap().is_none());
    }

    #[test]
    fn history_and_stats() {
        let mut db = Database::open_memory().unwrap();
        let mut work = Period::new(PeriodType::Work, 48 * 60_000);
        work.set_elapsed(50 * 60_000);
        work.note = Some("writing".into());
        let mut rest = Period::new(PeriodType::Break, 12 * 60_000);
        rest.set_elapsed(10 * 60_000);

        db.record_completed(&[work, rest], Utc::now()).unwrap();

        let history = db.history(10).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].period_type, PeriodType::Break);
        assert_eq!(history[1].note.as_deref(), Some("writing"));

        let stats = db.stats().unwrap();
        assert_eq!(stats.total_periods, 2);
        assert_eq!(stats.work_ms, 50 * 60_000);
        assert_eq!(stats.break_ms, 10 * 60_000);
        assert_eq!(stats.today_periods, 2);
        assert_eq!(stats.today_work_ms, 50 * 60_000);
    }

    #[test]
    fn open_at_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("periodic.db");
        {
            let mut db = Database::open_at(&path).unwrap();
            db.save(&Session::from_template(&PeriodTemplate::default_list()))
                .unwrap();
        }
        let mut db = Database::open_at(&path).unwrap();
        assert!(db.load().unwrap().is_some());
    }
}
