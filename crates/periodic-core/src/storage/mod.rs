mod config;
pub mod database;

pub use config::{Config, NotificationsConfig, PlayerConfig, TimerConfig};
pub use database::{Database, HistoryRecord, Stats};

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::error::{ConfigError, Result};
use crate::timer::{Period, Session};

/// Where sessions are saved between runs.
pub trait SessionStore {
    fn save(&mut self, session: &Session) -> Result<()>;

    /// The stored session, or `None` when nothing usable is stored. A stored
    /// value with the wrong shape counts as nothing.
    fn load(&mut self) -> Result<Option<Session>>;

    /// Keep the periods of a completed session. Stores without history
    /// ignore this.
    fn record_completed(&mut self, _periods: &[Period], _at: DateTime<Utc>) -> Result<()> {
        Ok(())
    }
}

/// In-memory store. Clones share contents, so a test can inspect what a
/// runtime saved or plant a corrupt snapshot before it loads.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    raw: Arc<Mutex<Option<String>>>,
    completed: Arc<Mutex<Vec<Period>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_raw(&self, json: impl Into<String>) {
        if let Ok(mut raw) = self.raw.lock() {
            *raw = Some(json.into());
        }
    }

    pub fn raw(&self) -> Option<String> {
        self.raw.lock().ok().and_then(|raw| raw.clone())
    }

    pub fn completed(&self) -> Vec<Period> {
        self.completed
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }
}

impl SessionStore for MemoryStore {
    fn save(&mut self, session: &Session) -> Result<()> {
        self.set_raw(serde_json::to_string(session)?);
        Ok(())
    }

    fn load(&mut self) -> Result<Option<Session>> {
        let Some(json) = self.raw() else {
            return Ok(None);
        };
        let session = Session::from_stored_json(&json);
        if session.is_none() {
            warn!("stored session has an unexpected shape; using the template instead");
        }
        Ok(session)
    }

    fn record_completed(&mut self, periods: &[Period], _at: DateTime<Utc>) -> Result<()> {
        if let Ok(mut completed) = self.completed.lock() {
            completed.extend_from_slice(periods);
        }
        Ok(())
    }
}

/// Returns the data directory.
///
/// `PERIODIC_HOME` wins when set. Otherwise `~/.config/periodic/`, or
/// `~/.config/periodic-dev/` with `PERIODIC_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("PERIODIC_HOME") {
        Some(home) => PathBuf::from(home),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("PERIODIC_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("periodic-dev")
            } else {
                base_dir.join("periodic")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|source| ConfigError::DataDir {
        path: dir.clone(),
        source,
    })?;
    Ok(dir)
}
