//! Fixed-size diagnostic log of scheduler decisions.
//!
//! Not needed for correctness; the `run` prompt prints it on `log` and tests
//! inspect it.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::notify::ResetReason;

pub const DEFAULT_CAPACITY: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogKind {
    /// The scheduler picked a winner and handed it to the player.
    Emitted { key: String },
    SchedulerReset { reason: ResetReason },
    PlaybackFailed { key: String, error: String },
    /// A timer event, by name.
    Timer { event: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub at: DateTime<Utc>,
    pub period_index: Option<usize>,
    pub elapsed_ms: u64,
    #[serde(flatten)]
    pub kind: LogKind,
}

#[derive(Debug, Clone)]
pub struct EventLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an entry, evicting the oldest one when full.
    pub fn record(&mut self, entry: LogEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn entries(&self) -> impl DoubleEndedIterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// Keys of emitted notifications, oldest first.
    pub fn emitted_keys(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter_map(|e| match &e.kind {
                LogKind::Emitted { key } => Some(key.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
