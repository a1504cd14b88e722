use serde::{Deserialize, Serialize};

use super::period::{Period, PeriodTemplate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Idle,
    Running,
    Paused,
    /// Terminal until reset.
    Finished,
}

/// Ordered periods plus the run-control timestamps.
///
/// Elapsed time of the current period is never stored as a counter: it is
/// always `elapsed_ms(now, started_at, paused_at)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub periods: Vec<Period>,
    pub current_period_index: Option<usize>,
    /// Epoch ms such that `now - started_at` is the current period's elapsed time.
    pub started_at: Option<i64>,
    /// While set, elapsed is frozen at `paused_at - started_at`.
    pub paused_at: Option<i64>,
    #[serde(default)]
    pub completed: bool,
    /// Raised on the first overrun of the current period.
    #[serde(default)]
    pub should_advance: bool,
}

/// Keys a stored session must carry to be trusted.
const SESSION_KEYS: [&str; 4] = ["periods", "current_period_index", "started_at", "paused_at"];

const PERIOD_KEYS: [&str; 6] = [
    "duration_ms",
    "user_intended_duration_ms",
    "elapsed_ms",
    "remaining_ms",
    "finished",
    "period_type",
];

impl Session {
    pub fn from_template(template: &[PeriodTemplate]) -> Self {
        Self {
            periods: template.iter().map(PeriodTemplate::to_period).collect(),
            current_period_index: None,
            started_at: None,
            paused_at: None,
            completed: false,
            should_advance: false,
        }
    }

    pub fn state(&self) -> TimerState {
        if self.completed {
            return TimerState::Finished;
        }
        match (self.current_period_index, self.started_at, self.paused_at) {
            (None, _, _) | (Some(_), None, _) => TimerState::Idle,
            (Some(_), Some(_), Some(_)) => TimerState::Paused,
            (Some(_), Some(_), None) => TimerState::Running,
        }
    }

    pub fn current(&self) -> Option<&Period> {
        self.current_period_index.and_then(|i| self.periods.get(i))
    }

    /// Key-presence check on a stored snapshot. Unknown shapes are rejected
    /// whole rather than partially merged.
    pub fn has_expected_shape(value: &serde_json::Value) -> bool {
        let Some(obj) = value.as_object() else {
            return false;
        };
        if !SESSION_KEYS.iter().all(|k| obj.contains_key(*k)) {
            return false;
        }
        match obj.get("periods").and_then(|p| p.as_array()) {
            Some(periods) => periods.iter().all(|p| {
                p.as_object()
                    .is_some_and(|p| PERIOD_KEYS.iter().all(|k| p.contains_key(*k)))
            }),
            None => false,
        }
    }

    /// Parse a stored snapshot, returning `None` for anything that does not
    /// look like a session.
    pub fn from_stored_json(json: &str) -> Option<Self> {
        let value: serde_json::Value = serde_json::from_str(json).ok()?;
        if !Self::has_expected_shape(&value) {
            return None;
        }
        let session: Session = serde_json::from_value(value).ok()?;
        match session.current_period_index {
            Some(i) if i >= session.periods.len() => None,
            _ => Some(session),
        }
    }
}

/// Elapsed time derived from timestamps; never negative.
pub fn elapsed_ms(now_ms: i64, started_at: i64, paused_at: Option<i64>) -> u64 {
    paused_at
        .unwrap_or(now_ms)
        .saturating_sub(started_at)
        .max(0) as u64
}
