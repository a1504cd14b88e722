use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::{PeriodType, TimerState};

/// Every state change in the timer produces an Event.
/// The runtime forwards them to the notification scheduler and the event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    TimerStarted {
        period_index: usize,
        period_type: PeriodType,
        duration_ms: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        elapsed_ms: u64,
        at: DateTime<Utc>,
    },
    TimerResumed {
        elapsed_ms: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        at: DateTime<Utc>,
    },
    /// The current period ran past its planned duration and was extended.
    PeriodOverran {
        period_index: usize,
        period_type: PeriodType,
        duration_ms: u64,
        at: DateTime<Utc>,
    },
    PeriodChanged {
        from: usize,
        to: usize,
        /// Sub-minute remainder credited to the incoming period.
        carried_ms: u64,
        at: DateTime<Utc>,
    },
    DurationAdjusted {
        period_index: usize,
        from_ms: u64,
        to_ms: u64,
        at: DateTime<Utc>,
    },
    ElapsedAdjusted {
        period_index: usize,
        from_ms: u64,
        to_ms: u64,
        at: DateTime<Utc>,
    },
    /// Current elapsed time was handed over to the previous period.
    ElapsedTransferred {
        from_index: usize,
        to_index: usize,
        moved_ms: u64,
        at: DateTime<Utc>,
    },
    PeriodTypeChanged {
        period_index: usize,
        period_type: PeriodType,
        at: DateTime<Utc>,
    },
    NoteChanged {
        period_index: usize,
        note: Option<String>,
        at: DateTime<Utc>,
    },
    PeriodAdded {
        index: usize,
        current_index: Option<usize>,
        current_changed: bool,
        at: DateTime<Utc>,
    },
    PeriodRemoved {
        index: usize,
        current_index: Option<usize>,
        current_changed: bool,
        at: DateTime<Utc>,
    },
    SessionCompleted {
        kept: usize,
        dropped: usize,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        state: TimerState,
        period_index: Option<usize>,
        period_type: Option<PeriodType>,
        note: Option<String>,
        elapsed_ms: u64,
        remaining_ms: u64,
        duration_ms: u64,
        period_count: usize,
        should_advance: bool,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Short machine-readable name, matching the serialized tag.
    pub fn name(&self) -> &'static str {
        match self {
            Event::TimerStarted { .. } => "timer_started",
            Event::TimerPaused { .. } => "timer_paused",
            Event::TimerResumed { .. } => "timer_resumed",
            Event::TimerReset { .. } => "timer_reset",
            Event::PeriodOverran { .. } => "period_overran",
            Event::PeriodChanged { .. } => "period_changed",
            Event::DurationAdjusted { .. } => "duration_adjusted",
            Event::ElapsedAdjusted { .. } => "elapsed_adjusted",
            Event::ElapsedTransferred { .. } => "elapsed_transferred",
            Event::PeriodTypeChanged { .. } => "period_type_changed",
            Event::NoteChanged { .. } => "note_changed",
            Event::PeriodAdded { .. } => "period_added",
            Event::PeriodRemoved { .. } => "period_removed",
            Event::SessionCompleted { .. } => "session_completed",
            Event::StateSnapshot { .. } => "state_snapshot",
        }
    }
}
