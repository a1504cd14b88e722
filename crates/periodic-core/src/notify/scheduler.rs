//! Notification window scheduler.
//!
//! Called once per tick with the current period's elapsed time. Windows that
//! are open at the same time form an overlap group; the group is resolved
//! only after every member has closed again, so the winner is picked with
//! all competitors known and fires exactly once.
//!
//! ```text
//!   window enters       more windows enter        last member closes
//!  ───────────────► Group ───────────────► Group ────────────────────► emit winner
//!                     │                                                 (group cleared)
//!                     │ pause / period change / duration change / rewind
//!                     └────────────────────────────────────────────────► cleared, nothing emitted
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::catalog::NotificationCatalog;
use super::window::Window;
use crate::events::Event;
use crate::timer::PeriodType;

/// Default tolerance around a window's target.
pub const DEFAULT_WINDOW_MS: u64 = 2_000;

/// What the scheduler needs to know about the current period on each tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerInput {
    pub elapsed_ms: u64,
    pub intended_duration_ms: u64,
    pub period_type: PeriodType,
    pub next_type: Option<PeriodType>,
    pub paused: bool,
}

/// Why pending overlap state was thrown away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetReason {
    PeriodChanged,
    DurationChanged,
    /// Pending keys belong to the old type's catalog.
    TypeChanged,
    ElapsedRewound,
    Paused,
}

#[derive(Debug, Clone)]
pub struct NotificationScheduler {
    catalog: NotificationCatalog,
    window_ms: u64,
    /// Windows seen open since the group last resolved, by key.
    group: BTreeMap<String, Window>,
    /// Keys open as of the last tick.
    open: BTreeSet<String>,
}

impl NotificationScheduler {
    pub fn new(catalog: NotificationCatalog, window_ms: u64) -> Self {
        Self {
            catalog,
            window_ms,
            group: BTreeMap::new(),
            open: BTreeSet::new(),
        }
    }

    pub fn catalog(&self) -> &NotificationCatalog {
        &self.catalog
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    /// Keys of windows waiting for their group to resolve.
    pub fn pending_keys(&self) -> impl Iterator<Item = &str> {
        self.group.keys().map(String::as_str)
    }

    pub fn has_pending(&self) -> bool {
        !self.group.is_empty() || !self.open.is_empty()
    }

    /// Advance the scheduler to `input.elapsed_ms`. Returns the winning
    /// window when an overlap group resolves on this tick.
    pub fn check(&mut self, input: &SchedulerInput) -> Option<Window> {
        if input.paused {
            self.reset();
            return None;
        }

        let open: BTreeMap<String, Window> = self
            .catalog
            .windows(
                input.intended_duration_ms,
                input.period_type,
                input.next_type,
            )
            .into_iter()
            .filter(|w| w.is_open(input.elapsed_ms, self.window_ms))
            .map(|w| (w.key(), w))
            .collect();

        for (key, window) in &open {
            if !self.group.contains_key(key) {
                debug!(key = %key, elapsed_ms = input.elapsed_ms, "notification window entered");
                self.group.insert(key.clone(), window.clone());
            }
        }

        let still_open = self.group.keys().filter(|k| open.contains_key(*k)).count();
        self.open = open.into_keys().collect();

        if self.group.is_empty() || still_open > 0 {
            return None;
        }

        let threshold = self.catalog.phase_threshold(input.intended_duration_ms);
        let group = std::mem::take(&mut self.group);
        let candidates = group.len();
        let winner = pick_winner(group.into_values(), threshold);
        let winner_key = winner.as_ref().map(Window::key);
        debug!(
            candidates,
            threshold_ms = threshold,
            winner = winner_key.as_deref().unwrap_or("none"),
            "overlap group resolved"
        );
        winner
    }

    /// Drop all pending overlap state. Returns whether anything was pending.
    pub fn reset(&mut self) -> bool {
        let had_state = self.has_pending();
        self.group.clear();
        self.open.clear();
        had_state
    }

    pub fn on_period_change(&mut self) {
        self.reset();
    }

    pub fn on_duration_change(&mut self) {
        self.reset();
    }

    /// Moving backward can re-enter windows already handled, so state is
    /// cleared; moving forward cannot skip anything already pending.
    pub fn on_elapsed_adjustment(&mut self, new_elapsed_ms: u64, old_elapsed_ms: u64) {
        if new_elapsed_ms < old_elapsed_ms {
            self.reset();
        }
    }

    /// Apply the reset triggers carried by a timer event.
    pub fn handle_event(&mut self, event: &Event) -> Option<ResetReason> {
        match event {
            Event::TimerStarted { .. }
            | Event::TimerReset { .. }
            | Event::PeriodChanged { .. }
            | Event::SessionCompleted { .. }
            | Event::PeriodAdded {
                current_changed: true,
                ..
            }
            | Event::PeriodRemoved {
                current_changed: true,
                ..
            } => {
                self.on_period_change();
                Some(ResetReason::PeriodChanged)
            }
            Event::DurationAdjusted { .. } => {
                self.on_duration_change();
                Some(ResetReason::DurationChanged)
            }
            Event::PeriodTypeChanged { .. } => {
                self.reset();
                Some(ResetReason::TypeChanged)
            }
            Event::ElapsedAdjusted { from_ms, to_ms, .. } => {
                self.on_elapsed_adjustment(*to_ms, *from_ms);
                (to_ms < from_ms).then_some(ResetReason::ElapsedRewound)
            }
            Event::ElapsedTransferred { moved_ms, .. } => {
                self.on_elapsed_adjustment(0, *moved_ms);
                Some(ResetReason::ElapsedRewound)
            }
            _ => None,
        }
    }
}

/// Highest priority among windows that fit their phase; ties go to the
/// earlier target.
pub fn pick_winner(windows: impl IntoIterator<Item = Window>, threshold_ms: u64) -> Option<Window> {
    windows
        .into_iter()
        .filter(|w| w.fits_phase(threshold_ms))
        .min_by(|a, b| {
            b.priority()
                .cmp(&a.priority())
                .then(a.target_ms.cmp(&b.target_ms))
        })
}
