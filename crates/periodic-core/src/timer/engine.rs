//! Timer engine implementation.
//!
//! The timer engine is a wall-clock-based state machine. It does not use
//! internal threads - the caller is responsible for calling `tick()` periodically.
//! Elapsed time is always derived from `started_at`/`paused_at`; every
//! mutation moves those timestamps instead of touching a counter.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused -> Finished -> (reset) Idle
//! ```
//!
//! Every command returns `Some(Event)` when it changed something and `None`
//! when its preconditions did not hold. Invalid calls are expected from a UI
//! (a disabled button firing once more) and never corrupt state.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new(PeriodTemplate::default_list(), SystemClock);
//! engine.start();
//! // Once per second:
//! engine.tick(); // Returns Some(Event::PeriodOverran) on the first overrun
//! ```

use serde::{Deserialize, Serialize};

use super::period::{Period, PeriodTemplate, PeriodType, MINUTE_MS};
use super::session::{elapsed_ms, Session, TimerState};
use crate::clock::{datetime_from_ms, Clock, SystemClock};
use crate::events::Event;

/// Auto-extension step on overrun, and grace given to a period we move back to.
pub const EXTENSION_MS: u64 = MINUTE_MS;

/// Periods at or below this elapsed time are dropped on completion.
pub const MIN_SIGNIFICANT_MS: u64 = MINUTE_MS;

/// Above this much progress `add_period` appends instead of starting over.
pub const ADD_PERIOD_THRESHOLD_MS: u64 = 60_000;

/// Durations for periods the user inserts at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewPeriodDefaults {
    pub work_minutes: u64,
    pub break_minutes: u64,
    pub fun_minutes: u64,
}

impl Default for NewPeriodDefaults {
    fn default() -> Self {
        Self {
            work_minutes: 48,
            break_minutes: 12,
            fun_minutes: 24,
        }
    }
}

impl NewPeriodDefaults {
    pub fn period(&self, period_type: PeriodType) -> Period {
        let minutes = match period_type {
            PeriodType::Work => self.work_minutes,
            PeriodType::Break => self.break_minutes,
            PeriodType::Fun => self.fun_minutes,
        };
        Period::new(period_type, minutes.saturating_mul(MINUTE_MS))
    }
}

/// Core timer engine.
///
/// Operates on wall-clock timestamps -- no internal thread.
#[derive(Debug, Clone)]
pub struct TimerEngine<C: Clock = SystemClock> {
    session: Session,
    template: Vec<PeriodTemplate>,
    defaults: NewPeriodDefaults,
    clock: C,
}

impl<C: Clock> TimerEngine<C> {
    /// Create an idle engine with fresh periods from `template`.
    pub fn new(template: Vec<PeriodTemplate>, clock: C) -> Self {
        let session = Session::from_template(&template);
        Self::with_session(session, template, clock)
    }

    /// Resume from a previously stored session.
    pub fn with_session(session: Session, template: Vec<PeriodTemplate>, clock: C) -> Self {
        Self {
            session,
            template,
            defaults: NewPeriodDefaults::default(),
            clock,
        }
    }

    pub fn with_defaults(mut self, defaults: NewPeriodDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.session.state()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn periods(&self) -> &[Period] {
        &self.session.periods
    }

    pub fn current_index(&self) -> Option<usize> {
        self.session.current_period_index
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Current period with elapsed/remaining computed for this instant.
    pub fn current_period(&self) -> Option<Period> {
        let mut period = self.session.current()?.clone();
        if let Some(elapsed) = self.live_elapsed() {
            period.set_elapsed(elapsed);
        }
        Some(period)
    }

    pub fn next_period_type(&self) -> Option<PeriodType> {
        let i = self.session.current_period_index?;
        self.session.periods.get(i + 1).map(|p| p.period_type)
    }

    pub fn is_paused(&self) -> bool {
        self.state() == TimerState::Paused
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        let period = self.current_period();
        Event::StateSnapshot {
            state: self.state(),
            period_index: self.session.current_period_index,
            period_type: period.as_ref().map(|p| p.period_type),
            note: period.as_ref().and_then(|p| p.note.clone()),
            elapsed_ms: period.as_ref().map(|p| p.elapsed_ms).unwrap_or(0),
            remaining_ms: period.as_ref().map(|p| p.remaining_ms).unwrap_or(0),
            duration_ms: period.as_ref().map(|p| p.duration_ms).unwrap_or(0),
            period_count: self.session.periods.len(),
            should_advance: self.session.should_advance,
            at: self.at(),
        }
    }

    // ── Run control ──────────────────────────────────────────────────

    pub fn start(&mut self) -> Option<Event> {
        if self.state() != TimerState::Idle || self.session.periods.is_empty() {
            return None;
        }
        self.session.paused_at = None;
        self.enter_period(0, 0);
        let period = self.session.current()?;
        Some(Event::TimerStarted {
            period_index: 0,
            period_type: period.period_type,
            duration_ms: period.duration_ms,
            at: self.at(),
        })
    }

    pub fn pause(&mut self) -> Option<Event> {
        if self.state() != TimerState::Running {
            return None;
        }
        self.session.paused_at = Some(self.now());
        self.recompute();
        Some(Event::TimerPaused {
            elapsed_ms: self.session.current()?.elapsed_ms,
            at: self.at(),
        })
    }

    pub fn resume(&mut self) -> Option<Event> {
        if self.state() != TimerState::Paused {
            return None;
        }
        let now = self.now();
        let paused_at = self.session.paused_at.take()?;
        if let Some(started) = self.session.started_at.as_mut() {
            *started += now - paused_at;
        }
        self.recompute();
        Some(Event::TimerResumed {
            elapsed_ms: self.session.current()?.elapsed_ms,
            at: self.at(),
        })
    }

    pub fn toggle_pause(&mut self) -> Option<Event> {
        match self.state() {
            TimerState::Running => self.pause(),
            TimerState::Paused => self.resume(),
            _ => None,
        }
    }

    /// Back to fresh template periods, idle.
    pub fn reset(&mut self) -> Option<Event> {
        self.session = Session::from_template(&self.template);
        Some(Event::TimerReset { at: self.at() })
    }

    /// Call periodically while running. Extends the current period instead
    /// of letting it run dry; returns `Some(Event::PeriodOverran)` the first
    /// time it passes its intended duration.
    pub fn tick(&mut self) -> Option<Event> {
        if self.state() != TimerState::Running {
            return None;
        }
        self.recompute();
        let index = self.session.current_period_index?;
        let period = self.session.periods.get_mut(index)?;
        if period.elapsed_ms < period.duration_ms {
            return None;
        }

        let first_overrun = period.duration_ms == period.user_intended_duration_ms;
        let steps = (period.elapsed_ms - period.duration_ms) / EXTENSION_MS + 1;
        period.duration_ms = period
            .duration_ms
            .saturating_add(steps.saturating_mul(EXTENSION_MS));
        period.sync_remaining();

        if !first_overrun {
            return None;
        }
        let (period_type, duration_ms) = (period.period_type, period.duration_ms);
        self.session.should_advance = true;
        Some(Event::PeriodOverran {
            period_index: index,
            period_type,
            duration_ms,
            at: self.at(),
        })
    }

    // ── Time adjustments ─────────────────────────────────────────────

    /// Change the planned duration; never below what has already elapsed.
    pub fn adjust_duration(&mut self, delta_ms: i64) -> Option<Event> {
        let index = self.active_index()?;
        self.recompute();
        let period = self.session.periods.get_mut(index)?;
        let from_ms = period.duration_ms;
        let proposed = if delta_ms >= 0 {
            from_ms.saturating_add(delta_ms as u64)
        } else {
            from_ms.saturating_sub(delta_ms.unsigned_abs())
        };
        let to_ms = proposed.max(period.elapsed_ms);
        if to_ms == from_ms && to_ms == period.user_intended_duration_ms {
            return None;
        }
        period.duration_ms = to_ms;
        period.user_intended_duration_ms = to_ms;
        period.sync_remaining();
        Some(Event::DurationAdjusted {
            period_index: index,
            from_ms,
            to_ms,
            at: self.at(),
        })
    }

    /// Shift elapsed time by moving `started_at`; backward moves are capped at
    /// the elapsed time so it never goes negative.
    pub fn adjust_elapsed(&mut self, delta_ms: i64) -> Option<Event> {
        let index = self.active_index()?;
        self.recompute();
        let from_ms = self.session.periods.get(index)?.elapsed_ms;
        let shift = if delta_ms >= 0 {
            delta_ms
        } else {
            -(from_ms.min(delta_ms.unsigned_abs()) as i64)
        };
        if shift == 0 {
            return None;
        }
        let started = self.session.started_at?.checked_sub(shift)?;
        self.session.started_at = Some(started);
        self.recompute();
        let to_ms = self.session.periods.get(index)?.elapsed_ms;
        Some(Event::ElapsedAdjusted {
            period_index: index,
            from_ms,
            to_ms,
            at: self.at(),
        })
    }

    // ── Navigation ───────────────────────────────────────────────────

    /// Close the current period and continue with the next one; on the last
    /// period this completes the session.
    pub fn move_to_next_period(&mut self) -> Option<Event> {
        let index = self.active_index()?;
        if index + 1 >= self.session.periods.len() {
            return self.handle_timer_completion();
        }
        let carried_ms = self.freeze_current(index);
        self.enter_period(index + 1, carried_ms);
        Some(Event::PeriodChanged {
            from: index,
            to: index + 1,
            carried_ms,
            at: self.at(),
        })
    }

    pub fn move_to_previous_period(&mut self) -> Option<Event> {
        let index = self.active_index()?;
        if index == 0 {
            return None;
        }
        self.recompute();
        if let Some(current) = self.session.periods.get_mut(index) {
            current.finished = false;
        }
        let previous = self.session.periods.get_mut(index - 1)?;
        previous.duration_ms += EXTENSION_MS;
        previous.sync_remaining();
        self.enter_period(index - 1, 0);
        Some(Event::PeriodChanged {
            from: index,
            to: index - 1,
            carried_ms: 0,
            at: self.at(),
        })
    }

    /// Hand the whole elapsed time of the current period to the previous one.
    pub fn move_elapsed_time_to_previous_period(&mut self) -> Option<Event> {
        let index = self.active_index()?;
        if index == 0 {
            return None;
        }
        self.recompute();
        let moved_ms = self.session.periods.get(index)?.elapsed_ms;
        if moved_ms == 0 {
            return None;
        }
        let previous = self.session.periods.get_mut(index - 1)?;
        previous.duration_ms += moved_ms;
        previous.elapsed_ms += moved_ms;
        previous.sync_remaining();
        self.adjust_elapsed(-(moved_ms as i64))?;
        Some(Event::ElapsedTransferred {
            from_index: index,
            to_index: index - 1,
            moved_ms,
            at: self.at(),
        })
    }

    /// Close the final period and end the session. Periods nobody really
    /// engaged with are dropped from the record.
    pub fn handle_timer_completion(&mut self) -> Option<Event> {
        let index = self.active_index()?;
        self.freeze_current(index);
        self.session.current_period_index = None;
        self.session.started_at = None;
        self.session.paused_at = None;
        self.session.should_advance = false;
        self.session.completed = true;

        let before = self.session.periods.len();
        self.session
            .periods
            .retain(|p| p.elapsed_ms > MIN_SIGNIFICANT_MS);
        let kept = self.session.periods.len();
        Some(Event::SessionCompleted {
            kept,
            dropped: before - kept,
            at: self.at(),
        })
    }

    pub fn finish(&mut self) -> Option<Event> {
        self.handle_timer_completion()
    }

    // ── Period edits ─────────────────────────────────────────────────

    pub fn change_type(&mut self) -> Option<Event> {
        let index = self.active_index()?;
        let period = self.session.periods.get_mut(index)?;
        period.period_type = period.period_type.cycle();
        let period_type = period.period_type;
        Some(Event::PeriodTypeChanged {
            period_index: index,
            period_type,
            at: self.at(),
        })
    }

    pub fn set_note(&mut self, note: Option<String>) -> Option<Event> {
        let index = self.active_index()?;
        let period = self.session.periods.get_mut(index)?;
        let note = note.filter(|n| !n.trim().is_empty());
        if period.note == note {
            return None;
        }
        period.note = note.clone();
        Some(Event::NoteChanged {
            period_index: index,
            note,
            at: self.at(),
        })
    }

    /// Insert a period next to the current one.
    ///
    /// With more than a minute of progress the new period goes after the
    /// current one and becomes current. Otherwise it goes before it, becomes
    /// current with zero elapsed, and the old current period starts over.
    pub fn add_period(&mut self) -> Option<Event> {
        let index = self.active_index()?;
        self.recompute();
        let current = self.session.periods.get(index)?;
        let new_period = self.defaults.period(current.period_type.follower());

        if current.elapsed_ms > ADD_PERIOD_THRESHOLD_MS {
            self.session.periods.insert(index + 1, new_period);
            self.move_to_next_period()?;
            return Some(Event::PeriodAdded {
                index: index + 1,
                current_index: Some(index + 1),
                current_changed: true,
                at: self.at(),
            });
        }

        let restarted = current.fresh_copy();
        self.session.periods[index] = restarted;
        self.session.periods.insert(index, new_period);
        self.enter_period(index, 0);
        Some(Event::PeriodAdded {
            index,
            current_index: Some(index),
            current_changed: true,
            at: self.at(),
        })
    }

    /// Remove the current period, continuing with the next one (or the
    /// previous one when the current period is the last).
    pub fn remove_period(&mut self) -> Option<Event> {
        let index = self.active_index()?;
        let len = self.session.periods.len();
        if len <= 1 {
            return None;
        }

        let current_index = if index + 1 == len {
            self.move_to_previous_period()?;
            self.session.periods.remove(index);
            index - 1
        } else {
            self.session.periods.remove(index);
            self.enter_period(index, 0);
            index
        };
        Some(Event::PeriodRemoved {
            index,
            current_index: Some(current_index),
            current_changed: true,
            at: self.at(),
        })
    }

    /// Insert a new period at `index` (`0..=len`). The current period stays
    /// current.
    pub fn add_period_at_index(&mut self, index: usize) -> Option<Event> {
        if self.state() == TimerState::Finished || index > self.session.periods.len() {
            return None;
        }
        let period_type = match index.checked_sub(1) {
            Some(prev) => self.session.periods[prev].period_type.follower(),
            None => PeriodType::Work,
        };
        self.session
            .periods
            .insert(index, self.defaults.period(period_type));
        if let Some(current) = self.session.current_period_index.as_mut() {
            if index <= *current {
                *current += 1;
            }
        }
        Some(Event::PeriodAdded {
            index,
            current_index: self.session.current_period_index,
            current_changed: false,
            at: self.at(),
        })
    }

    pub fn remove_period_by_index(&mut self, index: usize) -> Option<Event> {
        let len = self.session.periods.len();
        if self.state() == TimerState::Finished || index >= len || len <= 1 {
            return None;
        }
        if self.session.current_period_index == Some(index) {
            return self.remove_period();
        }
        self.session.periods.remove(index);
        if let Some(current) = self.session.current_period_index.as_mut() {
            if index < *current {
                *current -= 1;
            }
        }
        Some(Event::PeriodRemoved {
            index,
            current_index: self.session.current_period_index,
            current_changed: false,
            at: self.at(),
        })
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn now(&self) -> i64 {
        self.clock.now_ms()
    }

    fn at(&self) -> chrono::DateTime<chrono::Utc> {
        datetime_from_ms(self.now())
    }

    /// Index of the current period while running or paused.
    fn active_index(&self) -> Option<usize> {
        match self.state() {
            TimerState::Running | TimerState::Paused => self
                .session
                .current_period_index
                .filter(|i| *i < self.session.periods.len()),
            _ => None,
        }
    }

    fn live_elapsed(&self) -> Option<u64> {
        let started = self.session.started_at?;
        self.session.current_period_index?;
        Some(elapsed_ms(self.now(), started, self.session.paused_at))
    }

    /// Write the live elapsed time into the current period.
    fn recompute(&mut self) {
        let Some(elapsed) = self.live_elapsed() else {
            return;
        };
        if let Some(period) = self
            .session
            .current_period_index
            .and_then(|i| self.session.periods.get_mut(i))
        {
            period.set_elapsed(elapsed);
        }
    }

    /// Round the period at `index` down to whole minutes and mark it done.
    /// Returns the discarded sub-minute remainder.
    fn freeze_current(&mut self, index: usize) -> u64 {
        self.recompute();
        let Some(period) = self.session.periods.get_mut(index) else {
            return 0;
        };
        let remainder = period.elapsed_ms % MINUTE_MS;
        let rounded = period.elapsed_ms - remainder;
        period.elapsed_ms = rounded;
        period.duration_ms = rounded;
        period.remaining_ms = 0;
        period.finished = true;
        remainder
    }

    /// Make `index` current, rebasing `started_at` so its elapsed time is its
    /// stored elapsed plus `carry_ms`. A paused session stays paused.
    fn enter_period(&mut self, index: usize, carry_ms: u64) {
        let now = self.now();
        let Some(period) = self.session.periods.get_mut(index) else {
            return;
        };
        period.finished = false;
        let offset = (period.elapsed_ms + carry_ms) as i64;
        self.session.current_period_index = Some(index);
        self.session.started_at = Some(now - offset);
        if self.session.paused_at.is_some() {
            self.session.paused_at = Some(now);
        }
        self.session.should_advance = false;
        self.recompute();
    }
}
