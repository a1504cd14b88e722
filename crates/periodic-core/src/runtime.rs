//! Host that owns one timer and its notification scheduler.
//!
//! Everything a front end does goes through [`Runtime::apply`] or
//! [`Runtime::tick`], so the scheduler sees every event the engine emits and
//! the store always holds the latest session.

use std::str::FromStr;

use tracing::{debug, info, warn};

use crate::audio::AudioPlayer;
use crate::clock::{datetime_from_ms, Clock};
use crate::error::Result;
use crate::event_log::{EventLog, LogEntry, LogKind};
use crate::events::Event;
use crate::notify::{NotificationScheduler, SchedulerInput, Window};
use crate::storage::{Config, SessionStore};
use crate::timer::{Session, TimerEngine, MINUTE_MS};

/// A named mutation of the timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Pause,
    Resume,
    TogglePause,
    Reset,
    Next,
    Previous,
    /// Hand the current elapsed time to the previous period.
    MoveElapsedBack,
    Finish,
    ChangeType,
    SetNote(Option<String>),
    AddPeriod,
    RemovePeriod,
    AddPeriodAt(usize),
    RemovePeriodAt(usize),
    AdjustDuration(i64),
    AdjustElapsed(i64),
}

impl FromStr for Command {
    type Err = String;

    /// Parse one line typed at the `run` prompt. Adjustments take signed
    /// minutes, e.g. `duration +5` or `elapsed -2`.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let index = |rest: &str| {
            rest.parse::<usize>()
                .map_err(|_| format!("expected a period index, got '{rest}'"))
        };
        let minutes = |rest: &str| {
            let m = rest
                .trim_start_matches('+')
                .parse::<i64>()
                .map_err(|_| format!("expected signed minutes, got '{rest}'"))?;
            m.checked_mul(MINUTE_MS as i64)
                .ok_or_else(|| "minutes out of range".to_string())
        };

        match word {
            "start" => Ok(Command::Start),
            "pause" => Ok(Command::Pause),
            "resume" => Ok(Command::Resume),
            "toggle" | "p" => Ok(Command::TogglePause),
            "reset" => Ok(Command::Reset),
            "next" | "n" => Ok(Command::Next),
            "prev" => Ok(Command::Previous),
            "move-back" => Ok(Command::MoveElapsedBack),
            "finish" => Ok(Command::Finish),
            "type" => Ok(Command::ChangeType),
            "note" if rest.is_empty() => Ok(Command::SetNote(None)),
            "note" => Ok(Command::SetNote(Some(rest.to_string()))),
            "add" if rest.is_empty() => Ok(Command::AddPeriod),
            "add" => index(rest).map(Command::AddPeriodAt),
            "remove" if rest.is_empty() => Ok(Command::RemovePeriod),
            "remove" => index(rest).map(Command::RemovePeriodAt),
            "duration" => minutes(rest).map(Command::AdjustDuration),
            "elapsed" => minutes(rest).map(Command::AdjustElapsed),
            "" => Err("empty command".into()),
            other => Err(format!("unknown command '{other}'")),
        }
    }
}

pub struct Runtime<C: Clock> {
    engine: TimerEngine<C>,
    scheduler: NotificationScheduler,
    log: EventLog,
    store: Box<dyn SessionStore>,
    player: Box<dyn AudioPlayer>,
    notifications_enabled: bool,
}

impl<C: Clock> Runtime<C> {
    /// Build a runtime, restoring the stored session when there is a usable
    /// one and starting from the configured template otherwise.
    pub fn new(
        config: &Config,
        clock: C,
        mut store: Box<dyn SessionStore>,
        player: Box<dyn AudioPlayer>,
    ) -> Result<Self> {
        let template = config.template.clone();
        let engine = match store.load()? {
            Some(session) => {
                debug!(periods = session.periods.len(), "restored stored session");
                TimerEngine::with_session(session, template, clock)
            }
            None => TimerEngine::new(template, clock),
        }
        .with_defaults(config.defaults.clone());

        Ok(Self {
            engine,
            scheduler: config.scheduler(),
            log: EventLog::new(config.event_log_capacity),
            store,
            player,
            notifications_enabled: config.notifications.enabled,
        })
    }

    pub fn engine(&self) -> &TimerEngine<C> {
        &self.engine
    }

    pub fn session(&self) -> &Session {
        self.engine.session()
    }

    pub fn scheduler(&self) -> &NotificationScheduler {
        &self.scheduler
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn snapshot(&self) -> Event {
        self.engine.snapshot()
    }

    /// Perform one mutation. `None` means the command did not apply in the
    /// current state and nothing changed.
    pub fn apply(&mut self, command: Command) -> Result<Option<Event>> {
        let engine = &mut self.engine;
        let event = match command {
            Command::Start => engine.start(),
            Command::Pause => engine.pause(),
            Command::Resume => engine.resume(),
            Command::TogglePause => engine.toggle_pause(),
            Command::Reset => engine.reset(),
            Command::Next => engine.move_to_next_period(),
            Command::Previous => engine.move_to_previous_period(),
            Command::MoveElapsedBack => engine.move_elapsed_time_to_previous_period(),
            Command::Finish => engine.finish(),
            Command::ChangeType => engine.change_type(),
            Command::SetNote(note) => engine.set_note(note),
            Command::AddPeriod => engine.add_period(),
            Command::RemovePeriod => engine.remove_period(),
            Command::AddPeriodAt(index) => engine.add_period_at_index(index),
            Command::RemovePeriodAt(index) => engine.remove_period_by_index(index),
            Command::AdjustDuration(delta) => engine.adjust_duration(delta),
            Command::AdjustElapsed(delta) => engine.adjust_elapsed(delta),
        };

        let Some(event) = event else {
            return Ok(None);
        };
        self.observe(&event);

        if let Event::SessionCompleted { kept, at, .. } = &event {
            info!(kept, "session completed");
            self.store.record_completed(self.engine.periods(), *at)?;
        }
        self.store.save(self.engine.session())?;
        Ok(Some(event))
    }

    /// Advance one tick: extend an overrunning period, then let the
    /// scheduler decide whether something should sound.
    pub fn tick(&mut self) -> Option<Window> {
        if let Some(event) = self.engine.tick() {
            self.observe(&event);
        }

        let winner = self.check_notifications();
        if let Some(window) = &winner {
            self.play(window);
        }

        if let Err(e) = self.store.save(self.engine.session()) {
            warn!(error = %e, "failed to save session");
        }
        winner
    }

    fn check_notifications(&mut self) -> Option<Window> {
        if !self.notifications_enabled {
            return None;
        }
        let period = self.engine.current_period()?;
        let input = SchedulerInput {
            elapsed_ms: period.elapsed_ms,
            intended_duration_ms: period.user_intended_duration_ms,
            period_type: period.period_type,
            next_type: self.engine.next_period_type(),
            paused: self.engine.is_paused(),
        };
        self.scheduler.check(&input)
    }

    fn play(&mut self, window: &Window) {
        let key = window.key();
        self.record(LogKind::Emitted { key: key.clone() });
        if let Err(e) = self.player.play(&key) {
            let (period_index, elapsed_ms) = self.position();
            warn!(
                key = %key,
                period_index = ?period_index,
                elapsed_ms,
                error = %e,
                "notification playback failed"
            );
            self.record(LogKind::PlaybackFailed {
                key,
                error: e.to_string(),
            });
        }
    }

    fn observe(&mut self, event: &Event) {
        debug!(event = event.name(), "timer event");
        self.record(LogKind::Timer {
            event: event.name().to_string(),
        });
        if let Some(reason) = self.scheduler.handle_event(event) {
            self.record(LogKind::SchedulerReset { reason });
        }
    }

    fn position(&self) -> (Option<usize>, u64) {
        let elapsed = self
            .engine
            .current_period()
            .map(|p| p.elapsed_ms)
            .unwrap_or(0);
        (self.engine.current_index(), elapsed)
    }

    fn record(&mut self, kind: LogKind) {
        let (period_index, elapsed_ms) = self.position();
        self.log.record(LogEntry {
            at: datetime_from_ms(self.engine.clock().now_ms()),
            period_index,
            elapsed_ms,
            kind,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::RecordingPlayer;
    use crate::clock::ManualClock;
    use crate::storage::MemoryStore;
    use crate::timer::TimerState;

    fn runtime(clock: &ManualClock) -> (Runtime<ManualClock>, MemoryStore, RecordingPlayer) {
        let store = MemoryStore::new();
        let player = RecordingPlayer::new();
        let rt = Runtime::new(
            &Config::default(),
            clock.clone(),
            Box::new(store.clone()),
            Box::new(player.clone()),
        )
        .unwrap();
        (rt, store, player)
    }

    #[test]
    fn parses_prompt_commands() {
        assert_eq!("start".parse::<Command>(), Ok(Command::Start));
        assert_eq!("n".parse::<Command>(), Ok(Command::Next));
        assert_eq!(
            "note  draft intro ".parse::<Command>(),
            Ok(Command::SetNote(Some("draft intro".into())))
        );
        assert_eq!("note".parse::<Command>(), Ok(Command::SetNote(None)));
        assert_eq!("add 2".parse::<Command>(), Ok(Command::AddPeriodAt(2)));
        assert_eq!(
            "duration +5".parse::<Command>(),
            Ok(Command::AdjustDuration(5 * 60_000))
        );
        assert_eq!(
            "elapsed -2".parse::<Command>(),
            Ok(Command::AdjustElapsed(-2 * 60_000))
        );
        assert!("remove x".parse::<Command>().is_err());
        assert_eq!(
            "elapsed 200000000000000".parse::<Command>(),
            Err("minutes out of range".to_string())
        );
        assert_eq!(
            "duration -200000000000000".parse::<Command>(),
            Err("minutes out of range".to_string())
        );
        assert!("jump".parse::<Command>().is_err());
    }

    #[test]
    fn rejected_command_changes_nothing() {
        let clock = ManualClock::new(0);
        let (mut rt, store, _) = runtime(&clock);
        assert_eq!(rt.apply(Command::Pause).unwrap(), None);
        assert!(store.raw().is_none());
        assert!(rt.log().is_empty());
    }

    #[test]
    fn apply_persists_and_logs() {
        let clock = ManualClock::new(0);
        let (mut rt, store, _) = runtime(&clock);
        let event = rt.apply(Command::Start).unwrap();
        assert!(matches!(event, Some(Event::TimerStarted { .. })));
        assert_eq!(rt.engine().state(), TimerState::Running);

        let saved = Session::from_stored_json(&store.raw().unwrap()).unwrap();
        assert_eq!(saved.current_period_index, Some(0));

        let kinds: Vec<_> = rt.log().entries().map(|e| e.kind.clone()).collect();
        assert!(kinds.contains(&LogKind::Timer {
            event: "timer_started".into()
        }));
    }

    #[test]
    fn tick_plays_first_elapsed_marker() {
        let clock = ManualClock::new(0);
        let (mut rt, _, player) = runtime(&clock);
        rt.apply(Command::Start).unwrap();

        for _ in 0..(6 * 60 + 3) {
            clock.advance(1_000);
            rt.tick();
        }
        assert_eq!(player.played(), vec!["elapsed_6"]);
        assert_eq!(rt.log().emitted_keys(), vec!["elapsed_6"]);
    }

    #[test]
    fn disabled_notifications_stay_silent() {
        let clock = ManualClock::new(0);
        let mut config = Config::default();
        config.notifications.enabled = false;
        let player = RecordingPlayer::new();
        let mut rt = Runtime::new(
            &config,
            clock.clone(),
            Box::new(MemoryStore::new()),
            Box::new(player.clone()),
        )
        .unwrap();
        rt.apply(Command::Start).unwrap();
        for _ in 0..(7 * 60) {
            clock.advance(1_000);
            rt.tick();
        }
        assert!(player.played().is_empty());
    }

    #[test]
    fn completion_records_kept_periods() {
        let clock = ManualClock::new(0);
        let (mut rt, store, _) = runtime(&clock);
        rt.apply(Command::Start).unwrap();
        clock.advance(10 * 60_000);
        rt.apply(Command::Next).unwrap();
        clock.advance(30_000);
        let event = rt.apply(Command::Finish).unwrap();

        assert!(matches!(
            event,
            Some(Event::SessionCompleted {
                kept: 1,
                dropped: 5,
                ..
            })
        ));
        let completed = store.completed();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].elapsed_ms, 10 * 60_000);
    }
}
