//! Integration tests for the runtime: a timer ticking under a manual clock,
//! notifications reaching a player, and sessions surviving a restart.

use periodic_core::storage::MemoryStore;
use periodic_core::{
    Command, Config, Database, Event, LogKind, ManualClock, RecordingPlayer, Runtime,
    SessionStore, TimerState,
};

const MIN: i64 = 60_000;

fn runtime_with(
    clock: &ManualClock,
    store: &MemoryStore,
    player: &RecordingPlayer,
) -> Runtime<ManualClock> {
    Runtime::new(
        &Config::default(),
        clock.clone(),
        Box::new(store.clone()),
        Box::new(player.clone()),
    )
    .unwrap()
}

fn run_for(rt: &mut Runtime<ManualClock>, clock: &ManualClock, seconds: i64) {
    for _ in 0..seconds {
        clock.advance(1_000);
        rt.tick();
    }
}

#[test]
fn full_work_period_plays_expected_sequence() {
    let clock = ManualClock::new(1_700_000_000_000);
    let store = MemoryStore::new();
    let player = RecordingPlayer::new();
    let mut rt = runtime_with(&clock, &store, &player);

    rt.apply(Command::Start).unwrap();
    // 48 minutes plus a little overtime.
    run_for(&mut rt, &clock, 48 * 60 + 90);

    // remaining_12 (target 36) beats elapsed_36 because it has higher
    // priority and 36 is past the phase threshold of 24 minutes.
    assert_eq!(
        player.played(),
        vec![
            "elapsed_6",
            "elapsed_12",
            "elapsed_18",
            "remaining_24",
            "remaining_12",
            "remaining_6",
            "remaining_3",
            "remaining_2",
            "remaining_1",
            "timesup_break",
            "overtime_1",
        ]
    );

    let current = rt.engine().current_period().unwrap();
    assert_eq!(current.user_intended_duration_ms, 48 * 60_000);
    assert!(current.duration_ms > current.elapsed_ms);
    assert!(rt.session().should_advance);
}

#[test]
fn pause_silences_windows_until_resumed() {
    let clock = ManualClock::new(0);
    let store = MemoryStore::new();
    let player = RecordingPlayer::new();
    let mut rt = runtime_with(&clock, &store, &player);

    rt.apply(Command::Start).unwrap();
    run_for(&mut rt, &clock, 6 * 60 - 1);
    rt.apply(Command::Pause).unwrap();
    run_for(&mut rt, &clock, 120);
    assert!(player.played().is_empty());

    rt.apply(Command::Resume).unwrap();
    run_for(&mut rt, &clock, 10);
    assert_eq!(player.played(), vec!["elapsed_6"]);
}

#[test]
fn rewinding_elapsed_replays_a_marker() {
    let clock = ManualClock::new(0);
    let store = MemoryStore::new();
    let player = RecordingPlayer::new();
    let mut rt = runtime_with(&clock, &store, &player);

    rt.apply(Command::Start).unwrap();
    run_for(&mut rt, &clock, 7 * 60);
    rt.apply(Command::AdjustElapsed(-2 * MIN)).unwrap();
    run_for(&mut rt, &clock, 2 * 60);

    assert_eq!(player.played(), vec!["elapsed_6", "elapsed_6"]);
    assert!(rt.log().entries().any(|e| matches!(
        e.kind,
        LogKind::SchedulerReset { .. }
    )));
}

#[test]
fn playback_failure_is_logged_and_not_retried() {
    let clock = ManualClock::new(0);
    let store = MemoryStore::new();
    let player = RecordingPlayer::failing();
    let mut rt = runtime_with(&clock, &store, &player);

    rt.apply(Command::Start).unwrap();
    run_for(&mut rt, &clock, 7 * 60);

    assert_eq!(player.played(), vec!["elapsed_6"]);
    assert_eq!(rt.engine().state(), TimerState::Running);
    let failures: Vec<_> = rt
        .log()
        .entries()
        .filter(|e| matches!(e.kind, LogKind::PlaybackFailed { .. }))
        .collect();
    assert_eq!(failures.len(), 1);
}

#[test]
fn session_survives_restart_and_keeps_counting() {
    let clock = ManualClock::new(0);
    let store = MemoryStore::new();
    let player = RecordingPlayer::new();

    {
        let mut rt = runtime_with(&clock, &store, &player);
        rt.apply(Command::Start).unwrap();
        clock.advance(5 * MIN);
        rt.apply(Command::SetNote(Some("outline".into()))).unwrap();
    }

    clock.advance(3 * MIN);
    let rt = runtime_with(&clock, &store, &player);
    let current = rt.engine().current_period().unwrap();
    assert_eq!(rt.engine().state(), TimerState::Running);
    assert_eq!(current.elapsed_ms, 8 * 60_000);
    assert_eq!(current.note.as_deref(), Some("outline"));
}

#[test]
fn corrupt_snapshot_falls_back_to_template() {
    let clock = ManualClock::new(0);
    let store = MemoryStore::new();
    store.set_raw(r#"{"periods": [{"minutes": 3}], "current_period_index": 0}"#);
    let player = RecordingPlayer::new();

    let rt = runtime_with(&clock, &store, &player);
    assert_eq!(rt.engine().state(), TimerState::Idle);
    assert_eq!(rt.session().periods.len(), 6);
}

#[test]
fn database_store_records_history_on_completion() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("periodic.db");
    let clock = ManualClock::new(0);

    {
        let db = Database::open_at(&path).unwrap();
        let mut rt = Runtime::new(
            &Config::default(),
            clock.clone(),
            Box::new(db),
            Box::new(RecordingPlayer::new()),
        )
        .unwrap();
        rt.apply(Command::Start).unwrap();
        clock.advance(20 * MIN);
        rt.apply(Command::Next).unwrap();
        clock.advance(5 * MIN);
        let event = rt.apply(Command::Finish).unwrap();
        assert!(matches!(
            event,
            Some(Event::SessionCompleted { kept: 2, .. })
        ));
    }

    let mut db = Database::open_at(&path).unwrap();
    let history = db.history(10).unwrap();
    assert_eq!(history.len(), 2);
    let stats = db.stats().unwrap();
    assert_eq!(stats.work_ms, 20 * 60_000);
    assert_eq!(stats.break_ms, 5 * 60_000);

    let restored = db.load().unwrap().unwrap();
    assert!(restored.completed);
    assert_eq!(restored.current_period_index, None);
}

#[test]
fn editing_other_periods_keeps_pending_marker() {
    let clock = ManualClock::new(0);
    let store = MemoryStore::new();
    let player = RecordingPlayer::new();
    let mut rt = runtime_with(&clock, &store, &player);

    rt.apply(Command::Start).unwrap();
    run_for(&mut rt, &clock, 6 * 60);
    assert!(rt.scheduler().has_pending());

    rt.apply(Command::AddPeriodAt(3)).unwrap();
    assert!(rt.scheduler().has_pending());
    rt.apply(Command::RemovePeriodAt(4)).unwrap();
    assert!(rt.scheduler().has_pending());

    run_for(&mut rt, &clock, 3);
    assert_eq!(player.played(), vec!["elapsed_6"]);
}

#[test]
fn adding_or_removing_current_period_drops_pending_marker() {
    let clock = ManualClock::new(0);
    let store = MemoryStore::new();
    let player = RecordingPlayer::new();
    let mut rt = runtime_with(&clock, &store, &player);

    rt.apply(Command::Start).unwrap();
    run_for(&mut rt, &clock, 6 * 60);
    assert!(rt.scheduler().has_pending());
    rt.apply(Command::AddPeriod).unwrap();
    assert!(!rt.scheduler().has_pending());
    assert_eq!(rt.session().current_period_index, Some(1));

    run_for(&mut rt, &clock, 6 * 60);
    assert!(rt.scheduler().has_pending());
    rt.apply(Command::RemovePeriod).unwrap();
    assert!(!rt.scheduler().has_pending());

    run_for(&mut rt, &clock, 3);
    assert!(player.played().is_empty());
}
