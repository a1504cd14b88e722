//! # Periodic Core Library
//!
//! Core logic for a segmented period timer: a session is a list of work,
//! break and fun periods that run one after another, with sounds at chosen
//! moments inside each period. The CLI is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Timer Engine**: A wall-clock-based state machine that requires the caller
//!   to periodically invoke `tick()`. Elapsed time is always derived from
//!   timestamps, so a restored session keeps counting while the process is gone
//! - **Notifications**: Per-period windows and a scheduler that sounds at most
//!   one winner per group of overlapping windows
//! - **Storage**: SQLite-based session snapshot and history, TOML-based configuration
//! - **Runtime**: Wires the engine, scheduler, store and audio player together
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Core timer state machine
//! - [`NotificationScheduler`]: Overlap-aware notification decisions
//! - [`Runtime`]: Host owning one timer and its scheduler
//! - [`Database`]: Session and history persistence
//! - [`Config`]: Application configuration management

pub mod audio;
pub mod clock;
pub mod error;
pub mod event_log;
pub mod events;
pub mod notify;
pub mod runtime;
pub mod storage;
pub mod timer;

pub use audio::{AudioPlayer, NullPlayer, RecordingPlayer, RodioPlayer};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, CoreError, DatabaseError, PlaybackError};
pub use event_log::{EventLog, LogEntry, LogKind};
pub use events::Event;
pub use notify::{NotificationCatalog, NotificationScheduler, SchedulerInput, Window, WindowKind};
pub use runtime::{Command, Runtime};
pub use storage::{Config, Database, MemoryStore, SessionStore};
pub use timer::{Period, PeriodTemplate, PeriodType, Session, TimerEngine, TimerState};
