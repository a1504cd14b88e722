//! Notification windows: the catalog of what can be announced during a
//! period, and the scheduler that decides what actually fires.

mod catalog;
mod scheduler;
mod window;

pub use catalog::NotificationCatalog;
pub use scheduler::{
    pick_winner, NotificationScheduler, ResetReason, SchedulerInput, DEFAULT_WINDOW_MS,
};
pub use window::{Window, WindowKind};
