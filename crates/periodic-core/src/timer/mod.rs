mod engine;
mod period;
mod session;

pub use engine::{
    NewPeriodDefaults, TimerEngine, ADD_PERIOD_THRESHOLD_MS, EXTENSION_MS, MIN_SIGNIFICANT_MS,
};
pub use period::{Period, PeriodTemplate, PeriodType, MINUTE_MS};
pub use session::{elapsed_ms, Session, TimerState};
