use serde::{Deserialize, Serialize};

use crate::timer::PeriodType;

/// What a notification window announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WindowKind {
    /// `minutes` have passed since the period started.
    Elapsed { minutes: u64 },
    /// `minutes` are left before the intended end.
    Remaining { minutes: u64 },
    /// The intended duration is over. `next` is set when the following
    /// period has a different type, so the sound can say what comes next.
    TimesUp { next: Option<PeriodType> },
    /// `minutes` past the intended end of a work or fun period.
    Overtime { minutes: u64 },
    /// `minutes` past the intended end of a break.
    OvertimeBreak { minutes: u64 },
}

impl WindowKind {
    /// Higher wins when windows overlap.
    pub fn priority(&self) -> u8 {
        match self {
            WindowKind::Overtime { .. } | WindowKind::OvertimeBreak { .. } => 4,
            WindowKind::TimesUp { .. } => 3,
            WindowKind::Remaining { .. } => 2,
            WindowKind::Elapsed { .. } => 1,
        }
    }

    /// Sound key handed to the audio player.
    pub fn key(&self) -> String {
        match self {
            WindowKind::Elapsed { minutes } => format!("elapsed_{minutes}"),
            WindowKind::Remaining { minutes } => format!("remaining_{minutes}"),
            WindowKind::TimesUp { next: None } => "timesup".to_string(),
            WindowKind::TimesUp { next: Some(next) } => format!("timesup_{next}"),
            WindowKind::Overtime { minutes } => format!("overtime_{minutes}"),
            WindowKind::OvertimeBreak { minutes } => format!("overtime_break_{minutes}"),
        }
    }
}

/// A notification centered on an elapsed-time value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    #[serde(flatten)]
    pub kind: WindowKind,
    pub target_ms: u64,
}

impl Window {
    pub fn new(kind: WindowKind, target_ms: u64) -> Self {
        Self { kind, target_ms }
    }

    pub fn key(&self) -> String {
        self.kind.key()
    }

    pub fn priority(&self) -> u8 {
        self.kind.priority()
    }

    pub fn is_open(&self, elapsed_ms: u64, window_ms: u64) -> bool {
        elapsed_ms.abs_diff(self.target_ms) <= window_ms
    }

    /// Elapsed markers belong before the phase threshold, remaining
    /// warnings at or after it. Other kinds are always eligible.
    pub fn fits_phase(&self, threshold_ms: u64) -> bool {
        match self.kind {
            WindowKind::Elapsed { .. } => self.target_ms < threshold_ms,
            WindowKind::Remaining { .. } => self.target_ms >= threshold_ms,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys() {
        assert_eq!(WindowKind::Elapsed { minutes: 6 }.key(), "elapsed_6");
        assert_eq!(WindowKind::Remaining { minutes: 24 }.key(), "remaining_24");
        assert_eq!(WindowKind::TimesUp { next: None }.key(), "timesup");
        assert_eq!(
            WindowKind::TimesUp {
                next: Some(PeriodType::Break)
            }
            .key(),
            "timesup_break"
        );
        assert_eq!(WindowKind::OvertimeBreak { minutes: 5 }.key(), "overtime_break_5");
    }

    #[test]
    fn priority_order() {
        let over = WindowKind::Overtime { minutes: 1 }.priority();
        let up = WindowKind::TimesUp { next: None }.priority();
        let rem = WindowKind::Remaining { minutes: 1 }.priority();
        let ela = WindowKind::Elapsed { minutes: 1 }.priority();
        assert!(over > up && up > rem && rem > ela);
    }

    #[test]
    fn window_edges_are_inclusive() {
        let w = Window::new(WindowKind::Elapsed { minutes: 1 }, 60_000);
        assert!(w.is_open(58_000, 2_000));
        assert!(w.is_open(62_000, 2_000));
        assert!(!w.is_open(62_001, 2_000));
        assert!(!w.is_open(57_999, 2_000));
    }
}
