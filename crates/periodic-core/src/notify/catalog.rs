//! Static notification catalog.
//!
//! Lists the minute offsets available per category and expands them into the
//! concrete windows for one period.

use serde::{Deserialize, Serialize};

use super::window::{Window, WindowKind};
use crate::timer::{PeriodType, MINUTE_MS};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationCatalog {
    /// Minutes since the start of a period.
    #[serde(default = "default_elapsed")]
    pub elapsed: Vec<u64>,
    /// Minutes before the intended end.
    #[serde(default = "default_remaining")]
    pub remaining: Vec<u64>,
    /// Minutes past the intended end of work and fun periods.
    #[serde(default = "default_overtime")]
    pub overtime: Vec<u64>,
    /// Minutes past the intended end of breaks.
    #[serde(default = "default_overtime_break")]
    pub overtime_break: Vec<u64>,
}

fn default_elapsed() -> Vec<u64> {
    vec![6, 12, 18, 24, 30, 36, 42, 48, 54, 60, 72, 84, 96, 108, 120]
}
fn default_remaining() -> Vec<u64> {
    vec![1, 2, 3, 6, 12, 24]
}
fn default_overtime() -> Vec<u64> {
    vec![1, 2, 3, 6, 12, 24, 36, 48, 60]
}
fn default_overtime_break() -> Vec<u64> {
    vec![1, 2, 3, 5, 10, 15, 20, 30]
}

impl Default for NotificationCatalog {
    fn default() -> Self {
        Self {
            elapsed: default_elapsed(),
            remaining: default_remaining(),
            overtime: default_overtime(),
            overtime_break: default_overtime_break(),
        }
    }
}

impl NotificationCatalog {
    pub fn max_remaining_minutes(&self) -> u64 {
        self.remaining.iter().copied().max().unwrap_or(0)
    }

    /// Boundary between the elapsed-announcement phase and the
    /// remaining-announcement phase of a period.
    ///
    /// Short periods split at the midpoint; long ones at the point the largest
    /// remaining warning reaches back to.
    pub fn phase_threshold(&self, duration_ms: u64) -> u64 {
        let reach = self.max_remaining_minutes().saturating_mul(MINUTE_MS);
        (duration_ms / 2).max(duration_ms.saturating_sub(reach))
    }

    /// Every window for a period of intended `duration_ms`.
    ///
    /// Markers that would land outside the period (an elapsed marker at or
    /// past the end, a remaining warning at or before the start) are left out.
    pub fn windows(
        &self,
        duration_ms: u64,
        period_type: PeriodType,
        next_type: Option<PeriodType>,
    ) -> Vec<Window> {
        let mut windows = Vec::new();

        for &minutes in &self.elapsed {
            let target = minutes.saturating_mul(MINUTE_MS);
            if target > 0 && target < duration_ms {
                windows.push(Window::new(WindowKind::Elapsed { minutes }, target));
            }
        }

        for &minutes in &self.remaining {
            let offset = minutes.saturating_mul(MINUTE_MS);
            if offset > 0 && offset < duration_ms {
                windows.push(Window::new(
                    WindowKind::Remaining { minutes },
                    duration_ms - offset,
                ));
            }
        }

        let next = next_type.filter(|next| *next != period_type);
        windows.push(Window::new(WindowKind::TimesUp { next }, duration_ms));

        let (overtime, is_break) = match period_type {
            PeriodType::Break => (&self.overtime_break, true),
            PeriodType::Work | PeriodType::Fun => (&self.overtime, false),
        };
        for &minutes in overtime {
            if minutes == 0 {
                continue;
            }
            let kind = if is_break {
                WindowKind::OvertimeBreak { minutes }
            } else {
                WindowKind::Overtime { minutes }
            };
            windows.push(Window::new(
                kind,
                duration_ms.saturating_add(minutes.saturating_mul(MINUTE_MS)),
            ));
        }

        windows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN: u64 = MINUTE_MS;

    #[test]
    fn threshold_is_midpoint_for_short_periods() {
        let catalog = NotificationCatalog::default();
        assert_eq!(catalog.phase_threshold(48 * MIN), 24 * MIN);
        assert_eq!(catalog.phase_threshold(10 * MIN), 5 * MIN);
    }

    #[test]
    fn threshold_anchors_to_largest_remaining_for_long_periods() {
        let catalog = NotificationCatalog::default();
        assert_eq!(catalog.phase_threshold(120 * MIN), 96 * MIN);
    }

    #[test]
    fn windows_stay_inside_the_period() {
        let catalog = NotificationCatalog::default();
        let windows = catalog.windows(10 * MIN, PeriodType::Work, None);
        let keys: Vec<String> = windows.iter().map(Window::key).collect();
        assert!(keys.contains(&"elapsed_6".to_string()));
        assert!(!keys.contains(&"elapsed_12".to_string()));
        assert!(keys.contains(&"remaining_6".to_string()));
        assert!(!keys.contains(&"remaining_12".to_string()));
        assert!(keys.contains(&"timesup".to_string()));
        assert!(keys.contains(&"overtime_60".to_string()));
    }

    #[test]
    fn breaks_use_break_overtime_list() {
        let catalog = NotificationCatalog::default();
        let windows = catalog.windows(12 * MIN, PeriodType::Break, Some(PeriodType::Work));
        assert!(windows.iter().any(|w| w.key() == "overtime_break_5"));
        assert!(!windows.iter().any(|w| w.key().starts_with("overtime_1")));
        assert!(windows.iter().any(|w| w.key() == "timesup_work"));
    }

    #[test]
    fn same_type_next_period_uses_plain_timesup() {
        let catalog = NotificationCatalog::default();
        let windows = catalog.windows(12 * MIN, PeriodType::Work, Some(PeriodType::Work));
        assert!(windows.iter().any(|w| w.key() == "timesup"));
    }

    #[test]
    fn no_remaining_warnings_leaves_whole_period_to_elapsed_markers() {
        let catalog = NotificationCatalog {
            remaining: Vec::new(),
            ..NotificationCatalog::default()
        };
        assert_eq!(catalog.phase_threshold(240 * MIN), 240 * MIN);
    }
}
