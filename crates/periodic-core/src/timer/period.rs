use serde::{Deserialize, Serialize};

pub const MINUTE_MS: u64 = 60_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    Work,
    Break,
    Fun,
}

impl PeriodType {
    pub const ALL: [PeriodType; 3] = [PeriodType::Work, PeriodType::Break, PeriodType::Fun];

    /// Next type in the fixed cycle, wrapping.
    pub fn cycle(self) -> Self {
        let pos = Self::ALL.iter().position(|t| *t == self).unwrap_or(0);
        Self::ALL[(pos + 1) % Self::ALL.len()]
    }

    /// Type a freshly inserted period gets when it follows `self`.
    pub fn follower(self) -> Self {
        match self {
            PeriodType::Work => PeriodType::Break,
            PeriodType::Break | PeriodType::Fun => PeriodType::Work,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PeriodType::Work => "work",
            PeriodType::Break => "break",
            PeriodType::Fun => "fun",
        }
    }
}

impl std::fmt::Display for PeriodType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PeriodType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "work" => Ok(PeriodType::Work),
            "break" => Ok(PeriodType::Break),
            "fun" => Ok(PeriodType::Fun),
            other => Err(format!("unknown period type: {other}")),
        }
    }
}

/// One segment of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub duration_ms: u64,
    /// Last duration the user set explicitly. Notification math uses this so
    /// auto-extension does not move the schedule.
    pub user_intended_duration_ms: u64,
    pub elapsed_ms: u64,
    pub remaining_ms: u64,
    pub finished: bool,
    pub period_type: PeriodType,
    #[serde(default)]
    pub note: Option<String>,
}

impl Period {
    pub fn new(period_type: PeriodType, duration_ms: u64) -> Self {
        Self {
            duration_ms,
            user_intended_duration_ms: duration_ms,
            elapsed_ms: 0,
            remaining_ms: duration_ms,
            finished: false,
            period_type,
            note: None,
        }
    }

    /// Same type, note and intended duration, with no progress.
    pub fn fresh_copy(&self) -> Self {
        Self {
            note: self.note.clone(),
            ..Self::new(self.period_type, self.user_intended_duration_ms)
        }
    }

    /// Set elapsed time and keep `remaining_ms` consistent.
    pub fn set_elapsed(&mut self, elapsed_ms: u64) {
        self.elapsed_ms = elapsed_ms;
        self.sync_remaining();
    }

    pub fn sync_remaining(&mut self) {
        self.remaining_ms = self.duration_ms.saturating_sub(self.elapsed_ms);
    }
}

/// Template entry a session is built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodTemplate {
    pub period_type: PeriodType,
    pub minutes: u64,
    #[serde(default)]
    pub note: Option<String>,
}

impl PeriodTemplate {
    pub fn new(period_type: PeriodType, minutes: u64) -> Self {
        Self {
            period_type,
            minutes,
            note: None,
        }
    }

    pub fn to_period(&self) -> Period {
        Period {
            note: self.note.clone(),
            ..Period::new(self.period_type, self.minutes.saturating_mul(MINUTE_MS))
        }
    }

    /// The default day: three work blocks with breaks, then some fun.
    pub fn default_list() -> Vec<PeriodTemplate> {
        vec![
            PeriodTemplate::new(PeriodType::Work, 48),
            PeriodTemplate::new(PeriodType::Break, 12),
            PeriodTemplate::new(PeriodType::Work, 48),
            PeriodTemplate::new(PeriodType::Break, 12),
            PeriodTemplate::new(PeriodType::Work, 48),
            PeriodTemplate::new(PeriodType::Fun, 24),
        ]
    }
}
