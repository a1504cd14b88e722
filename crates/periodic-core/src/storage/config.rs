//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Tick rate of the foreground loop
//! - Notification catalog and window tolerance
//! - Where notification sounds live and how loud they play
//! - Durations for periods inserted at runtime
//! - The period template a fresh session starts from
//!
//! Configuration is stored at `<data_dir>/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::{ConfigError, Result};
use crate::event_log::DEFAULT_CAPACITY;
use crate::notify::{NotificationCatalog, NotificationScheduler, DEFAULT_WINDOW_MS};
use crate::timer::{NewPeriodDefaults, PeriodTemplate};

/// Foreground loop settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

/// Notification configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Tolerance around each window's target.
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
    #[serde(flatten)]
    pub catalog: NotificationCatalog,
}

/// How notification sounds are played.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// 0.0 (silent) to 1.0 (full).
    #[serde(default = "default_volume")]
    pub volume: f32,
    /// Directory with one file per notification key. Defaults to
    /// `<data_dir>/sounds`.
    #[serde(default)]
    pub sound_dir: Option<String>,
    #[serde(default = "default_extension")]
    pub extension: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data_dir>/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_event_log_capacity")]
    pub event_log_capacity: usize,
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    /// Durations for periods added while a session runs.
    #[serde(default)]
    pub defaults: NewPeriodDefaults,
    #[serde(default = "PeriodTemplate::default_list")]
    pub template: Vec<PeriodTemplate>,
}

// Default functions
fn default_tick_interval_ms() -> u64 {
    1_000
}
fn default_true() -> bool {
    true
}
fn default_window_ms() -> u64 {
    DEFAULT_WINDOW_MS
}
fn default_volume() -> f32 {
    1.0
}
fn default_extension() -> String {
    "ogg".into()
}
fn default_event_log_capacity() -> usize {
    DEFAULT_CAPACITY
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_ms: default_window_ms(),
            catalog: NotificationCatalog::default(),
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            volume: default_volume(),
            sound_dir: None,
            extension: default_extension(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            event_log_capacity: default_event_log_capacity(),
            timer: TimerConfig::default(),
            notifications: NotificationsConfig::default(),
            player: PlayerConfig::default(),
            defaults: NewPeriodDefaults::default(),
            template: PeriodTemplate::default_list(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => match value.parse::<u64>() {
                        Ok(n) => serde_json::Value::Number(n.into()),
                        Err(_) => value
                            .parse::<f64>()
                            .ok()
                            .filter(|f| *f >= 0.0)
                            .and_then(serde_json::Number::from_f64)
                            .map(serde_json::Value::Number)
                            .ok_or_else(|| {
                                invalid(format!("cannot parse '{value}' as number"))
                            })?,
                    },
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    pub fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or write and return the default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(ConfigError::from)?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(_) => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
        }
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to default configuration");
            Self::default()
        })
    }

    /// Persist to disk.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        std::fs::write(path, content).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Reject values the timer cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timer.tick_interval_ms < 100 {
            return Err(ConfigError::InvalidValue {
                key: "timer.tick_interval_ms".into(),
                message: "must be at least 100".into(),
            });
        }
        if !(0.0..=1.0).contains(&self.player.volume) {
            return Err(ConfigError::InvalidValue {
                key: "player.volume".into(),
                message: "must be between 0.0 and 1.0".into(),
            });
        }
        if self.template.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "template".into(),
                message: "needs at least one period".into(),
            });
        }
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a value by dot-separated key without saving.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and save. Returns error if key is unknown.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.apply(key, value)?;
        self.save()
    }

    pub fn scheduler(&self) -> NotificationScheduler {
        NotificationScheduler::new(
            self.notifications.catalog.clone(),
            self.notifications.window_ms,
        )
    }

    pub fn sound_dir(&self) -> Result<PathBuf> {
        match &self.player.sound_dir {
            Some(dir) => Ok(PathBuf::from(dir)),
            None => Ok(data_dir()?.join("sounds")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::PeriodType;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn empty_file_gives_defaults() {
        let parsed: Config = toml::from_str("").unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn partial_template_is_read() {
        let parsed: Config = toml::from_str(
            r#"
            [notifications]
            remaining = [5, 10]

            [[template]]
            period_type = "work"
            minutes = 25

            [[template]]
            period_type = "break"
            minutes = 5
            note = "stretch"
            "#,
        )
        .unwrap();
        assert_eq!(parsed.template.len(), 2);
        assert_eq!(parsed.template[1].period_type, PeriodType::Break);
        assert_eq!(parsed.template[1].note.as_deref(), Some("stretch"));
        assert_eq!(parsed.notifications.catalog.remaining, vec![5, 10]);
        assert_eq!(
            parsed.notifications.catalog.elapsed,
            NotificationCatalog::default().elapsed
        );
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("notifications.window_ms").as_deref(), Some("2000"));
        assert_eq!(cfg.get("notifications.enabled").as_deref(), Some("true"));
        assert_eq!(cfg.get("player.extension").as_deref(), Some("ogg"));
        assert!(cfg.get("notifications.missing_key").is_none());
    }

    #[test]
    fn apply_updates_nested_values() {
        let mut cfg = Config::default();
        cfg.apply("notifications.enabled", "false").unwrap();
        cfg.apply("notifications.window_ms", "3000").unwrap();
        cfg.apply("notifications.remaining", "[5, 10]").unwrap();
        cfg.apply("player.volume", "0.25").unwrap();
        cfg.apply("player.sound_dir", "/tmp/sounds").unwrap();
        assert!(!cfg.notifications.enabled);
        assert_eq!(cfg.notifications.window_ms, 3_000);
        assert_eq!(cfg.notifications.catalog.remaining, vec![5, 10]);
        assert_eq!(cfg.player.volume, 0.25);
        assert_eq!(cfg.player.sound_dir.as_deref(), Some("/tmp/sounds"));
    }

    #[test]
    fn apply_rejects_unknown_key() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.apply("ui.dark_mode", "true"),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn apply_rejects_invalid_type() {
        let mut cfg = Config::default();
        assert!(cfg.apply("notifications.enabled", "not_a_bool").is_err());
        assert!(cfg.apply("notifications.window_ms", "-5").is_err());
        assert!(cfg.notifications.enabled);
    }

    #[test]
    fn apply_rejects_invalid_values() {
        let mut cfg = Config::default();
        assert!(cfg.apply("timer.tick_interval_ms", "10").is_err());
        assert!(cfg.apply("template", "[]").is_err());
        assert!(cfg.apply("player.volume", "1.5").is_err());
        assert_eq!(cfg.timer.tick_interval_ms, 1_000);
    }

    #[test]
    fn load_from_writes_default_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());
        assert_eq!(Config::load_from(&path).unwrap(), cfg);
    }

    #[test]
    fn scheduler_uses_configured_window() {
        let mut cfg = Config::default();
        cfg.notifications.window_ms = 5_000;
        assert_eq!(cfg.scheduler().window_ms(), 5_000);
    }
}
