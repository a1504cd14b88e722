use clap::Subcommand;
use periodic_core::timer::MINUTE_MS;
use periodic_core::{Config, PeriodType};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Config key (e.g. "notifications.window_ms", "player.volume")
        key: String,
    },
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// New value; lists are given as JSON, e.g. "[1, 5, 10]"
        value: String,
    },
    /// List all config values
    List,
    /// Reset config to defaults
    Reset,
    /// Print the config file location
    Path,
    /// Check the config file without touching it
    Validate,
    /// Show the notification windows a period would get
    Windows {
        /// Intended duration in minutes
        #[arg(long, default_value_t = 48)]
        minutes: u64,
        /// Period type (work, break, fun)
        #[arg(long = "type", default_value = "work")]
        period_type: PeriodType,
        /// Type of the following period
        #[arg(long)]
        next: Option<PeriodType>,
    },
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            match config.get(&key) {
                Some(value) => println!("{value}"),
                None => {
                    eprintln!("unknown key: {key}");
                    std::process::exit(1);
                }
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            println!("ok");
        }
        ConfigAction::List => {
            let config = Config::load()?;
            let json = serde_json::to_string_pretty(&config)?;
            println!("{json}");
        }
        ConfigAction::Reset => {
            let config = Config::default();
            config.save()?;
            println!("config reset to defaults");
        }
        ConfigAction::Path => {
            println!("{}", Config::path()?.display());
        }
        ConfigAction::Validate => {
            let path = Config::path()?;
            if !path.exists() {
                println!("{} does not exist, defaults apply", path.display());
                return Ok(());
            }
            let config = Config::load_from(&path)?;
            println!("ok ({} template periods)", config.template.len());
        }
        ConfigAction::Windows {
            minutes,
            period_type,
            next,
        } => {
            let config = Config::load()?;
            let catalog = &config.notifications.catalog;
            let duration_ms = minutes.saturating_mul(MINUTE_MS);
            let mut windows = catalog.windows(duration_ms, period_type, next);
            windows.sort_by_key(|w| (w.target_ms, std::cmp::Reverse(w.priority())));
            let listed: Vec<_> = windows
                .iter()
                .map(|w| {
                    serde_json::json!({
                        "key": w.key(),
                        "target_ms": w.target_ms,
                        "priority": w.priority(),
                        "in_phase": w.fits_phase(catalog.phase_threshold(duration_ms)),
                    })
                })
                .collect();
            let out = serde_json::json!({
                "duration_ms": duration_ms,
                "threshold_ms": catalog.phase_threshold(duration_ms),
                "windows": listed,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }
    Ok(())
}
