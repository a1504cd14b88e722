pub mod config;
pub mod history;
pub mod run;
pub mod timer;

use periodic_core::error::Result;
use periodic_core::{Config, Database, NullPlayer, Runtime, SystemClock};

/// Runtime backed by the on-disk database. One-shot commands never play
/// sounds, so they get a silent player.
pub fn open_runtime(config: &Config) -> Result<Runtime<SystemClock>> {
    let db = Database::open()?;
    Runtime::new(config, SystemClock, Box::new(db), Box::new(NullPlayer))
}
