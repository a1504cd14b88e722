use clap::Subcommand;
use periodic_core::timer::MINUTE_MS;
use periodic_core::{Command, Config};
use serde_json::json;

use super::open_runtime;

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start the first period
    Start,
    /// Pause the running period
    Pause,
    /// Resume a paused period
    Resume,
    /// Pause when running, resume when paused
    Toggle,
    /// Back to a fresh idle session from the template
    Reset,
    /// Close the current period and move to the next one
    Next,
    /// Go back to the previous period
    Prev,
    /// Hand the current elapsed time to the previous period
    MoveBack,
    /// End the session
    Finish,
    /// Cycle the current period's type (work, break, fun)
    Type,
    /// Set or clear the current period's note
    Note {
        /// Note text; omit to clear
        text: Option<String>,
    },
    /// Add a period after the current one, or at a given index
    Add {
        #[arg(long)]
        at: Option<usize>,
    },
    /// Remove the current period, or the one at a given index
    Remove {
        #[arg(long)]
        at: Option<usize>,
    },
    /// Lengthen or shorten the current period by signed minutes
    Duration {
        #[arg(allow_hyphen_values = true)]
        minutes: i64,
    },
    /// Move the current period's elapsed time by signed minutes
    Elapsed {
        #[arg(allow_hyphen_values = true)]
        minutes: i64,
    },
    /// Print current timer state as JSON
    Status,
}

impl TimerAction {
    fn command(self) -> Option<Command> {
        let command = match self {
            TimerAction::Start => Command::Start,
            TimerAction::Pause => Command::Pause,
            TimerAction::Resume => Command::Resume,
            TimerAction::Toggle => Command::TogglePause,
            TimerAction::Reset => Command::Reset,
            TimerAction::Next => Command::Next,
            TimerAction::Prev => Command::Previous,
            TimerAction::MoveBack => Command::MoveElapsedBack,
            TimerAction::Finish => Command::Finish,
            TimerAction::Type => Command::ChangeType,
            TimerAction::Note { text } => Command::SetNote(text),
            TimerAction::Add { at: Some(i) } => Command::AddPeriodAt(i),
            TimerAction::Add { at: None } => Command::AddPeriod,
            TimerAction::Remove { at: Some(i) } => Command::RemovePeriodAt(i),
            TimerAction::Remove { at: None } => Command::RemovePeriod,
            TimerAction::Duration { minutes } => {
                Command::AdjustDuration(minutes.saturating_mul(MINUTE_MS as i64))
            }
            TimerAction::Elapsed { minutes } => {
                Command::AdjustElapsed(minutes.saturating_mul(MINUTE_MS as i64))
            }
            TimerAction::Status => return None,
        };
        Some(command)
    }
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let mut runtime = open_runtime(&config)?;

    let Some(command) = action.command() else {
        println!("{}", serde_json::to_string_pretty(&runtime.snapshot())?);
        return Ok(());
    };

    // Catch up on any overrun since the last invocation before mutating.
    runtime.tick();
    let event = runtime.apply(command)?;
    if event.is_none() {
        eprintln!("nothing to do in the current state");
    }
    let output = json!({
        "event": event,
        "state": runtime.snapshot(),
        "periods": runtime.session().periods,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
