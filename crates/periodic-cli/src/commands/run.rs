use std::time::Duration;

use clap::Args;
use periodic_core::{
    AudioPlayer, Command, Config, Database, NullPlayer, RodioPlayer, Runtime, SystemClock,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

#[derive(Args)]
pub struct RunArgs {
    /// Decide notifications but do not play anything
    #[arg(long)]
    pub silent: bool,
    /// Start the session right away if it is idle
    #[arg(long)]
    pub start: bool,
}

const HELP: &str = "commands: start pause resume toggle|p reset next|n prev move-back finish \
                    type note [text] add [index] remove [index] duration <±min> elapsed <±min> \
                    status log quit";

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let player: Box<dyn AudioPlayer> = if args.silent || !config.notifications.enabled {
        Box::new(NullPlayer)
    } else {
        Box::new(RodioPlayer::new(
            config.sound_dir()?,
            config.player.extension.clone(),
            config.player.volume,
        ))
    };
    let db = Database::open()?;
    let mut runtime = Runtime::new(&config, SystemClock, Box::new(db), player)?;
    if args.start {
        runtime.apply(Command::Start)?;
    }

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    rt.block_on(event_loop(&mut runtime, config.timer.tick_interval_ms))
}

async fn event_loop(
    runtime: &mut Runtime<SystemClock>,
    tick_interval_ms: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut interval = tokio::time::interval(Duration::from_millis(tick_interval_ms));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    eprintln!("{HELP}");
    info!(tick_interval_ms, "timer loop started");

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Some(window) = runtime.tick() {
                    println!("{}", serde_json::json!({ "notification": window.key() }));
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match line.trim() {
                    "" => continue,
                    "quit" | "q" => break,
                    "status" | "s" => {
                        println!("{}", serde_json::to_string(&runtime.snapshot())?);
                        continue;
                    }
                    "log" => {
                        for entry in runtime.log().entries() {
                            println!("{}", serde_json::to_string(entry)?);
                        }
                        continue;
                    }
                    "help" | "?" => {
                        eprintln!("{HELP}");
                        continue;
                    }
                    _ => {}
                }
                match line.parse::<Command>() {
                    Ok(command) => match runtime.apply(command) {
                        Ok(Some(event)) => println!("{}", serde_json::to_string(&event)?),
                        Ok(None) => eprintln!("nothing to do in the current state"),
                        Err(e) => warn!(error = %e, "command failed"),
                    },
                    Err(e) => eprintln!("{e}"),
                }
            }
        }
    }

    info!("timer loop stopped");
    Ok(())
}
