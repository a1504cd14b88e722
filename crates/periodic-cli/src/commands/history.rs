use clap::Subcommand;
use periodic_core::Database;

#[derive(Subcommand)]
pub enum HistoryAction {
    /// Most recent completed periods
    List {
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Totals per period type
    Stats,
}

pub fn run(action: HistoryAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        HistoryAction::List { limit } => {
            let records = db.history(limit)?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        HistoryAction::Stats => {
            let stats = db.stats()?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }
    Ok(())
}
