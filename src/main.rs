use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use epictree::error::render_chain;
use epictree::{init_logging, load_prior, AppConfig, ForestOrigin, LogFormat, LoggingConfig};
use epictree_snapshot::FileSnapshotStore;

// CLI Arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "Rebuild the epic / feature / story hierarchy and snapshot it", long_about = None)]
struct Cli {
    /// Reuse the existing snapshot instead of querying the backend
    #[arg(short, long)]
    input: bool,

    /// Snapshot file, overrides SNAPSHOT_PATH
    #[arg(long, value_name = "PATH")]
    snapshot: Option<PathBuf>,

    /// Log output format, overrides LOG_FORMAT
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    match try_main(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", render_chain(e.as_ref()));
            ExitCode::FAILURE
        }
    }
}

async fn try_main(cli: Cli) -> Result<()> {
    let mut logging = LoggingConfig::load();
    if let Some(format) = cli.log_format {
        logging.format = format;
    }
    init_logging(&logging).context("Failed to initialize logging")?;

    let mut config = AppConfig::load().context("Failed to load configuration")?;
    if let Some(path) = cli.snapshot {
        config.snapshot_path = path;
    }

    let prior = if cli.input {
        let store = FileSnapshotStore::new(&config.snapshot_path);
        load_prior(&store, &store.handle())
            .await
            .context("Failed to read snapshot")?
    } else {
        None
    };

    let report = epictree::run(&config, prior).await?;

    match report.origin {
        ForestOrigin::Snapshot => println!(
            "Loaded {} work items from {}",
            report.forest.len(),
            config.snapshot_path.display()
        ),
        ForestOrigin::Backend => println!(
            "Assembled {} work items ({} warnings), saved to {}",
            report.forest.len(),
            report.warnings.len(),
            config.snapshot_path.display()
        ),
    }
    Ok(())
}
