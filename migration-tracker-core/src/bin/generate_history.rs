// history generator binary - samples the repository's past and writes history.json
use anyhow::Result;
use clap::Parser;
use migration_tracker_core::{Config, run_history, style};
use std::path::PathBuf;
use std::process::exit;

#[derive(Parser)]
#[command(name = "generate-history")]
#[command(about = "sample git history to build the migration time series", long_about = None)]
struct HistoryArgs {
    /// path to the git repository (defaults to the configured repository path)
    repo_path: Option<PathBuf>,

    /// sample every n days
    interval_days: Option<u32>,

    /// where to write the history json
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// path to a toml config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn run(args: HistoryArgs) -> Result<()> {
    let config = Config::load(args.config.as_deref())?;
    let repo_path = args
        .repo_path
        .unwrap_or_else(|| config.history.default_repo_path.clone());
    let output = args.output.unwrap_or_else(|| config.history.output.clone());

    run_history(&repo_path, args.interval_days, &output, &config)?;
    Ok(())
}

/// entrypoint – parse args then run
fn main() {
    let args = HistoryArgs::parse();
    if let Err(e) = run(args) {
        eprintln!("{} {:#}", style("❌ generate-history failed:").red().bold(), e);
        eprintln!(
            "\n{}",
            style("usage: generate-history [repo-path] [sample-interval-days]").dim()
        );
        exit(1);
    }
}
