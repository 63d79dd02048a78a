// migration-tracker-core/src/lib.rs

// declare modules
pub mod analyzer;
pub mod config;
pub mod git;
pub mod history;
pub mod patterns;
pub mod report;
pub mod results;
pub mod scanner;
pub mod utils;

// re-export key structs/functions for external use by other crates
pub use anyhow::{Context, Result};
pub use clap::Parser;
pub use console::style;

pub use crate::analyzer::{Classification, FileAnalysis, classify_file};
pub use crate::config::Config;
pub use crate::history::{HistoryData, HistorySnapshot, run_history};
pub use crate::patterns::{LegacyRule, PATTERNS, PatternSet};
pub use crate::results::{Aggregator, FileRetention, GroupBy, Results, Source, Summary};

use std::env;
use std::path::PathBuf;

// argument parsing struct shared by the cli crate
#[derive(Parser, Debug, Clone)]
#[command(name = "migration-tracker")]
#[command(about = "count angularjs vs react code to track migration progress", long_about = None)]
pub struct ScanArgs {
    /// where to read the source tree from
    #[arg(value_enum, default_value = "local")]
    pub source: Source,

    /// local app directory to scan (overrides the configured default)
    pub path: Option<PathBuf>,

    /// path to a toml config file (defaults to ./migration-tracker.toml when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// where to write the results json
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// bucket counts by module or by full directory
    #[arg(short, long, value_enum)]
    pub group_by: Option<GroupBy>,

    /// which files to keep in the per-file detail list
    #[arg(short, long, value_enum)]
    pub files: Option<FileRetention>,

    /// number of most changed templates to report (0 disables the git lookup)
    #[arg(short = 'm', long)]
    pub most_changed_limit: Option<usize>,

    /// print every legacy file as it is classified
    #[arg(short, long)]
    pub verbose: bool,
}

/// run one scan end to end: configure, scan, summarise, write results
pub async fn execute_scan_flow(args: ScanArgs) -> Result<Results> {
    dotenv::dotenv().ok();

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(group_by) = args.group_by {
        config.scan.group_by = group_by;
    }
    if let Some(files) = args.files {
        config.scan.retain_files = files;
    }
    if let Some(limit) = args.most_changed_limit {
        config.report.most_changed_limit = limit;
    }

    println!("{}", style("\nangularjs migration tracker").cyan().bold());
    println!("{}\n", style("============================").dim());

    let mut aggregator = Aggregator::new(args.source, config.scan.group_by, config.scan.retain_files);
    let mut most_changed = None;

    match args.source {
        Source::Github => {
            let token = env::var("GITHUB_TOKEN").ok();
            scanner::analyze_github_repo(
                &config.github,
                &config.scan,
                token,
                &mut aggregator,
                args.verbose,
            )
            .await?;
        }
        Source::Local => {
            let app_path = args
                .path
                .clone()
                .unwrap_or_else(|| config.scan.default_local_path.clone());
            println!("scanning local directory: {}\n", app_path.display());
            scanner::analyze_local(&app_path, &mut aggregator, &config.scan, args.verbose)?;

            if config.report.most_changed_limit > 0 {
                most_changed = Some(git::most_changed_templates(
                    &app_path,
                    config.report.most_changed_limit,
                ));
            }
        }
    }

    let mut results = aggregator.finalize();
    results.most_changed_html_files = most_changed;

    report::print_summary(&results, config.report.baseline);

    let output = args.output.unwrap_or(config.report.output);
    crate::results::save_results(&results, &output)?;

    Ok(results)
}
