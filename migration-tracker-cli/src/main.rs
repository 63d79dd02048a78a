use clap::Parser;
use migration_tracker_core::{ScanArgs, execute_scan_flow, style};

#[tokio::main]
async fn main() {
    let args = ScanArgs::parse();
    match execute_scan_flow(args).await {
        Ok(results) => {
            println!(
                "\n{} {} templates, {} react files",
                style("✨ scan complete:").green().bold(),
                results.summary.legacy_templates,
                results.summary.modern_files
            );
        }
        Err(e) => {
            eprintln!(
                "{} {} {}",
                style("❌"),
                style("migration-tracker failed:").red().bold(),
                style(format!("{e:#}")).red()
            );
            std::process::exit(1);
        }
    }
}
