// console report for a finished scan

use crate::results::{ModuleStats, Results};
use console::style;

/// percent of the baseline templates already removed, clamped to 0..=100
pub fn migration_progress(remaining_templates: u64, baseline: u64) -> f64 {
    if baseline == 0 {
        return 0.0;
    }
    let progress = (1.0 - remaining_templates as f64 / baseline as f64) * 100.0;
    progress.clamp(0.0, 100.0)
}

/// share of react files within one module
pub fn module_progress(stats: &ModuleStats) -> f64 {
    let total = stats.legacy_files + stats.modern_files;
    if total == 0 {
        0.0
    } else {
        stats.modern_files as f64 / total as f64 * 100.0
    }
}

/// breakdown entries, most legacy files first
pub fn sorted_breakdown(results: &Results) -> Vec<(&String, &ModuleStats)> {
    let mut entries: Vec<_> = results.breakdown().iter().collect();
    entries.sort_by(|a, b| b.1.legacy_files.cmp(&a.1.legacy_files).then_with(|| a.0.cmp(b.0)));
    entries
}

/// print the summary block the way the dashboard headline reads
pub fn print_summary(results: &Results, baseline: u64) {
    let summary = &results.summary;
    let remaining = summary.legacy_templates;

    println!("{}\n", style("analysis complete!").green().bold());
    println!("{}", style("=== summary ===").cyan().bold());
    println!(
        "total angularjs templates: {} / {} (baseline)",
        style(remaining).yellow(),
        baseline
    );
    println!("total angularjs files: {}", summary.legacy_files);
    println!("total react files: {}", style(summary.modern_files).green());
    println!(
        "\nmigration progress: {}% complete ({} angularjs templates remaining)",
        style(format!("{:.1}", migration_progress(remaining, baseline))).bold(),
        remaining
    );

    let heading = if results.by_directory.is_some() {
        "=== directory breakdown ==="
    } else {
        "=== module breakdown ==="
    };
    println!("\n{}", style(heading).cyan().bold());
    for (key, stats) in sorted_breakdown(results) {
        println!(
            "  {}: {} angularjs, {} react ({:.1}% migrated)",
            key,
            stats.legacy_files,
            stats.modern_files,
            module_progress(stats)
        );
    }

    if let Some(files) = results.most_changed_html_files.as_ref().filter(|f| !f.is_empty()) {
        println!("\n{}", style("=== most changed templates ===").cyan().bold());
        for file in files {
            println!("  {:>4}  {}", file.commit_count, file.path);
        }
    }
}
