// history module - samples past commits and records template / react counts over time

use crate::config::{Config, HistoryConfig, ScanConfig};
use crate::git::{self, CommitInfo};
use crate::results::{Aggregator, FileRetention, GroupBy, Source};
use crate::scanner::analyze_local;
use crate::utils::{format_date, short_id, spinner};
use anyhow::{Context, Result, bail};
use chrono::{DateTime, Duration, FixedOffset, Months, SecondsFormat, Utc};
use console::style;
use git2::Repository;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const HISTORY_VERSION: &str = "1.0";

/// counts at one sampled commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySnapshot {
    pub timestamp: String,
    /// angularjs templates remaining
    pub legacy_count: u64,
    /// react files present
    pub modern_count: u64,
}

impl HistorySnapshot {
    pub fn time(&self) -> Result<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .with_context(|| format!("invalid snapshot timestamp {}", self.timestamp))
    }
}

/// the history file consumed by the dashboard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryData {
    pub version: String,
    pub generated: String,
    pub baseline: u64,
    #[serde(default)]
    pub snapshots: Vec<HistorySnapshot>,
}

impl HistoryData {
    pub fn new(baseline: u64, snapshots: Vec<HistorySnapshot>) -> Self {
        HistoryData {
            version: HISTORY_VERSION.to_string(),
            generated: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            baseline,
            snapshots,
        }
    }
}

fn read_history(path: &Path) -> Result<Vec<HistorySnapshot>> {
    let content = fs::read_to_string(path)?;
    let data: HistoryData = serde_json::from_str(&content)?;

    // later samples resume from the last timestamp, so it has to be readable and ordered
    let mut previous: Option<DateTime<FixedOffset>> = None;
    for snapshot in &data.snapshots {
        let time = snapshot.time()?;
        if previous.is_some_and(|prev| time < prev) {
            bail!("snapshots are not ordered by timestamp at {}", snapshot.timestamp);
        }
        previous = Some(time);
    }
    Ok(data.snapshots)
}

/// existing snapshots, or none when the file is missing or unreadable
pub fn load_history(path: &Path) -> Vec<HistorySnapshot> {
    if !path.exists() {
        return Vec::new();
    }
    match read_history(path) {
        Ok(snapshots) => {
            println!(
                "found existing history file with {} snapshots\n",
                snapshots.len()
            );
            snapshots
        }
        Err(e) => {
            eprintln!(
                "{} {:#}\n",
                style("⚠️  could not read existing history, starting fresh:").yellow(),
                e
            );
            Vec::new()
        }
    }
}

pub fn save_history(path: &Path, data: &HistoryData) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(data).context("failed to serialise history")?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

/// sampling policy: take the first commit, then any commit at least `interval_days` after the last
/// successfully sampled one; a failed analysis neither samples nor moves the window
pub fn sample_commits<F>(
    commits: &[CommitInfo],
    interval_days: u32,
    mut last_sampled: Option<DateTime<FixedOffset>>,
    mut analyze: F,
) -> Vec<HistorySnapshot>
where
    F: FnMut(&CommitInfo) -> Option<HistorySnapshot>,
{
    let interval = Duration::days(i64::from(interval_days));
    let mut snapshots = Vec::new();

    for commit in commits {
        let due = last_sampled.is_none_or(|last| commit.time - last >= interval);
        if !due {
            continue;
        }
        if let Some(snapshot) = analyze(commit) {
            snapshots.push(snapshot);
            last_sampled = Some(commit.time);
        }
    }
    snapshots
}

/// check out one commit and scan its source directory with a fresh aggregator
fn analyze_commit(
    repo: &Repository,
    commit: &CommitInfo,
    source_dir: &str,
    scan: &ScanConfig,
) -> Option<HistorySnapshot> {
    let short = short_id(&commit.id);
    println!(
        "analysing commit {} ({})...",
        style(short).cyan(),
        format_date(&commit.time)
    );

    let Some(workdir) = repo.workdir() else {
        eprintln!(
            "  {}",
            style(format!("⚠️  failed to analyse commit {short}: repository has no working tree"))
                .yellow()
        );
        return None;
    };

    if let Err(e) = git::checkout_commit(repo, &commit.id) {
        eprintln!("  {} {:#}", style(format!("⚠️  failed to analyse commit {short}:")).yellow(), e);
        return None;
    }

    let app_path = workdir.join(source_dir);
    if !app_path.is_dir() {
        eprintln!(
            "  {}",
            style(format!("⚠️  {source_dir} directory not found at commit {short}")).yellow()
        );
        return None;
    }

    let mut aggregator = Aggregator::new(Source::Local, GroupBy::Module, FileRetention::None);
    if let Err(e) = analyze_local(&app_path, &mut aggregator, scan, false) {
        eprintln!("  {} {:#}", style(format!("⚠️  failed to analyse commit {short}:")).yellow(), e);
        return None;
    }

    let summary = aggregator.summary();
    let snapshot = HistorySnapshot {
        timestamp: commit.time.to_rfc3339(),
        legacy_count: summary.legacy_templates,
        modern_count: summary.modern_files,
    };
    println!(
        "  {} {} angularjs templates, {} react files",
        style("✓").green(),
        snapshot.legacy_count,
        snapshot.modern_count
    );
    Some(snapshot)
}

/// extend `existing` with samples taken from the repository's history
pub fn generate_history(
    repo_path: &Path,
    history: &HistoryConfig,
    scan: &ScanConfig,
    existing: Vec<HistorySnapshot>,
) -> Result<Vec<HistorySnapshot>> {
    let repo = Repository::open(repo_path)
        .with_context(|| format!("failed to open git repository at {}", repo_path.display()))?;
    if repo.workdir().is_none() {
        bail!("{} is a bare repository", repo_path.display());
    }

    let last_sampled = existing.last().map(HistorySnapshot::time).transpose()?;
    let since = match last_sampled {
        Some(last) => {
            println!("incremental update: {} existing snapshots\n", existing.len());
            last
        }
        None => {
            println!(
                "full analysis: sampling every {} days (last {} years)...\n",
                history.sample_interval_days, history.lookback_years
            );
            DateTime::<FixedOffset>::from(Utc::now())
                .checked_sub_months(Months::new(history.lookback_years.saturating_mul(12)))
                .context("lookback window is out of range")?
        }
    };

    let spinner = spinner("listing commits...");
    let commits = git::list_commits(&repo, since, &history.source_dir);
    spinner.finish_and_clear();
    let mut commits = commits?;

    // resume strictly after the last existing sample
    if let Some(last) = last_sampled {
        commits.retain(|commit| commit.time > last);
    }
    println!(
        "found {} commits since {}\n",
        commits.len(),
        format_date(&since)
    );

    let new_snapshots = git::with_restored_head(&repo, |repo| {
        Ok(sample_commits(
            &commits,
            history.sample_interval_days,
            last_sampled,
            |commit| analyze_commit(repo, commit, &history.source_dir, scan),
        ))
    })?;

    println!(
        "\n{} added {} new snapshots (total: {})\n",
        style("✓").green(),
        new_snapshots.len(),
        existing.len() + new_snapshots.len()
    );

    let mut snapshots = existing;
    snapshots.extend(new_snapshots);
    Ok(snapshots)
}

/// the whole generate-history flow: load, sample, write
pub fn run_history(
    repo_path: &Path,
    interval_days: Option<u32>,
    output: &Path,
    config: &Config,
) -> Result<HistoryData> {
    let mut history = config.history.clone();
    if let Some(days) = interval_days {
        history.sample_interval_days = days;
    }

    println!("repository path: {}", repo_path.display());
    println!("sample interval: {} days\n", history.sample_interval_days);

    if !repo_path.exists() {
        bail!("repository not found at: {}", repo_path.display());
    }

    let existing = load_history(output);
    let snapshots = generate_history(repo_path, &history, &config.scan, existing)?;
    let (Some(first), Some(last)) = (snapshots.first(), snapshots.last()) else {
        bail!("no historical data found");
    };

    let data = HistoryData::new(config.report.baseline, snapshots.clone());
    save_history(output, &data)?;

    println!(
        "{} {}",
        style("✓ history data saved to:").green(),
        output.display()
    );
    println!("  total snapshots: {}", snapshots.len());
    println!(
        "  date range: {} - {}",
        first.time().map(|t| format_date(&t))?,
        last.time().map(|t| format_date(&t))?
    );
    println!("  current: {} angularjs templates remaining", last.legacy_count);
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit(id: &str, timestamp: &str) -> CommitInfo {
        CommitInfo {
            id: id.to_string(),
            time: DateTime::parse_from_rfc3339(timestamp).unwrap(),
        }
    }

    fn snapshot_for(commit: &CommitInfo) -> Option<HistorySnapshot> {
        Some(HistorySnapshot {
            timestamp: commit.time.to_rfc3339(),
            legacy_count: 1,
            modern_count: 1,
        })
    }

    #[test]
    fn bare_repository_sample_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init_bare(dir.path()).unwrap();
        let target = commit(
            "0123456789012345678901234567890123456789",
            "2024-01-01T00:00:00Z",
        );

        assert!(analyze_commit(&repo, &target, "app", &ScanConfig::default()).is_none());
    }

    #[test]
    fn samples_relative_to_last_existing_sample() {
        let last = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap();
        let commits = vec![
            commit("a", "2024-01-05T00:00:00Z"),
            commit("b", "2024-01-09T00:00:00Z"),
        ];
        let sampled = sample_commits(&commits, 7, Some(last), snapshot_for);

        assert_eq!(sampled.len(), 1);
        assert_eq!(sampled[0].time().unwrap(), commits[1].time);
    }

    #[test]
    fn interval_counts_from_last_sampled_commit_not_last_seen() {
        let commits = vec![
            commit("a", "2024-01-01T00:00:00Z"),
            commit("b", "2024-01-04T00:00:00Z"),
            commit("c", "2024-01-07T00:00:00Z"),
            commit("d", "2024-01-08T00:00:00Z"),
            commit("e", "2024-01-14T00:00:00Z"),
            commit("f", "2024-01-15T00:00:00Z"),
        ];
        let ids: Vec<String> = {
            let mut seen = Vec::new();
            sample_commits(&commits, 7, None, |c| {
                seen.push(c.id.clone());
                snapshot_for(c)
            });
            seen
        };
        assert_eq!(ids, vec!["a", "d", "f"]);
    }

    #[test]
    fn failed_analysis_does_not_reset_the_window() {
        let commits = vec![
            commit("a", "2024-01-01T00:00:00Z"),
            commit("broken", "2024-01-08T00:00:00Z"),
            commit("c", "2024-01-09T00:00:00Z"),
            commit("d", "2024-01-10T00:00:00Z"),
        ];
        let sampled = sample_commits(&commits, 7, None, |c| {
            if c.id == "broken" { None } else { snapshot_for(c) }
        });
        let times: Vec<_> = sampled.iter().map(|s| s.time().unwrap()).collect();
        assert_eq!(times, vec![commits[0].time, commits[2].time]);
    }

    #[test]
    fn empty_commit_list_yields_nothing() {
        assert!(sample_commits(&[], 7, None, snapshot_for).is_empty());
    }

    #[test]
    fn malformed_history_file_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(load_history(&path).is_empty());

        fs::write(
            &path,
            r#"{"version":"1.0","generated":"x","baseline":391,"snapshots":[{"timestamp":"yesterday","legacyCount":1,"modernCount":2}]}"#,
        )
        .unwrap();
        assert!(load_history(&path).is_empty());

        assert!(load_history(&dir.path().join("missing.json")).is_empty());
    }

    #[test]
    fn history_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("public").join("history.json");
        let data = HistoryData::new(
            391,
            vec![HistorySnapshot {
                timestamp: "2024-01-09T10:00:00+01:00".to_string(),
                legacy_count: 300,
                modern_count: 120,
            }],
        );
        save_history(&path, &data).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["version"], "1.0");
        assert_eq!(json["baseline"], 391);
        assert_eq!(json["snapshots"][0]["legacyCount"], 300);
        assert_eq!(load_history(&path), data.snapshots);
    }
}
