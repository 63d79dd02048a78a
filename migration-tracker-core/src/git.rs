use crate::results::HtmlFileChange;
use crate::utils::{short_id, spinner};
use anyhow::{Context, Result, bail};
use chrono::{DateTime, FixedOffset, TimeZone};
use console::style;
use git2::build::CheckoutBuilder;
use git2::{Commit, Oid, Repository, StatusOptions};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

/// a commit eligible for history sampling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    pub id: String,
    pub time: DateTime<FixedOffset>,
}

/// where HEAD pointed before we started checking out old revisions
#[derive(Debug, Clone)]
enum OriginalHead {
    Branch(String),
    Detached(Oid),
}

impl fmt::Display for OriginalHead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OriginalHead::Branch(name) => {
                write!(f, "{}", name.strip_prefix("refs/heads/").unwrap_or(name))
            }
            OriginalHead::Detached(oid) => write!(f, "{}", short_id(&oid.to_string())),
        }
    }
}

/// author timestamp of a commit, keeping the author's utc offset
pub fn commit_time(commit: &Commit) -> Result<DateTime<FixedOffset>> {
    let when = commit.author().when();
    let offset = FixedOffset::east_opt(when.offset_minutes() * 60)
        .context("commit has an invalid utc offset")?;
    offset
        .timestamp_opt(when.seconds(), 0)
        .single()
        .context("commit has an invalid timestamp")
}

/// did this commit change anything below `path` compared to its first parent
fn touches_path(commit: &Commit, path: &Path) -> Result<bool> {
    let current = commit.tree()?.get_path(path).ok().map(|entry| entry.id());
    if commit.parent_count() == 0 {
        return Ok(current.is_some());
    }
    let previous = commit
        .parent(0)?
        .tree()?
        .get_path(path)
        .ok()
        .map(|entry| entry.id());
    Ok(current != previous)
}

/// non-merge commits from every ref that touch `source_dir`, authored at or after `since`, oldest first
pub fn list_commits(
    repo: &Repository,
    since: DateTime<FixedOffset>,
    source_dir: &str,
) -> Result<Vec<CommitInfo>> {
    let mut revwalk = repo.revwalk()?;
    revwalk.push_glob("*").context("failed to walk repository refs")?;
    if repo.head().is_ok() {
        revwalk.push_head()?;
    }

    let source_dir = Path::new(source_dir);
    let mut commits = Vec::new();
    for oid in revwalk {
        let commit = repo.find_commit(oid?)?;
        if commit.parent_count() > 1 {
            continue;
        }
        let time = commit_time(&commit)?;
        if time < since || !touches_path(&commit, source_dir)? {
            continue;
        }
        commits.push(CommitInfo {
            id: commit.id().to_string(),
            time,
        });
    }

    commits.sort_by_key(|commit| commit.time);
    Ok(commits)
}

/// force the working tree to a specific commit and detach HEAD there
pub fn checkout_commit(repo: &Repository, id: &str) -> Result<()> {
    let oid = Oid::from_str(id).with_context(|| format!("invalid commit id {id}"))?;
    let commit = repo.find_commit(oid)?;
    repo.checkout_tree(commit.as_object(), Some(CheckoutBuilder::new().force()))
        .with_context(|| format!("failed to check out {}", short_id(id)))?;
    repo.set_head_detached(oid)?;
    Ok(())
}

fn current_head(repo: &Repository) -> Result<OriginalHead> {
    let head = repo.head().context("repository has no HEAD")?;
    if head.is_branch() {
        let name = head.name().context("branch name is not valid utf-8")?;
        Ok(OriginalHead::Branch(name.to_string()))
    } else {
        Ok(OriginalHead::Detached(head.peel_to_commit()?.id()))
    }
}

fn restore_head(repo: &Repository, original: &OriginalHead) -> Result<()> {
    match original {
        OriginalHead::Branch(name) => {
            let commit = repo.find_reference(name)?.peel_to_commit()?;
            repo.checkout_tree(commit.as_object(), Some(CheckoutBuilder::new().force()))?;
            repo.set_head(name)?;
        }
        OriginalHead::Detached(oid) => checkout_commit(repo, &oid.to_string())?,
    }
    Ok(())
}

fn ensure_clean(repo: &Repository) -> Result<()> {
    let mut opts = StatusOptions::new();
    opts.include_untracked(false).include_ignored(false);
    let statuses = repo.statuses(Some(&mut opts))?;
    if !statuses.is_empty() {
        bail!(
            "working tree has {} uncommitted change(s); commit or stash them first",
            statuses.len()
        );
    }
    Ok(())
}

/// run `f` and put HEAD back where it was afterwards, whether `f` failed or not
pub fn with_restored_head<T>(
    repo: &Repository,
    f: impl FnOnce(&Repository) -> Result<T>,
) -> Result<T> {
    ensure_clean(repo)?;
    let original = current_head(repo)?;

    let result = f(repo);

    println!("\n{} {}", style("restoring:").cyan(), original);
    restore_head(repo, &original).with_context(|| format!("failed to restore {original}"))?;
    result
}

/// `prefix` is the scanned directory relative to the work tree, empty for the whole repository
fn count_template_changes(repo: &Repository, prefix: &str) -> Result<Vec<HtmlFileChange>> {
    let mut revwalk = repo.revwalk()?;
    revwalk.push_head()?;

    let mut counts: HashMap<String, usize> = HashMap::new();
    for oid in revwalk {
        let commit = repo.find_commit(oid?)?;
        if commit.parent_count() > 1 {
            continue;
        }
        let tree = commit.tree()?;
        let parent_tree = match commit.parent_count() {
            0 => None,
            _ => Some(commit.parent(0)?.tree()?),
        };
        let diff = repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)?;

        // a path counts once per commit
        let mut touched = HashSet::new();
        for delta in diff.deltas() {
            for file in [delta.old_file(), delta.new_file()] {
                if let Some(path) = file.path().and_then(|p| p.to_str()) {
                    if path.ends_with(".html") && is_under(path, prefix) {
                        touched.insert(path.to_string());
                    }
                }
            }
        }
        for path in touched {
            *counts.entry(path).or_insert(0) += 1;
        }
    }

    let mut changes: Vec<HtmlFileChange> = counts
        .into_iter()
        .map(|(path, commit_count)| HtmlFileChange { path, commit_count })
        .collect();
    changes.sort_by(|a, b| {
        b.commit_count
            .cmp(&a.commit_count)
            .then_with(|| a.path.cmp(&b.path))
    });
    Ok(changes)
}

fn is_under(path: &str, prefix: &str) -> bool {
    prefix.is_empty()
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// `dir` relative to the repository work tree, with `/` separators
fn workdir_prefix(repo: &Repository, dir: &Path) -> Result<String> {
    let workdir = repo.workdir().context("repository has no working tree")?;
    let workdir = workdir
        .canonicalize()
        .with_context(|| format!("failed to resolve {}", workdir.display()))?;
    let dir = dir
        .canonicalize()
        .with_context(|| format!("failed to resolve {}", dir.display()))?;
    let relative = dir
        .strip_prefix(&workdir)
        .with_context(|| format!("{} is outside the repository", dir.display()))?;

    let segments: Vec<&str> = relative
        .components()
        .filter_map(|c| c.as_os_str().to_str())
        .collect();
    Ok(segments.join("/"))
}

fn most_changed_in_repo(repo_dir: &Path, limit: usize) -> Result<Vec<HtmlFileChange>> {
    let repo = Repository::discover(repo_dir).context("failed to open git repository")?;
    let prefix = workdir_prefix(&repo, repo_dir)?;
    let head_tree = repo.head()?.peel_to_tree()?;

    let changes = count_template_changes(&repo, &prefix)?
        .into_iter()
        // deleted templates are no longer interesting
        .filter(|change| head_tree.get_path(Path::new(&change.path)).is_ok())
        .take(limit)
        .collect();
    Ok(changes)
}

/// templates below `repo_dir` touched by the most commits that still exist at HEAD, empty on any git failure
pub fn most_changed_templates(repo_dir: &Path, limit: usize) -> Vec<HtmlFileChange> {
    let spinner = spinner("counting template changes in git history...");
    let result = most_changed_in_repo(repo_dir, limit);
    spinner.finish_and_clear();

    match result {
        Ok(changes) => changes,
        Err(e) => {
            eprintln!(
                "{} {:#}",
                style("⚠️  could not fetch git history for html files:").yellow(),
                e
            );
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_matches_whole_segments_only() {
        assert!(is_under("app/a.html", "app"));
        assert!(is_under("app/docker/a.html", "app/docker"));
        assert!(!is_under("application/a.html", "app"));
        assert!(!is_under("docs/site/index.html", "app"));
        assert!(is_under("docs/site/index.html", ""));
    }
}
