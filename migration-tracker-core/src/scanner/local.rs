// local filesystem scanner

use crate::analyzer::classify_file;
use crate::config::ScanConfig;
use crate::patterns::PATTERNS;
use crate::results::Aggregator;
use crate::utils::{decode_content, has_candidate_extension};
use anyhow::{Context, Result, bail};
use console::style;
use std::fs;
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

fn is_excluded(entry: &DirEntry, excluded: &[String]) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && excluded
            .iter()
            .any(|name| entry.file_name().to_str() == Some(name.as_str()))
}

/// walk a directory tree and feed every candidate file to the aggregator, returns the file count
pub fn analyze_local(
    app_path: &Path,
    aggregator: &mut Aggregator,
    config: &ScanConfig,
    verbose: bool,
) -> Result<usize> {
    if !app_path.is_dir() {
        bail!("directory not found: {}", app_path.display());
    }

    let base_dir = app_path.to_string_lossy();
    let mut processed = 0;

    let walker = WalkDir::new(app_path)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            let excluded = is_excluded(entry, &config.excluded_directories);
            if excluded && verbose {
                println!("{}", style(format!("skipping {}", entry.path().display())).dim());
            }
            !excluded
        });

    for entry in walker {
        let entry = entry.with_context(|| format!("failed to walk {}", app_path.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path().to_string_lossy();
        if !has_candidate_extension(&path, &config.file_extensions) {
            continue;
        }

        let bytes = fs::read(entry.path())
            .with_context(|| format!("failed to read {}", entry.path().display()))?;
        let content = decode_content(&bytes);

        let analysis = classify_file(&content, &path, &base_dir, &PATTERNS, &config.modern_root);
        if verbose && analysis.classification.counts_as_legacy() {
            println!("  {} {}", style("angularjs:").yellow(), analysis.path);
        }
        aggregator.record(&analysis);
        processed += 1;
    }

    Ok(processed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::{FileRetention, GroupBy, Source};
    use std::fs;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn missing_root_is_fatal() {
        let mut aggregator = Aggregator::new(Source::Local, GroupBy::Module, FileRetention::None);
        let err = analyze_local(
            Path::new("/no/such/app/dir"),
            &mut aggregator,
            &ScanConfig::default(),
            false,
        )
        .unwrap_err();
        assert!(err.to_string().contains("directory not found"));
    }

    #[test]
    fn excluded_directories_and_other_extensions_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "docker/a.controller.js", "");
        write(root, "node_modules/lib/b.controller.js", "");
        write(root, "docker/dist/c.controller.js", "");
        write(root, "docker/readme.md", "angular.module('x').component('y', {})");
        write(root, "docker/view.html", "<div></div>");

        let mut aggregator = Aggregator::new(Source::Local, GroupBy::Module, FileRetention::None);
        let processed =
            analyze_local(root, &mut aggregator, &ScanConfig::default(), false).unwrap();

        assert_eq!(processed, 2);
        assert_eq!(aggregator.summary().controller_files, 1);
        assert_eq!(aggregator.summary().legacy_templates, 1);
    }

    #[test]
    fn empty_directory_yields_empty_results() {
        let dir = tempfile::tempdir().unwrap();
        let mut aggregator = Aggregator::new(Source::Local, GroupBy::Module, FileRetention::None);
        let processed =
            analyze_local(dir.path(), &mut aggregator, &ScanConfig::default(), false).unwrap();

        assert_eq!(processed, 0);
        let results = aggregator.finalize();
        assert!(results.breakdown().is_empty());
    }
}
