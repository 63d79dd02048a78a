// results module - running counters for a scan and the snapshot written to disk

use crate::analyzer::{Classification, FileAnalysis, LegacyMatches};
use crate::patterns::LegacyRule;
use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use clap::ValueEnum;
use console::style;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// where the scanned files came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Local,
    Github,
}

/// how per-key stats are bucketed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    #[default]
    Module,
    Directory,
}

/// which files end up in the per-file detail list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FileRetention {
    #[default]
    None,
    Legacy,
    All,
}

impl FileRetention {
    fn retains(self, classification: Classification) -> bool {
        match self {
            FileRetention::None => false,
            FileRetention::Legacy => classification.counts_as_legacy(),
            FileRetention::All => classification.counts_as_legacy() || classification.counts_as_modern(),
        }
    }
}

/// scan-wide counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    #[serde(rename = "totalAngularJSTemplates")]
    pub legacy_templates: u64,
    #[serde(rename = "totalAngularJSFiles")]
    pub legacy_files: u64,
    #[serde(rename = "totalReactFiles")]
    pub modern_files: u64,
    #[serde(rename = "controllerFiles")]
    pub controller_files: u64,
    #[serde(rename = "serviceFiles")]
    pub service_files: u64,
    #[serde(rename = "directiveFiles")]
    pub directive_files: u64,
    #[serde(rename = "componentRegistrations")]
    pub component_registrations: u64,
    #[serde(rename = "directiveRegistrations")]
    pub directive_registrations: u64,
    #[serde(rename = "controllerRegistrations")]
    pub controller_registrations: u64,
    #[serde(rename = "serviceRegistrations")]
    pub service_registrations: u64,
    #[serde(rename = "factoryRegistrations")]
    pub factory_registrations: u64,
    #[serde(rename = "filterRegistrations")]
    pub filter_registrations: u64,
    #[serde(rename = "ngInjectAnnotations")]
    pub ng_inject_annotations: u64,
    #[serde(rename = "filesWithAngularImport")]
    pub files_with_angular_import: u64,
}

impl Summary {
    fn counter_mut(&mut self, rule: LegacyRule) -> &mut u64 {
        match rule {
            LegacyRule::ControllerFile => &mut self.controller_files,
            LegacyRule::ServiceFile => &mut self.service_files,
            LegacyRule::DirectiveFile => &mut self.directive_files,
            LegacyRule::AngularImport => &mut self.files_with_angular_import,
            LegacyRule::ComponentRegistration => &mut self.component_registrations,
            LegacyRule::DirectiveRegistration => &mut self.directive_registrations,
            LegacyRule::ControllerRegistration => &mut self.controller_registrations,
            LegacyRule::ServiceRegistration => &mut self.service_registrations,
            LegacyRule::FactoryRegistration => &mut self.factory_registrations,
            LegacyRule::FilterRegistration => &mut self.filter_registrations,
            LegacyRule::NgInject => &mut self.ng_inject_annotations,
        }
    }

    fn add_matches(&mut self, matches: &LegacyMatches) {
        for (rule, count) in matches.iter() {
            *self.counter_mut(rule) += count as u64;
        }
    }
}

/// per module (or directory) file counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ModuleStats {
    #[serde(rename = "angularJSFiles")]
    pub legacy_files: u64,
    #[serde(rename = "reactFiles")]
    pub modern_files: u64,
}

/// detail record for one retained file
#[derive(Debug, Clone, Serialize)]
pub struct FileData {
    pub path: String,
    pub classification: Classification,
    pub patterns: LegacyMatches,
}

/// a template file and how many commits touched it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HtmlFileChange {
    pub path: String,
    pub commit_count: usize,
}

/// one point-in-time snapshot of a scan
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Results {
    pub timestamp: String,
    pub source: Source,
    pub summary: Summary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub by_module: Option<BTreeMap<String, ModuleStats>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub by_directory: Option<BTreeMap<String, ModuleStats>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<FileData>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub most_changed_html_files: Option<Vec<HtmlFileChange>>,
}

impl Results {
    /// the per-key breakdown, whichever grouping was used
    pub fn breakdown(&self) -> &BTreeMap<String, ModuleStats> {
        static EMPTY: BTreeMap<String, ModuleStats> = BTreeMap::new();
        self.by_module
            .as_ref()
            .or(self.by_directory.as_ref())
            .unwrap_or(&EMPTY)
    }
}

/// accumulates counters while a scan driver feeds it files
#[derive(Debug)]
pub struct Aggregator {
    source: Source,
    group_by: GroupBy,
    retention: FileRetention,
    summary: Summary,
    breakdown: BTreeMap<String, ModuleStats>,
    files: Vec<FileData>,
}

impl Aggregator {
    pub fn new(source: Source, group_by: GroupBy, retention: FileRetention) -> Self {
        Aggregator {
            source,
            group_by,
            retention,
            summary: Summary::default(),
            breakdown: BTreeMap::new(),
            files: Vec::new(),
        }
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    /// fold one classified file into the counters - only ever increments
    pub fn record(&mut self, analysis: &FileAnalysis) {
        let classification = analysis.classification;
        if classification == Classification::Template {
            self.summary.legacy_templates += 1;
            return;
        }

        if classification.counts_as_legacy() {
            self.summary.legacy_files += 1;
            self.summary.add_matches(&analysis.matches);
            self.stats_for(analysis).legacy_files += 1;
        } else if classification.counts_as_modern() {
            self.summary.modern_files += 1;
            self.stats_for(analysis).modern_files += 1;
        }

        if self.retention.retains(classification) {
            self.files.push(FileData {
                path: analysis.path.clone(),
                classification,
                patterns: analysis.matches.clone(),
            });
        }
    }

    fn stats_for(&mut self, analysis: &FileAnalysis) -> &mut ModuleStats {
        let key = match self.group_by {
            GroupBy::Module => &analysis.module,
            GroupBy::Directory => &analysis.directory,
        };
        self.breakdown.entry(key.clone()).or_default()
    }

    /// stamp and freeze the counters into a snapshot
    pub fn finalize(self) -> Results {
        let (by_module, by_directory) = match self.group_by {
            GroupBy::Module => (Some(self.breakdown), None),
            GroupBy::Directory => (None, Some(self.breakdown)),
        };
        Results {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            source: self.source,
            summary: self.summary,
            by_module,
            by_directory,
            files: match self.retention {
                FileRetention::None => None,
                _ => Some(self.files),
            },
            most_changed_html_files: None,
        }
    }
}

/// write the snapshot as pretty json
pub fn save_results(results: &Results, output_path: &Path) -> Result<()> {
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(results).context("failed to serialise results")?;
    fs::write(output_path, json)
        .with_context(|| format!("failed to write {}", output_path.display()))?;
    println!(
        "\n{} {}",
        style("results saved to:").green(),
        style(output_path.display()).bold()
    );
    Ok(())
}
