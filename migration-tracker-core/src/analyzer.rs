// file analysis module - classifies one file as template, angularjs, react or neither

use crate::patterns::{Counting, LegacyRule, PatternSet};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// module key used for files sitting directly in the scan root
pub const ROOT_KEY: &str = "root";

/// classification of a single file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Classification {
    Template,
    Legacy,
    Modern,
    /// matched both a legacy and a modern rule; counted as legacy everywhere
    Hybrid,
    Neither,
}

impl Classification {
    pub fn counts_as_legacy(self) -> bool {
        matches!(self, Classification::Legacy | Classification::Hybrid)
    }

    pub fn counts_as_modern(self) -> bool {
        self == Classification::Modern
    }
}

/// per-rule match counts for one file, only rules that matched are present
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyMatches(BTreeMap<LegacyRule, usize>);

impl LegacyMatches {
    pub fn get(&self, rule: LegacyRule) -> usize {
        self.0.get(&rule).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (LegacyRule, usize)> + '_ {
        self.0.iter().map(|(rule, count)| (*rule, *count))
    }

    fn insert(&mut self, rule: LegacyRule, count: usize) {
        if count > 0 {
            self.0.insert(rule, count);
        }
    }
}

impl Serialize for LegacyMatches {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (rule, count) in &self.0 {
            match rule.counting() {
                Counting::Presence => map.serialize_entry(rule.name(), &true)?,
                Counting::Multiplicity => map.serialize_entry(rule.name(), count)?,
            }
        }
        map.end()
    }
}

/// everything the aggregator needs to know about one file
#[derive(Debug, Clone)]
pub struct FileAnalysis {
    pub path: String,
    pub directory: String,
    pub module: String,
    pub classification: Classification,
    pub matches: LegacyMatches,
}

/// make a path relative to the scan root and normalise separators
pub fn relative_path(path: &str, base_dir: &str) -> String {
    let relative = if base_dir.is_empty() {
        Path::new(path)
    } else {
        Path::new(path).strip_prefix(base_dir).unwrap_or(Path::new(path))
    };
    relative.to_string_lossy().replace('\\', "/")
}

/// directory part of a relative path, `root` when the file sits at the top
pub fn directory_of(relative: &str) -> String {
    match relative.rsplit_once('/') {
        Some((dir, _)) if !dir.is_empty() => dir.to_string(),
        _ => ROOT_KEY.to_string(),
    }
}

/// group a directory into its module: `react/<area>` under the modern root, else the first segment
pub fn module_key(directory: &str, modern_root: &str) -> String {
    if directory == ROOT_KEY {
        return ROOT_KEY.to_string();
    }
    let mut parts = directory.split('/').filter(|part| !part.is_empty());
    match (parts.next(), parts.next()) {
        (Some(first), Some(second)) if first == modern_root => format!("{first}/{second}"),
        (Some(first), _) => first.to_string(),
        (None, _) => ROOT_KEY.to_string(),
    }
}

/// classify one file - pure and reentrant, nothing outside the return value changes
pub fn classify_file(
    content: &str,
    path: &str,
    base_dir: &str,
    patterns: &PatternSet,
    modern_root: &str,
) -> FileAnalysis {
    let relative = relative_path(path, base_dir);
    let directory = directory_of(&relative);
    let module = module_key(&directory, modern_root);

    let mut analysis = FileAnalysis {
        path: relative,
        directory,
        module,
        classification: Classification::Neither,
        matches: LegacyMatches::default(),
    };

    // templates stop here, no other rule is evaluated
    if patterns.is_template(path) {
        analysis.classification = Classification::Template;
        return analysis;
    }

    let is_modern = patterns.modern.is_modern(path, content);

    for (rule, matcher) in &patterns.legacy {
        analysis.matches.insert(*rule, matcher.count(path, content));
    }
    let is_legacy = !analysis.matches.is_empty();

    analysis.classification = match (is_legacy, is_modern) {
        (true, true) => Classification::Hybrid,
        (true, false) => Classification::Legacy,
        (false, true) => Classification::Modern,
        (false, false) => Classification::Neither,
    };
    analysis
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::PATTERNS;

    fn classify(content: &str, path: &str, base_dir: &str) -> FileAnalysis {
        classify_file(content, path, base_dir, &PATTERNS, "react")
    }

    #[test]
    fn controller_file_with_registration_and_marker() {
        let content = "/* @ngInject */\nfunction Ctrl() {}\n\
                       angular.module('portainer.docker').controller('Ctrl', Ctrl);";
        let analysis = classify(content, "app/docker/foo.controller.js", "app");

        assert_eq!(analysis.classification, Classification::Legacy);
        assert_eq!(analysis.module, "docker");
        assert_eq!(analysis.matches.get(LegacyRule::ControllerFile), 1);
        assert_eq!(analysis.matches.get(LegacyRule::ControllerRegistration), 1);
        assert_eq!(analysis.matches.get(LegacyRule::NgInject), 1);
        assert_eq!(analysis.matches.get(LegacyRule::ServiceFile), 0);
    }

    #[test]
    fn react_component_under_modern_root() {
        let content = "import { useState } from 'react';\nreturn <Widget title=\"x\" />;";
        let analysis = classify(content, "app/react/portainer/Widget.tsx", "app");

        assert_eq!(analysis.classification, Classification::Modern);
        assert_eq!(analysis.module, "react/portainer");
        assert!(analysis.matches.is_empty());
    }

    #[test]
    fn templates_short_circuit_regardless_of_content() {
        let content = "import angular from 'angular';\nangular.module('x').component('y', {});";
        let analysis = classify(content, "app/foo.html", "");

        assert_eq!(analysis.classification, Classification::Template);
        assert!(analysis.matches.is_empty());
    }

    #[test]
    fn hybrid_files_count_as_legacy() {
        let content = "import angular from 'angular';\nexport const x = 1;";
        let analysis = classify(content, "app/react/docker/bridge.tsx", "app");

        assert_eq!(analysis.classification, Classification::Hybrid);
        assert!(analysis.classification.counts_as_legacy());
        assert!(!analysis.classification.counts_as_modern());
    }

    #[test]
    fn modern_extension_with_empty_content() {
        let analysis = classify("", "app/react/Thing.jsx", "app");
        assert_eq!(analysis.classification, Classification::Modern);
        assert_eq!(analysis.module, "react");
    }

    #[test]
    fn react_import_without_export_or_markup_is_neither() {
        let analysis = classify("import { useMemo } from 'react';\n", "app/hooks/use.ts", "app");
        assert_eq!(analysis.classification, Classification::Neither);
    }

    #[test]
    fn module_key_derivation() {
        assert_eq!(module_key("docker/views", "react"), "docker");
        assert_eq!(module_key("react/kubernetes/volumes", "react"), "react/kubernetes");
        assert_eq!(module_key("react", "react"), "react");
        assert_eq!(module_key(ROOT_KEY, "react"), ROOT_KEY);
    }

    #[test]
    fn files_at_the_root_use_the_sentinel() {
        let analysis = classify("", "/src/app/index.tsx", "/src/app");
        assert_eq!(analysis.path, "index.tsx");
        assert_eq!(analysis.directory, ROOT_KEY);
        assert_eq!(analysis.module, ROOT_KEY);
    }

    #[test]
    fn paths_outside_the_base_are_kept_as_is() {
        assert_eq!(relative_path("lib/a.js", "app"), "lib/a.js");
        assert_eq!(relative_path("app/a/b.js", ""), "app/a/b.js");
    }

    #[test]
    fn matches_serialize_booleans_for_presence_rules() {
        let content = "angular.module('a').filter('f', f);\nangular.module('a').filter('g', g);";
        let analysis = classify(content, "app/a.service.js", "app");
        let json = serde_json::to_value(&analysis.matches).unwrap();
        assert_eq!(json, serde_json::json!({ "serviceFile": true, "filters": 2 }));
    }
}
