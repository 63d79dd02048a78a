// pattern library - the fixed regex rules used to spot angularjs and react code

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeMap;

/// what a rule is matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleTarget {
    Path,
    Content,
}

/// whether a rule reports presence (0 or 1) or every non-overlapping match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counting {
    Presence,
    Multiplicity,
}

/// every legacy (angularjs) rule, in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LegacyRule {
    ControllerFile,
    ServiceFile,
    DirectiveFile,
    AngularImport,
    ComponentRegistration,
    DirectiveRegistration,
    ControllerRegistration,
    ServiceRegistration,
    FactoryRegistration,
    FilterRegistration,
    NgInject,
}

impl LegacyRule {
    pub const ALL: [LegacyRule; 11] = [
        LegacyRule::ControllerFile,
        LegacyRule::ServiceFile,
        LegacyRule::DirectiveFile,
        LegacyRule::AngularImport,
        LegacyRule::ComponentRegistration,
        LegacyRule::DirectiveRegistration,
        LegacyRule::ControllerRegistration,
        LegacyRule::ServiceRegistration,
        LegacyRule::FactoryRegistration,
        LegacyRule::FilterRegistration,
        LegacyRule::NgInject,
    ];

    /// stable rule name, also used as the per-file json key
    pub fn name(self) -> &'static str {
        match self {
            LegacyRule::ControllerFile => "controllerFile",
            LegacyRule::ServiceFile => "serviceFile",
            LegacyRule::DirectiveFile => "directiveFile",
            LegacyRule::AngularImport => "angularImport",
            LegacyRule::ComponentRegistration => "components",
            LegacyRule::DirectiveRegistration => "directives",
            LegacyRule::ControllerRegistration => "controllers",
            LegacyRule::ServiceRegistration => "services",
            LegacyRule::FactoryRegistration => "factories",
            LegacyRule::FilterRegistration => "filters",
            LegacyRule::NgInject => "ngInject",
        }
    }

    /// regex source for this rule
    pub fn pattern(self) -> String {
        // registration calls all share the `angular.module('x').<kind>(` shape
        let registration =
            |kind: &str| format!(r#"angular\.module\(['"].*?['"]\)\.{kind}\("#);
        match self {
            LegacyRule::ControllerFile => r"\.controller\.js$".to_string(),
            LegacyRule::ServiceFile => r"\.service\.js$".to_string(),
            LegacyRule::DirectiveFile => r"\.directive\.js$".to_string(),
            LegacyRule::AngularImport => r#"import\s+angular\s+from\s+['"]angular['"]"#.to_string(),
            LegacyRule::ComponentRegistration => registration("component"),
            LegacyRule::DirectiveRegistration => registration("directive"),
            LegacyRule::ControllerRegistration => registration("controller"),
            LegacyRule::ServiceRegistration => registration("service"),
            LegacyRule::FactoryRegistration => registration("factory"),
            LegacyRule::FilterRegistration => registration("filter"),
            LegacyRule::NgInject => r"/\*\s*@ngInject\s*\*/".to_string(),
        }
    }

    pub fn target(self) -> RuleTarget {
        match self {
            LegacyRule::ControllerFile | LegacyRule::ServiceFile | LegacyRule::DirectiveFile => {
                RuleTarget::Path
            }
            _ => RuleTarget::Content,
        }
    }

    pub fn counting(self) -> Counting {
        match self {
            LegacyRule::ControllerFile
            | LegacyRule::ServiceFile
            | LegacyRule::DirectiveFile
            | LegacyRule::AngularImport => Counting::Presence,
            _ => Counting::Multiplicity,
        }
    }
}

/// a single named matching rule
#[derive(Debug)]
pub struct Rule {
    pub regex: Regex,
    pub target: RuleTarget,
    pub counting: Counting,
}

impl Rule {
    fn new(rule: LegacyRule, pattern: &str) -> Self {
        Rule {
            regex: Regex::new(pattern).unwrap(),
            target: rule.target(),
            counting: rule.counting(),
        }
    }

    /// number of matches this rule contributes for one file
    pub fn count(&self, path: &str, content: &str) -> usize {
        let haystack = match self.target {
            RuleTarget::Path => path,
            RuleTarget::Content => content,
        };
        match self.counting {
            Counting::Presence => usize::from(self.regex.is_match(haystack)),
            Counting::Multiplicity => self.regex.find_iter(haystack).count(),
        }
    }
}

/// the react detection heuristics
#[derive(Debug)]
pub struct ModernPatterns {
    pub file_extension: Regex,
    pub react_import: Regex,
    pub react_export: Regex,
    pub jsx_syntax: Regex,
}

impl ModernPatterns {
    /// extension match alone is enough; an import needs an export or a jsx tag next to it
    pub fn is_modern(&self, path: &str, content: &str) -> bool {
        if self.file_extension.is_match(path) {
            return true;
        }
        self.react_import.is_match(content)
            && (self.react_export.is_match(content) || self.jsx_syntax.is_match(content))
    }
}

/// immutable set of every rule, built once per process
#[derive(Debug)]
pub struct PatternSet {
    pub html_template: Regex,
    pub legacy: BTreeMap<LegacyRule, Rule>,
    pub modern: ModernPatterns,
}

impl PatternSet {
    fn new() -> Self {
        let legacy = LegacyRule::ALL
            .into_iter()
            .map(|rule| (rule, Rule::new(rule, &rule.pattern())))
            .collect();

        PatternSet {
            html_template: Regex::new(r"\.html$").unwrap(),
            legacy,
            modern: ModernPatterns {
                file_extension: Regex::new(r"\.(tsx|jsx)$").unwrap(),
                react_import: Regex::new(r#"import\s+.*\s+from\s+['"]react['"]"#).unwrap(),
                react_export: Regex::new(r"export\s+(default\s+)?(function|const)").unwrap(),
                jsx_syntax: Regex::new(r"<[A-Z][A-Za-z0-9]*[\s>/]").unwrap(),
            },
        }
    }

    pub fn is_template(&self, path: &str) -> bool {
        self.html_template.is_match(path)
    }

    pub fn rule(&self, rule: LegacyRule) -> &Rule {
        &self.legacy[&rule]
    }
}

lazy_static! {
    pub static ref PATTERNS: PatternSet = PatternSet::new();
}
