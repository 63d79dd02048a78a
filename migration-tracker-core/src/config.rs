// configuration - optional toml file with built-in defaults for the portainer repo

use crate::results::{FileRetention, GroupBy};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// config file picked up from the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "migration-tracker.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub github: GithubConfig,
    pub scan: ScanConfig,
    pub history: HistoryConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub app_path: String,
    pub api_url: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        GithubConfig {
            owner: "portainer".to_string(),
            repo: "portainer".to_string(),
            branch: "develop".to_string(),
            app_path: "app".to_string(),
            api_url: "https://api.github.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub excluded_directories: Vec<String>,
    pub file_extensions: Vec<String>,
    pub modern_root: String,
    pub group_by: GroupBy,
    pub retain_files: FileRetention,
    pub default_local_path: PathBuf,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            excluded_directories: ["node_modules", "dist", "build"]
                .map(String::from)
                .to_vec(),
            file_extensions: [".js", ".ts", ".tsx", ".html"].map(String::from).to_vec(),
            modern_root: "react".to_string(),
            group_by: GroupBy::Module,
            retain_files: FileRetention::None,
            default_local_path: PathBuf::from("../portainer-suite/package/server-ee/app"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub source_dir: String,
    pub sample_interval_days: u32,
    pub lookback_years: u32,
    pub output: PathBuf,
    pub default_repo_path: PathBuf,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        HistoryConfig {
            source_dir: "app".to_string(),
            sample_interval_days: 7,
            lookback_years: 4,
            output: PathBuf::from("public/history.json"),
            default_repo_path: PathBuf::from("../portainer-suite/package/server-ee"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// template count at the commit that introduced react
    pub baseline: u64,
    pub most_changed_limit: usize,
    pub output: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        ReportConfig {
            baseline: 391,
            most_changed_limit: 20,
            output: PathBuf::from("results.json"),
        }
    }
}

impl Config {
    /// load config from an explicit path, or the default file if it exists
    pub fn load(path: Option<&Path>) -> Result<Config> {
        match path {
            Some(path) => Config::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Config::from_file(Path::new(DEFAULT_CONFIG_FILE))
            }
            None => Ok(Config::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Config::parse(&content).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Config> {
        toml::from_str(content).context("failed to parse toml")
    }
}
