// github scanner - fetches the app tree through the rest api and classifies each blob

use crate::analyzer::classify_file;
use crate::config::{GithubConfig, ScanConfig};
use crate::patterns::PATTERNS;
use crate::results::Aggregator;
use crate::utils::{decode_content, has_candidate_extension};
use anyhow::{Context, Result, anyhow, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use console::style;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

#[derive(Deserialize)]
struct RefResponse {
    object: RefObject,
}

#[derive(Deserialize)]
struct RefObject {
    sha: String,
}

#[derive(Deserialize)]
pub struct TreeResponse {
    pub tree: Vec<TreeEntry>,
    #[serde(default)]
    pub truncated: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TreeEntry {
    pub path: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub sha: Option<String>,
}

#[derive(Deserialize)]
struct BlobResponse {
    content: String,
    encoding: String,
}

/// thin client over the git data endpoints we need
pub struct GithubClient {
    http: reqwest::Client,
    config: GithubConfig,
    token: Option<String>,
}

impl GithubClient {
    pub fn new(config: GithubConfig, token: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("migration-tracker/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build http client")?;
        Ok(GithubClient {
            http,
            config,
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    fn repo_url(&self, suffix: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.config.api_url.trim_end_matches('/'),
            self.config.owner,
            self.config.repo,
            suffix
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let mut request = self
            .http
            .get(url)
            .header("Accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(anyhow!("github api error ({status}) for {url}: {error_text}"));
        }

        response
            .json::<T>()
            .await
            .with_context(|| format!("failed to parse github response from {url}"))
    }

    /// commit sha at the tip of the configured branch
    pub async fn branch_head(&self) -> Result<String> {
        let url = self.repo_url(&format!("git/ref/heads/{}", self.config.branch));
        let reference: RefResponse = self.get_json(&url).await?;
        Ok(reference.object.sha)
    }

    pub async fn tree(&self, sha: &str) -> Result<TreeResponse> {
        let url = self.repo_url(&format!("git/trees/{sha}?recursive=1"));
        self.get_json(&url).await
    }

    pub async fn blob_content(&self, sha: &str) -> Result<String> {
        let url = self.repo_url(&format!("git/blobs/{sha}"));
        let blob: BlobResponse = self.get_json(&url).await?;
        decode_blob(&blob.content, &blob.encoding)
    }
}

/// decode a blob payload into text
pub fn decode_blob(content: &str, encoding: &str) -> Result<String> {
    match encoding {
        "base64" => {
            // the api wraps base64 payloads at 60 columns
            let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
            let bytes = STANDARD
                .decode(compact)
                .context("invalid base64 blob content")?;
            Ok(decode_content(&bytes))
        }
        "utf-8" | "utf8" => Ok(content.to_string()),
        other => bail!("unsupported blob encoding: {other}"),
    }
}

/// blobs under the app path with a candidate suffix
pub fn select_app_files<'a>(
    tree: &'a [TreeEntry],
    app_path: &str,
    extensions: &[String],
) -> Vec<&'a TreeEntry> {
    let prefix = format!("{}/", app_path.trim_end_matches('/'));
    tree.iter()
        .filter(|entry| entry.kind == "blob" && entry.sha.is_some())
        .filter(|entry| {
            entry.path.as_deref().is_some_and(|path| {
                path.starts_with(&prefix) && has_candidate_extension(path, extensions)
            })
        })
        .collect()
}

/// scan the configured branch of the github repository, returns the processed file count
pub async fn analyze_github_repo(
    github: &GithubConfig,
    scan: &ScanConfig,
    token: Option<String>,
    aggregator: &mut Aggregator,
    verbose: bool,
) -> Result<usize> {
    println!(
        "{}",
        style(format!(
            "fetching files from github: {}/{} (branch: {})\n",
            github.owner, github.repo, github.branch
        ))
        .cyan()
    );

    let client = GithubClient::new(github.clone(), token)?;
    let head = client
        .branch_head()
        .await
        .context("failed to resolve branch head")?;
    let tree = client
        .tree(&head)
        .await
        .context("failed to fetch repository tree")?;
    if tree.truncated {
        eprintln!(
            "{}",
            style("⚠️  github truncated the tree response, some files will be missing").yellow()
        );
    }

    let app_files = select_app_files(&tree.tree, &github.app_path, &scan.file_extensions);
    println!(
        "found {} javascript/typescript/html files in {}/\n",
        app_files.len(),
        github.app_path
    );

    let mut processed = 0;
    for file in &app_files {
        let (Some(path), Some(sha)) = (file.path.as_deref(), file.sha.as_deref()) else {
            continue;
        };

        let content = match client.blob_content(sha).await {
            Ok(content) => content,
            Err(e) => {
                eprintln!(
                    "{} {}: {:#}",
                    style("⚠️  error processing file").yellow(),
                    path,
                    e
                );
                continue;
            }
        };

        let analysis = classify_file(&content, path, &github.app_path, &PATTERNS, &scan.modern_root);
        if verbose && analysis.classification.counts_as_legacy() {
            println!("  {} {}", style("angularjs:").yellow(), analysis.path);
        }
        aggregator.record(&analysis);

        processed += 1;
        if processed % 100 == 0 {
            println!("processed {}/{} files...", processed, app_files.len());
        }
    }

    println!("\nprocessed {processed} files from github\n");
    Ok(processed)
}
