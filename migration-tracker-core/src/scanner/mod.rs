// scan drivers - each one feeds (content, path) pairs to the classifier, one file at a time

pub mod github;
pub mod local;

pub use github::{GithubClient, analyze_github_repo};
pub use local::analyze_local;
