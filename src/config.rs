use std::path;

use crate::error::Error;
use crate::ops::git::Committer;
use crate::ops::github_curl::GITHUB_GRAPHQL_URL;
use crate::ops::sources::DEFAULT_SOURCES_FILE;

pub const DEFAULT_BRANCH: &str = "bot/update-nix-sources";
pub const DEFAULT_PR_TITLE: &str = "[bot] Update nix sources";
pub const DEFAULT_PR_BODY: &str =
    "This is an automatically generated PR, with updates to nix sources.";
pub const DEFAULT_COMMITTER_NAME: &str = "GitHub";
pub const DEFAULT_COMMITTER_EMAIL: &str = "noreply@github.com";
pub const DEFAULT_TAG_LIMIT: u32 = 100;

pub const TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";

/// Settings for one update run. The access token is deliberately not part of
/// it; it goes straight to the GitHub client.
#[derive(Debug, Clone)]
pub struct Config {
    /// Branch name, before the optional source suffix
    pub branch: String,
    pub pr_title: String,
    pub pr_body: String,
    pub committer: Committer,
    pub reviewers: Vec<String>,
    /// Single source to update; all sources when unset
    pub source: Option<String>,
    /// PR base; the repository's default branch when unset
    pub base_branch: Option<String>,
    pub sources_file: path::PathBuf,
    pub tag_limit: u32,
    pub api_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            branch: DEFAULT_BRANCH.to_string(),
            pr_title: DEFAULT_PR_TITLE.to_string(),
            pr_body: DEFAULT_PR_BODY.to_string(),
            committer: Committer {
                name: DEFAULT_COMMITTER_NAME.to_string(),
                email: DEFAULT_COMMITTER_EMAIL.to_string(),
            },
            reviewers: Vec::new(),
            source: None,
            base_branch: None,
            sources_file: path::PathBuf::from(DEFAULT_SOURCES_FILE),
            tag_limit: DEFAULT_TAG_LIMIT,
            api_url: GITHUB_GRAPHQL_URL.to_string(),
        }
    }
}

impl Config {
    /// Branch the bot commits to, one per source when a source is given
    pub fn working_branch(&self) -> String {
        match &self.source {
            Some(source) => format!("{}-{}", self.branch, source),
            None => self.branch.clone(),
        }
    }
}

/// Ensure an access token was supplied; blank tokens count as missing.
pub fn require_token(token: Option<String>) -> Result<String, Error> {
    match token {
        Some(token) if !token.trim().is_empty() => Ok(token),
        _ => Err(Error::Config(format!(
            "GITHUB TOKEN MISSING: Add token to cli arg github_token or set env variable {}",
            TOKEN_ENV_VAR
        ))),
    }
}
