#![allow(async_fn_in_trait)]

use std::path;
use std::sync::LazyLock;

use anyhow::Result;
#[cfg(test)]
use mockall::automock;
use regex::Regex;
use tracing::instrument;

use super::command::CommandRunner;
use crate::error::Error;

// -----------------------------------------------------------------------------
// GitOps trait

/// Operations for interacting with Git
#[cfg_attr(test, automock)]
pub trait GitOps {
    /// Check out `branch`, creating it from the current HEAD if it does not exist.
    async fn checkout_or_create(&self, branch: &str) -> Result<()>;

    /// Stage every change in the working tree.
    async fn stage_all(&self) -> Result<()>;

    /// Commit the index if anything is staged.
    /// Returns true if a commit was made, false if there was nothing to commit.
    async fn commit_if_staged(&self, committer: &Committer, message: &str) -> Result<bool>;

    /// Push `branch` to origin, overwriting whatever is there.
    async fn force_push(&self, branch: &str) -> Result<()>;

    /// Owner and name of the GitHub repository behind `origin`.
    async fn remote_info(&self) -> Result<RemoteInfo>;
}

/// Identity used for bot commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Committer {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteInfo {
    pub owner: String,
    pub name: String,
}

// Parse URLs like:
// git@github.com:owner/repo.git
// https://github.com/owner/repo.git
// ssh://git@github.com/owner/repo
static GITHUB_REMOTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:https://(?:[^@/]+@)?github\.com/|git@github\.com:|ssh://git@github\.com/)([^/]+)/([^/]+?)(?:\.git)?/?$",
    )
    .unwrap()
});

/// Extract owner and repository name from a GitHub remote URL.
pub fn parse_remote_url(url: &str) -> Result<RemoteInfo> {
    let url = url.trim();
    let captures = GITHUB_REMOTE
        .captures(url)
        .ok_or_else(|| Error::UnsupportedRemote {
            url: url.to_string(),
        })?;

    Ok(RemoteInfo {
        owner: captures[1].to_string(),
        name: captures[2].to_string(),
    })
}

// -----------------------------------------------------------------------------
// RealGit

/// Real implementation that calls the git CLI
pub struct RealGit {
    runner: CommandRunner,
}

impl RealGit {
    pub fn new(path: path::PathBuf) -> Self {
        Self {
            runner: CommandRunner::new(path),
        }
    }
}

impl GitOps for RealGit {
    #[instrument(skip(self))]
    async fn checkout_or_create(&self, branch: &str) -> Result<()> {
        if self.runner.run(&["git", "checkout", branch], false).await?.success() {
            return Ok(());
        }

        if self
            .runner
            .run(&["git", "checkout", "-b", branch], false)
            .await?
            .success()
        {
            return Ok(());
        }

        Err(Error::Branch {
            branch: branch.to_string(),
        }
        .into())
    }

    #[instrument(skip(self))]
    async fn stage_all(&self) -> Result<()> {
        self.runner.run(&["git", "add", "."], true).await?;
        Ok(())
    }

    #[instrument(skip(self, committer))]
    async fn commit_if_staged(&self, committer: &Committer, message: &str) -> Result<bool> {
        let argv = ["git", "diff", "--staged", "--quiet"];
        let diff = self.runner.run(&argv, false).await?;

        // Exit code 0 means the index matches HEAD, 1 means there are staged changes
        match diff.exit_code {
            0 => {
                tracing::info!("nothing staged, skipping commit");
                Ok(false)
            }
            1 => {
                let name = format!("user.name={}", committer.name);
                let email = format!("user.email={}", committer.email);
                self.runner
                    .run(
                        &["git", "-c", &name, "-c", &email, "commit", "-m", message],
                        true,
                    )
                    .await?;
                Ok(true)
            }
            exit_code => Err(Error::Process {
                argv: argv.iter().map(|arg| arg.to_string()).collect(),
                exit_code,
                stderr: diff.stderr,
            }
            .into()),
        }
    }

    #[instrument(skip(self))]
    async fn force_push(&self, branch: &str) -> Result<()> {
        self.runner
            .run(
                &["git", "push", "--set-upstream", "origin", branch, "--force"],
                true,
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remote_info(&self) -> Result<RemoteInfo> {
        let output = self
            .runner
            .run(&["git", "remote", "get-url", "origin"], true)
            .await?;
        parse_remote_url(&output.stdout)
    }
}
