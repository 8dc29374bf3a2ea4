use anyhow::Result;
use colored::Colorize;

use crate::App;
use crate::ops::git::GitOps;
use crate::ops::github::GithubOps;
use crate::ops::github::PullRequestOutcome;
use crate::ops::niv::NivOps;
use crate::ops::sources::PinStore;

/// Commit message for refreshing `nix/sources.nix` itself
pub const SOURCES_NIX_MESSAGE: &str = "Update sources.nix";

/// Commit message when every source is updated at once
pub const ALL_SOURCES_MESSAGE: &str = "Update all nix sources";

fn phase(stdout: &mut impl std::io::Write, title: &str) -> std::io::Result<()> {
    writeln!(stdout, "{}", format!("# >>> {}", title).blue())
}

impl<G: GitOps, N: NivOps, H: GithubOps, P: PinStore> App<G, N, H, P> {
    /// Update pinned nix sources and open a pull request with the result.
    ///
    /// 1. Check out (or create) the bot branch.
    /// 2. Re-materialize `nix/sources.nix` with `niv init` and commit it.
    /// 3. Update one source (message `{name}: {old} -> {new}`) or all of them.
    /// 4. Commit, then force-push the branch.
    /// 5. Create the PR, unless one is already open for the branch.
    /// 6. Request reviews on a newly created PR.
    pub async fn cmd_update(&self, stdout: &mut impl std::io::Write) -> Result<()> {
        let branch = self.config.working_branch();

        phase(stdout, "Checkout or create PR branch")?;
        self.git.checkout_or_create(&branch).await?;
        writeln!(stdout, "On branch {}", branch)?;

        phase(stdout, "Update sources.nix")?;
        self.niv.init().await?;
        self.stage_and_commit(SOURCES_NIX_MESSAGE, stdout).await?;

        phase(stdout, "Update nix sources")?;
        let (commit_message, pr_title) = match &self.config.source {
            Some(source) => {
                let message = self.update_single_source(source).await?;
                (message.clone(), message)
            }
            None => {
                self.niv.update_all().await?;
                (ALL_SOURCES_MESSAGE.to_string(), self.config.pr_title.clone())
            }
        };
        self.stage_and_commit(&commit_message, stdout).await?;

        phase(stdout, "Force push")?;
        self.git.force_push(&branch).await?;
        writeln!(stdout, "Pushed {}", branch)?;

        phase(stdout, "Make PR")?;
        let pr = match self.open_pull_request(&pr_title, &branch).await? {
            PullRequestOutcome::Created(pr) => pr,
            PullRequestOutcome::AlreadyExists(message) => {
                writeln!(stdout, "{}", message)?;
                return Ok(());
            }
        };
        writeln!(stdout, "Created PR #{}: {}", pr.number, pr.url)?;

        if !self.config.reviewers.is_empty() {
            phase(stdout, "Add reviewers to PR")?;
            self.add_reviewers(&pr.id, &self.config.reviewers).await?;
            writeln!(stdout, "Requested reviews from {}", self.config.reviewers.join(", "))?;
        }

        Ok(())
    }

    async fn stage_and_commit(&self, message: &str, stdout: &mut impl std::io::Write) -> Result<()> {
        self.git.stage_all().await?;
        if self.git.commit_if_staged(&self.config.committer, message).await? {
            writeln!(stdout, "Committed: {}", message)?;
        } else {
            writeln!(stdout, "Nothing to commit")?;
        }
        Ok(())
    }
}
