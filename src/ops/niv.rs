#![allow(async_fn_in_trait)]

use std::path;

use anyhow::Result;
#[cfg(test)]
use mockall::automock;
use tracing::instrument;

use super::command::CommandRunner;

/// Operations of the niv pinning tool
#[cfg_attr(test, automock)]
pub trait NivOps {
    /// Rewrite `nix/sources.nix` to the version bundled with niv.
    async fn init(&self) -> Result<()>;

    /// Update every pinned source.
    async fn update_all(&self) -> Result<()>;

    /// Update a single pinned source.
    async fn update_source(&self, name: &str) -> Result<()>;
}

/// Real implementation that calls the niv CLI
pub struct RealNiv {
    runner: CommandRunner,
}

impl RealNiv {
    pub fn new(path: path::PathBuf) -> Self {
        Self {
            runner: CommandRunner::new(path),
        }
    }
}

impl NivOps for RealNiv {
    #[instrument(skip(self))]
    async fn init(&self) -> Result<()> {
        self.runner.run(&["niv", "init"], true).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn update_all(&self) -> Result<()> {
        self.runner.run(&["niv", "update"], true).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn update_source(&self, name: &str) -> Result<()> {
        self.runner.run(&["niv", "update", name], true).await?;
        Ok(())
    }
}
