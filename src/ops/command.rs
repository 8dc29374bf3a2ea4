use std::path;

use anyhow::Context;
use anyhow::Result;
use tokio::process::Command;
use tracing::debug;

use crate::error::Error;

/// Captured result of a finished child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit status, or -1 when the process was killed by a signal.
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs external programs in a fixed working directory.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    path: path::PathBuf,
}

impl CommandRunner {
    pub fn new(path: path::PathBuf) -> Self {
        Self { path }
    }

    /// Run `argv` to completion and capture its output.
    ///
    /// With `check` set, a non-zero exit becomes an [`Error::Process`].
    pub async fn run(&self, argv: &[&str], check: bool) -> Result<CommandOutput> {
        let (program, args) = argv.split_first().context("Empty command line")?;

        debug!(command = %argv.join(" "), "running");
        let output = Command::new(program)
            .current_dir(&self.path)
            .args(args)
            .output()
            .await
            .with_context(|| format!("Failed to execute {} command", program))?;

        let result = CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
        };
        debug!(
            exit_code = result.exit_code,
            stdout = %result.stdout.trim_end(),
            stderr = %result.stderr.trim_end(),
            "finished"
        );

        if check && !result.success() {
            return Err(Error::Process {
                argv: argv.iter().map(|arg| arg.to_string()).collect(),
                exit_code: result.exit_code,
                stderr: result.stderr,
            }
            .into());
        }

        Ok(result)
    }
}
