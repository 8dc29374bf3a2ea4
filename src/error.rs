use thiserror::Error;

/// Failures raised by the update flow.
///
/// Operations return `anyhow::Result`, so callers that need to tell these
/// apart use `err.downcast_ref::<Error>()`.
#[derive(Debug, Error)]
pub enum Error {
    /// An external command exited with a non-zero status.
    #[error("command `{}` exited with status {exit_code}: {}", .argv.join(" "), .stderr.trim())]
    Process {
        argv: Vec<String>,
        exit_code: i32,
        stderr: String,
    },

    /// Neither checking out nor creating the branch worked.
    #[error("failed to checkout or create branch {branch}")]
    Branch { branch: String },

    /// The GraphQL response carried errors.
    #[error("GitHub API error: {}", .messages.join("; "))]
    Api { messages: Vec<String> },

    #[error("{what} not found: {reason}")]
    NotFound { what: String, reason: String },

    #[error("{0}")]
    Config(String),

    #[error("remote URL is not a GitHub URL: {url}")]
    UnsupportedRemote { url: String },
}

impl Error {
    pub(crate) fn api(message: impl Into<String>) -> Self {
        Self::Api {
            messages: vec![message.into()],
        }
    }

    pub(crate) fn not_found(what: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NotFound {
            what: what.into(),
            reason: reason.into(),
        }
    }
}
