// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

/// Exit status used for every signal-driven shutdown (including interrupt
/// escalation).
pub const EXIT_SIGNAL: i32 = 3;

/// Exit status used when the supervisor cannot determine what to watch.
pub const EXIT_QUERY_FAILURE: i32 = 4;

/// Exit status for any other startup failure (bad config, bad flags).
pub const EXIT_FAILURE: i32 = 1;

#[derive(Error, Debug)]
pub enum IbazelError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Watch error: {0}")]
    WatchError(String),

    #[error("No Bazel workspace found at or above {0}")]
    WorkspaceNotFound(String),

    #[error("{verb} failed: {detail}")]
    CommandFailed { verb: String, detail: String },

    #[error("Process error: {0}")]
    ProcessError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl IbazelError {
    /// Errors that leave the control loop without a valid watch list.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            IbazelError::QueryError(_)
                | IbazelError::WatchError(_)
                | IbazelError::WorkspaceNotFound(_)
        )
    }

    /// Process exit status the binary should use for this error.
    pub fn exit_code(&self) -> i32 {
        if self.is_fatal() {
            EXIT_QUERY_FAILURE
        } else {
            EXIT_FAILURE
        }
    }
}

impl From<notify::Error> for IbazelError {
    fn from(err: notify::Error) -> Self {
        IbazelError::WatchError(err.to_string())
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, IbazelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_and_watch_errors_exit_with_four() {
        assert_eq!(IbazelError::QueryError("boom".into()).exit_code(), 4);
        assert_eq!(IbazelError::WatchError("boom".into()).exit_code(), 4);
        assert_eq!(IbazelError::WorkspaceNotFound("/".into()).exit_code(), 4);
    }

    #[test]
    fn command_failures_are_not_fatal() {
        let err = IbazelError::CommandFailed {
            verb: "build".into(),
            detail: "exit status 1".into(),
        };
        assert!(!err.is_fatal());
        assert_eq!(err.exit_code(), EXIT_FAILURE);
    }
}
