use std::path::PathBuf;

use thiserror::Error;

use crate::sync::Scope;

/// Errors that can occur while loading configuration, collecting or syncing secrets
#[derive(Debug, Error)]
pub enum SecretError {
    /// Configuration file could not be read or parsed
    #[error("{message} {path}: {reason}")]
    Config {
        path: PathBuf,
        message: &'static str,
        reason: String,
    },

    /// No configuration file found while searching upward
    #[error("no {names} file found in current directory or any parent directory")]
    ConfigNotFound { names: String },

    /// Secret file unreadable
    #[error("failed to load env file {path}: {message}")]
    FileError { path: PathBuf, message: String },

    /// Collaborator binary missing from PATH
    #[error("{program} not found: {hint}")]
    CommandNotFound { program: String, hint: String },

    /// Collaborator binary exited unsuccessfully or could not be spawned
    #[error("failed to {action} with {program}: {message}")]
    CommandFailed {
        program: String,
        action: String,
        message: String,
    },

    /// Collaborator produced output that could not be parsed
    #[error("failed to parse {program} output: {message}")]
    InvalidOutput { program: String, message: String },

    /// Remote mutation or listing failure. Never carries the secret value.
    #[error("failed to set {scope} secret {key}: {message}")]
    Remote {
        key: String,
        scope: Scope,
        message: String,
    },

    /// Conflicting overwrite strategies requested
    #[error("only one of --force, --skip-existing, or --confirm-overwrite can be specified")]
    InvalidPolicy,

    /// Interactive input failed for a reason other than end-of-input
    #[error("prompt error: {0}")]
    Prompt(String),
}

impl SecretError {
    /// Create a config read error
    pub fn config_read(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Config {
            path: path.into(),
            message: "failed to read config file",
            reason: reason.to_string(),
        }
    }

    /// Create a config parse error
    pub fn config_parse(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Config {
            path: path.into(),
            message: "failed to parse config file",
            reason: reason.to_string(),
        }
    }

    /// Create a subprocess failure error
    pub fn command(
        program: impl Into<String>,
        action: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::CommandFailed {
            program: program.into(),
            action: action.into(),
            message: message.into(),
        }
    }

    /// Create a remote mutation error
    pub fn remote(key: impl Into<String>, scope: Scope, message: impl Into<String>) -> Self {
        Self::Remote {
            key: key.into(),
            scope,
            message: message.into(),
        }
    }
}
