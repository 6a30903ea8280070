//! Error types for volley

use thiserror::Error;

/// Main error type for volley.
///
/// Each variant maps to an abort scope: `ConfigError` is fatal to the whole
/// invocation, `StateError` aborts the current target, `ConnectionError` and
/// `CommandError` abort the current branch, and `NotificationError` is only
/// ever logged.
#[derive(Error, Debug)]
pub enum VolleyError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Command error: {0}")]
    CommandError(String),

    #[error("State error: {0}")]
    StateError(String),

    #[error("Notification error: {0}")]
    NotificationError(String),
}

impl From<anyhow::Error> for VolleyError {
    fn from(err: anyhow::Error) -> Self {
        VolleyError::CommandError(err.to_string())
    }
}
