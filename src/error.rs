//! Error types for tasksync
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, bad config)
//! - 3: Rejected by the API (validation, not found, auth, conflict, logic failure)
//! - 4: Operation failed (transport, malformed response, local IO)

use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;

/// Message used when neither the server nor the error carries anything better.
pub const FALLBACK_MESSAGE: &str = "Something went wrong";

/// Exit codes for the tasksync CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const REMOTE_REJECTED: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for tasksync operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Config file already exists: {0}")]
    ConfigExists(PathBuf),

    // Rejected by the API (exit code 3)
    #[error("{message}")]
    Validation {
        message: String,
        errors: BTreeMap<String, Vec<String>>,
    },

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Rejected(String),

    // Operation failures (exit code 4)
    #[error("{0}")]
    Transport(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidArgument(_) | Error::InvalidConfig(_) | Error::ConfigExists(_) => {
                exit_codes::USER_ERROR
            }

            Error::Validation { .. }
            | Error::NotFound(_)
            | Error::Unauthorized(_)
            | Error::Forbidden(_)
            | Error::Conflict(_)
            | Error::Rejected(_) => exit_codes::REMOTE_REJECTED,

            Error::Transport(_)
            | Error::InvalidResponse(_)
            | Error::Http(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Human-readable message for display next to the task list.
    ///
    /// API failures carry the server's message verbatim; everything else
    /// falls back to its `Display` form, and a blank message becomes
    /// [`FALLBACK_MESSAGE`].
    pub fn message(&self) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            FALLBACK_MESSAGE.to_string()
        } else {
            message
        }
    }

    /// Structured details for JSON error output
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::Validation { errors, .. } if !errors.is_empty() => {
                Some(serde_json::json!({ "errors": errors }))
            }
            Error::InvalidConfig(message) => Some(serde_json::json!({ "message": message })),
            Error::ConfigExists(path) => {
                Some(serde_json::json!({ "path": path.to_string_lossy() }))
            }
            _ => None,
        }
    }
}

/// Result type alias for tasksync operations
pub type Result<T> = std::result::Result<T, Error>;
