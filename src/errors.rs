//! Typed errors shared by the store, the expiration policy and the player
//! session driver.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "message")]
pub enum AppError {
    /// The configuration directory or database file cannot be created or opened.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// The file was written by a newer release; nothing may be written to it.
    #[error("Store schema version {found} exceeds this program's schema version {expected}")]
    SchemaTooNew { found: i64, expected: i64 },

    #[error("Setting not found: {0}")]
    SettingNotFound(String),

    /// A setting that must hold a number holds something else.
    #[error("Setting '{name}' has an invalid value: '{value}'")]
    InvalidSetting { name: String, value: String },

    #[error("Could not launch player '{program}': {message}")]
    PlayerLaunchFailed { program: String, message: String },

    /// `None` when the player was terminated by a signal.
    #[error("Player exited abnormally (code {code:?})")]
    PlayerAbnormalExit { code: Option<i32> },

    /// Bookmarks are keyed by UTF-8 text; the path cannot be stored losslessly.
    #[error("Path is not valid UTF-8: {0}")]
    InvalidPath(String),

    #[error("Malformed status line: {0}")]
    MalformedStatusLine(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("Migration to schema version {version} failed: {message}")]
    Migration { version: i64, message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("File system error: {0}")]
    FileSystem(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether the invocation has to stop. Abnormal player exits and
    /// malformed lines only degrade the result.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            AppError::PlayerAbnormalExit { .. } | AppError::MalformedStatusLine(_)
        )
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Database(e.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::FileSystem(e.to_string())
    }
}

impl From<regex::Error> for AppError {
    fn from(e: regex::Error) -> Self {
        AppError::InvalidPattern(e.to_string())
    }
}

impl From<chrono::ParseError> for AppError {
    fn from(e: chrono::ParseError) -> Self {
        AppError::Database(format!("Invalid timestamp: {}", e))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Internal(format!("Serialization error: {}", e))
    }
}
