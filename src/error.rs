//! Error types for the media kiosk.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the media kiosk.
#[derive(Error, Debug)]
pub enum Error {
    // File system errors
    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    // Catalog errors
    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("Failed to write catalog {path}: {reason}")]
    CatalogWrite { path: String, reason: String },

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    Config(String),

    // Player errors
    #[error("Failed to launch player: {0}")]
    PlayerLaunch(String),

    #[error("Player IPC failed: {0}")]
    PlayerIpc(String),

    #[error("Player is not running")]
    PlayerNotRunning,

    // Input errors
    #[error("Unknown input action: {0}")]
    UnknownAction(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
