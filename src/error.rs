//! Error types for the tactile tutor client

use thiserror::Error;

/// Result type alias for tutor operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the tutor client
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Camera / frame source error
    #[error("camera error: {0}")]
    Camera(String),

    /// Audio playback error
    #[error("audio error: {0}")]
    Audio(String),

    /// Narration synthesis error
    #[error("narration error: {0}")]
    Narration(String),

    /// Detection service rejected the session or request
    #[error("detection error: {0}")]
    Detection(String),

    /// Session state error (command not valid for the current mode)
    #[error("session error: {0}")]
    Session(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
