//! Error types for kiln.

use crate::platform::Platform;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // Verification errors
    #[error("Verification failed on {platform} during {step}: {message}")]
    Verification {
        platform: Platform,
        step: String,
        message: String,
    },

    // Release build errors
    #[error("Release build failed on {platform}: {message}")]
    Build { platform: Platform, message: String },

    // Packaging errors
    #[error("Packaging failed on {platform}: {message}")]
    Packaging { platform: Platform, message: String },

    // Publish errors
    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    // Secret errors
    #[error("Secret not found: {0}")]
    SecretNotFound(String),

    // Configuration errors
    #[error("Invalid release matrix: {0}")]
    InvalidMatrix(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown platform: {0}")]
    UnknownPlatform(String),

    #[error("Unknown event kind: {0}")]
    UnknownEvent(String),

    // Command execution
    #[error("Command `{program}` could not be started: {message}")]
    Spawn { program: String, message: String },

    // Infrastructure errors
    #[error("Network error: {0}")]
    Network(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // Generic
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
