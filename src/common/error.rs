//! Error types for the test automation client
//!
//! Only failures at the task boundary travel through this type. Checkpoint,
//! step and case failures are recorded in the report instead.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the atf client
#[derive(Error, Debug)]
pub enum Error {
    // === Artifact Resolution Errors ===
    #[error("{kind} '{id}' not found")]
    NotFound { kind: ArtifactKind, id: String },

    #[error("Remote service error: {0}")]
    Transport(String),

    #[error("Invalid {kind} '{id}': {reason}")]
    InvalidArtifact {
        kind: ArtifactKind,
        id: String,
        reason: String,
    },

    // === Report Errors ===
    #[error("Report already finalized; counts are frozen")]
    AlreadyFinalized,

    #[error("Failed to write report '{path}': {error}")]
    ReportWrite { path: String, error: String },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Invalid value for '{field}': {reason}")]
    InvalidSetting { field: String, reason: String },

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Which kind of artifact an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Task,
    Case,
    Product,
    Suite,
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactKind::Task => write!(f, "Task"),
            ArtifactKind::Case => write!(f, "Case"),
            ArtifactKind::Suite => write!(f, "Suite"),
            ArtifactKind::Product => write!(f, "Product"),
        }
    }
}

impl Error {
    /// Create a not found error for a task
    pub fn task_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            kind: ArtifactKind::Task,
            id: id.to_string(),
        }
    }

    /// Create a not found error for a case
    pub fn case_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            kind: ArtifactKind::Case,
            id: id.to_string(),
        }
    }

    /// Create an invalid artifact error
    pub fn invalid_artifact(kind: ArtifactKind, id: &str, reason: impl Into<String>) -> Self {
        Self::InvalidArtifact {
            kind,
            id: id.to_string(),
            reason: reason.into(),
        }
    }

    /// Create an invalid setting error
    pub fn invalid_setting(field: &str, reason: &str) -> Self {
        Self::InvalidSetting {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether the error means the artifact does not exist (as opposed to
    /// existing but being unreadable)
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = Error::case_not_found("1024");
        assert_eq!(err.to_string(), "Case '1024' not found");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_transport_is_not_not_found() {
        assert!(!Error::Transport("connection reset".to_string()).is_not_found());
    }
}
