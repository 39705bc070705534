//! Error types for the ledger
//!
//! All errors use thiserror for structured error handling.
//! These errors can be serialized for notification consumers.

use crate::sync::remote::RemoteError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    /// Local transaction or query failure. Nothing from the attempted unit
    /// of work is visible after this is returned.
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("App is offline")]
    Offline,

    #[error("Remote store rejected {operation}: {source}")]
    RemoteWrite {
        operation: String,
        #[source]
        source: RemoteError,
    },

    #[error("Remote fetch failed: {0}")]
    RemoteRead(RemoteError),

    #[error("{0}")]
    Configuration(String),

    #[error("No workers found. Please add workers in Settings.")]
    EmptyRoster,

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("{0}")]
    Generic(String),
}

/// How loudly an error should be reported to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl AppError {
    pub fn severity(&self) -> Severity {
        match self {
            AppError::EmptyRoster => Severity::Info,
            AppError::Offline | AppError::Configuration(_) => Severity::Warning,
            _ => Severity::Error,
        }
    }

    pub fn missing_agreement(name: &str) -> Self {
        AppError::Configuration(format!(
            "Could not find '{}' details locally. Please go online to sync.",
            name
        ))
    }

    pub fn missing_settings() -> Self {
        AppError::Configuration(
            "Agreement or settings not found locally. Please go online once to sync.".to_string(),
        )
    }

    pub fn missing_start_date() -> Self {
        AppError::Configuration(
            "Agreement Start Date not set. Please set it in Settings and sync.".to_string(),
        )
    }
}

impl From<RemoteError> for AppError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Offline => AppError::Offline,
            other => AppError::RemoteRead(other),
        }
    }
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
