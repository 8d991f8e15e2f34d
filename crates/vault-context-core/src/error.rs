//! Typed failures for vault reads and context assembly.
//!
//! Required-target failures ([`VaultError::NotFound`],
//! [`VaultError::DailyNoteNotFound`], [`VaultError::InvalidPath`],
//! [`VaultError::NoResults`]) propagate unchanged to the tool layer. Their
//! messages are written for the caller (often an LLM) to self-correct from
//! without looking at logs.

use chrono::NaiveDate;
use thiserror::Error;

/// Convenience alias used across the core crate.
pub type Result<T> = std::result::Result<T, VaultError>;

#[derive(Error, Debug)]
pub enum VaultError {
    /// No document exists at the given vault-relative path.
    #[error("note not found: {0}")]
    NotFound(String),

    /// None of the daily-note path candidates exist.
    #[error("daily note not found for {date}. Tried: {}", .tried.join(", "))]
    DailyNoteNotFound { date: NaiveDate, tried: Vec<String> },

    /// The path resolves outside the vault root.
    #[error("invalid path '{0}': resolves outside the vault root")]
    InvalidPath(String),

    /// Every target of a batch read failed.
    #[error("no notes could be read from targets list (tried: {})", .tried.join(", "))]
    NoResults { tried: Vec<String> },

    #[error("invalid date '{0}': expected YYYY-MM-DD or \"today\"")]
    InvalidDate(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl VaultError {
    /// True for both the single-path and the daily-note flavour of "not found".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            VaultError::NotFound(_) | VaultError::DailyNoteNotFound { .. }
        )
    }

    /// Machine-readable code used by the HTTP error contract.
    pub fn code(&self) -> &'static str {
        match self {
            VaultError::NotFound(_)
            | VaultError::DailyNoteNotFound { .. }
            | VaultError::NoResults { .. } => "not_found",
            VaultError::InvalidPath(_) => "invalid_path",
            VaultError::InvalidDate(_) | VaultError::InvalidArgument(_) => "bad_request",
            VaultError::Io { .. } => "tool_error",
        }
    }

    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        VaultError::Io {
            path: path.into(),
            source,
        }
    }
}
