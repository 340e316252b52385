// SPDX-FileCopyrightText: 2026 Libris contributors
// SPDX-License-Identifier: MIT

//! Error types for record store operations.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for record store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during record store operations.
///
/// `Validation`, `NotFound` and `Conflict` are business failures and carry a
/// message meant for the caller. Everything else is a storage failure.
#[derive(Error, Debug)]
pub enum Error {
    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(rusqlite::Error),

    /// Failed to open database with context
    #[error("Failed to open database at '{path}': {source}")]
    DatabaseOpen {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Database file not found
    #[error("Database not found at: {0}")]
    DatabaseNotFound(PathBuf),

    /// Input failed field validation
    #[error("Validation failed: {}", join_field_errors(.errors))]
    Validation { errors: Vec<FieldError> },

    /// Referenced record is absent
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    /// Business rule violation
    #[error("{reason}")]
    Conflict { reason: String },

    /// Another connection holds the write lock and the busy timeout expired
    #[error("Database is busy: {0}")]
    Busy(rusqlite::Error),
}

impl Error {
    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }

    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::Conflict {
            reason: reason.into(),
        }
    }

    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            errors: vec![FieldError::new(field, message)],
        }
    }

    /// True for the three business kinds that abort a unit of work on purpose.
    pub fn is_business(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. } | Self::NotFound { .. } | Self::Conflict { .. }
        )
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked) => {
                Self::Busy(err)
            }
            _ => Self::Sqlite(err),
        }
    }
}

/// A single field validation failure.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn join_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
