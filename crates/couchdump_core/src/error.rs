//! Error types for dump and restore.

use couchdump_http::HttpError;
use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Process outcome categories shared by both tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitKind {
    /// Everything succeeded.
    Success,
    /// Invalid or missing arguments, or help was requested.
    Usage,
    /// The server or network misbehaved, or documents failed to restore.
    Remote,
}

impl ExitKind {
    /// Returns the process exit code.
    pub fn code(self) -> u8 {
        match self {
            ExitKind::Success => 0,
            ExitKind::Usage => 1,
            ExitKind::Remote => 2,
        }
    }
}

/// Errors that can occur while dumping or restoring.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An option that needs a value was given without one.
    #[error("option -{option} requires a value")]
    MissingValue {
        /// Option name without dashes.
        option: String,
    },

    /// Arguments failed validation.
    #[error("{0}")]
    Usage(String),

    /// No response could be obtained.
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    /// The server answered with a status the operation does not accept.
    #[error("unsupported response when {action} (http status code = {status}) {body}")]
    UnexpectedStatus {
        /// What was being attempted.
        action: String,
        /// Received status code.
        status: u16,
        /// Response body, trimmed.
        body: String,
    },

    /// The server answered with a body of the wrong shape.
    #[error("malformed response when {action}: {message}")]
    MalformedResponse {
        /// What was being attempted.
        action: String,
        /// Description of the problem.
        message: String,
    },

    /// `_all_docs` listed nothing.
    #[error("no documents found in db '{database}'")]
    NoDocuments {
        /// Database name.
        database: String,
    },

    /// Restore target already holds documents and force was not given.
    #[error(
        "database '{database}' has {doc_count} documents, refusing to restore without -F force flag"
    )]
    NonEmptyDatabase {
        /// Database name.
        database: String,
        /// Documents currently in the database.
        doc_count: u64,
    },

    /// The bulk write reported per-document failures.
    #[error("there were {count} errors while restoring documents")]
    DocumentWrites {
        /// Number of failed documents.
        count: usize,
    },

    /// I/O error on the dump output or input file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Creates a usage error.
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }

    /// Creates an unexpected status error.
    pub fn unexpected_status(action: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self::UnexpectedStatus {
            action: action.into(),
            status,
            body: body.into(),
        }
    }

    /// Creates a malformed response error.
    pub fn malformed(action: impl Into<String>, message: impl ToString) -> Self {
        Self::MalformedResponse {
            action: action.into(),
            message: message.to_string(),
        }
    }

    /// Returns the exit category for this error.
    pub fn exit_kind(&self) -> ExitKind {
        match self {
            CoreError::MissingValue { .. } | CoreError::Usage(_) => ExitKind::Usage,
            _ => ExitKind::Remote,
        }
    }
}
