//! Directory and resolution error types.
//!
//! Messages must not leak bind credentials.

use std::sync::Arc;

use idref_core::{CanonicalDn, ClassificationError, IdentifierFormat};
use thiserror::Error;

/// Errors raised by a directory backend or by resolver configuration.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Connection to the directory failed.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The directory did not answer in time.
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// The directory rejected the request (bad filter, size limit, ...).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A returned entry could not be interpreted.
    #[error("Invalid directory record: {0}")]
    InvalidRecord(String),

    /// Internal error.
    #[error("Internal directory error: {0}")]
    Internal(String),
}

impl DirectoryError {
    /// Creates a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates a connection error.
    #[must_use]
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a timeout error.
    #[must_use]
    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout(operation.into())
    }

    /// Creates a protocol error.
    #[must_use]
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Creates an invalid record error.
    #[must_use]
    pub fn invalid_record(msg: impl Into<String>) -> Self {
        Self::InvalidRecord(msg.into())
    }

    /// Checks if retrying the same request may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout(_))
    }

    /// Checks if this is a connection-related error.
    #[must_use]
    pub const fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout(_))
    }
}

/// Result type for directory operations.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Why one identifier could not be resolved.
#[derive(Debug, Clone, Error)]
pub enum ResolutionError {
    /// The identifier matched none of the supported grammars.
    #[error(transparent)]
    Invalid(#[from] ClassificationError),

    /// No directory object carries the identifier.
    #[error("no directory object matches {format} '{value}'")]
    NotFound {
        /// The raw identifier.
        value: String,
        /// Its format.
        format: IdentifierFormat,
    },

    /// More than one directory object carries the identifier.
    #[error(
        "{format} '{value}' matches {count} directory objects; refusing to pick one",
        count = .candidates.len()
    )]
    Ambiguous {
        /// The raw identifier.
        value: String,
        /// Its format.
        format: IdentifierFormat,
        /// Every matching object.
        candidates: Vec<CanonicalDn>,
    },

    /// The directory query for the identifier's format group failed.
    #[error("directory lookup of {format} '{value}' failed: {source}")]
    DirectoryFailure {
        /// The raw identifier.
        value: String,
        /// Its format.
        format: IdentifierFormat,
        /// The error shared by the whole format group.
        source: Arc<DirectoryError>,
    },
}

impl ResolutionError {
    /// Creates a not found error.
    #[must_use]
    pub fn not_found(value: impl Into<String>, format: IdentifierFormat) -> Self {
        Self::NotFound {
            value: value.into(),
            format,
        }
    }

    /// Returns the format of the failed identifier, if it was classified.
    #[must_use]
    pub const fn format(&self) -> Option<IdentifierFormat> {
        match self {
            Self::Invalid(err) => err.attempted_format(),
            Self::NotFound { format, .. }
            | Self::Ambiguous { format, .. }
            | Self::DirectoryFailure { format, .. } => Some(*format),
        }
    }

    /// Checks if the caller may retry the resolution.
    ///
    /// Only directory failures whose cause is transient qualify; a record
    /// the directory keeps returning malformed fails the same way again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::DirectoryFailure { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// Checks if the identifier or the directory data has to be corrected.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !self.is_retryable()
    }
}
