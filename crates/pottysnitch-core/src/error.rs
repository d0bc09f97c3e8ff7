//! Error types for the pottysnitch service.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the pottysnitch service.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error other than a missing backing file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backing file exists but does not hold a JSON array of submissions.
    #[error("Corrupt location store at {}: {reason}", path.display())]
    CorruptStore {
        /// Path of the backing file.
        path: PathBuf,
        /// What was wrong with its contents.
        reason: String,
    },

    /// A submission was rejected by validation or could not be decoded.
    #[error("Invalid submission: {message}")]
    InvalidSubmission {
        /// Description of the problem.
        message: String,
    },

    /// Internal error (unexpected state).
    #[error("Internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl Error {
    /// Returns `true` if the error was caused by the caller's input rather than the service.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidSubmission { .. })
    }

    /// Creates an internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Creates an invalid submission error.
    #[must_use]
    pub fn invalid_submission(message: impl Into<String>) -> Self {
        Self::InvalidSubmission {
            message: message.into(),
        }
    }

    /// Creates a corrupt store error for the given backing file.
    #[must_use]
    pub fn corrupt_store(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CorruptStore {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_classification() {
        assert!(Error::invalid_submission("missing name").is_client_error());
        assert!(!Error::internal("boom").is_client_error());
        assert!(!Error::corrupt_store("data/locations.json", "not an array").is_client_error());

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(!Error::from(io).is_client_error());
    }

    #[test]
    fn test_corrupt_store_message_names_path() {
        let err = Error::corrupt_store("data/locations.json", "expected an array");
        let message = err.to_string();
        assert!(message.contains("data/locations.json"));
        assert!(message.contains("expected an array"));
    }
}
