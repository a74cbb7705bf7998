//! Error types for the redaction core.
//!
//! This module defines the errors that can surface from detection, location and
//! redaction. Per-item problems (a validator rejecting a match, a span that cannot be
//! located on the page) are not errors: they are counted in the detection statistics
//! and logged. Only the variants below cross an API boundary.

/// Result type alias for redaction core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during detection and redaction.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A user-supplied pattern failed to compile
    #[error("Invalid pattern '{name}': {reason}")]
    InvalidPattern {
        /// Pattern name as given by the user
        name: String,
        /// Compiler message
        reason: String,
    },

    /// A single backend operation failed (field deletion, redaction region).
    ///
    /// Callers recover from this: the job continues and the failure is counted.
    #[error("Backend operation '{operation}' failed: {reason}")]
    Backend {
        /// Name of the backend operation
        operation: String,
        /// Backend-provided reason
        reason: String,
    },

    /// Whole-document backend failure (load, sanitize or final serialization).
    ///
    /// This aborts the job; no partial output is produced.
    #[error("Fatal backend failure during {stage}: {reason}")]
    FatalBackend {
        /// Job stage that failed
        stage: String,
        /// Backend-provided reason
        reason: String,
    },

    /// The token classifier is not loaded or has been disposed
    #[error("Token classifier unavailable: {0}")]
    ClassifierUnavailable(String),

    /// The job was cancelled through its cancellation token
    #[error("Operation cancelled")]
    Cancelled,

    /// Malformed XML in a container part
    #[error("XML error: {0}")]
    Xml(String),

    /// Malformed container archive
    #[cfg(feature = "office")]
    #[error("Archive error: {0}")]
    Archive(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Build a recoverable backend error.
    pub fn backend(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Backend {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Build a fatal backend error.
    pub fn fatal(stage: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::FatalBackend {
            stage: stage.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error aborts a whole redaction job.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::Backend { .. } | Error::ClassifierUnavailable(_))
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Xml(err.to_string())
    }
}

#[cfg(feature = "office")]
impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Error::Archive(err.to_string())
    }
}
