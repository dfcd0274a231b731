//! Error handling for BlastGrid
//!
//! Provides the error taxonomy shared by every layer of the pattern engine:
//! - Configuration errors (engine used before it was initialized)
//! - Validation failures (save/export blocked by pattern validation)
//! - Missing patterns (load against an absent key)
//! - Rendering errors (drawing surface failures)
//! - Storage errors (key-value collaborator failures)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Storage error type
///
/// Represents failures reported by the key-value collaborator that holds
/// serialized patterns.
#[derive(Error, Debug, Clone)]
pub enum StorageError {
    /// The backend rejected or failed the operation
    #[error("Storage backend error on '{key}': {reason}")]
    Backend {
        /// The key being read or written.
        key: String,
        /// The reason reported by the backend.
        reason: String,
    },

    /// Stored payload could not be encoded or decoded
    #[error("Corrupted pattern data under '{key}': {reason}")]
    Corrupted {
        /// The key holding the corrupted payload.
        key: String,
        /// The decoding failure.
        reason: String,
    },

    /// The key does not follow the `{projectId}:{siteId}` layout
    #[error("Malformed pattern key: {key}")]
    MalformedKey {
        /// The offending key.
        key: String,
    },
}

/// Main error type for BlastGrid
///
/// A unified error type for the canvas engine, the pattern store and the
/// persistence gateway. This is the primary error type used in public APIs.
#[derive(Error, Debug)]
pub enum PatternError {
    /// Engine used before a drawing surface was bound
    #[error("Configuration error: {reason}")]
    Configuration {
        /// What was missing or misconfigured.
        reason: String,
    },

    /// Save or export blocked by pattern validation
    #[error("Pattern validation failed: {}", messages.join(", "))]
    ValidationFailed {
        /// The messages of every validation error, in report order.
        messages: Vec<String>,
    },

    /// No pattern stored under the requested key
    #[error("No pattern found for project {project_id}, site {site_id}")]
    NotFound {
        /// The project identifier.
        project_id: u64,
        /// The site identifier.
        site_id: u64,
    },

    /// Unexpected failure inside the drawing surface
    #[error("Rendering error: {reason}")]
    Rendering {
        /// The failure reported by the surface.
        reason: String,
    },

    /// An argument was rejected before any state changed
    #[error("Invalid {name}: {reason}")]
    InvalidArgument {
        /// The argument name.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// Key-value collaborator failure
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// JSON encoding/decoding error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PatternError {
    /// Create a configuration error from a message
    pub fn configuration(reason: impl Into<String>) -> Self {
        PatternError::Configuration {
            reason: reason.into(),
        }
    }

    /// Create a rendering error from a message
    pub fn rendering(reason: impl Into<String>) -> Self {
        PatternError::Rendering {
            reason: reason.into(),
        }
    }

    /// Create an invalid-argument error
    pub fn invalid_argument(name: &'static str, reason: impl Into<String>) -> Self {
        PatternError::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }

    /// Whether the caller can continue after surfacing this error to the user.
    ///
    /// Configuration and rendering failures mean the engine is unusable until
    /// the caller fixes its setup.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PatternError::ValidationFailed { .. }
                | PatternError::NotFound { .. }
                | PatternError::InvalidArgument { .. }
        )
    }

    /// Check if this is a validation failure
    pub fn is_validation_failure(&self) -> bool {
        matches!(self, PatternError::ValidationFailed { .. })
    }

    /// Check if this is a missing-pattern error
    pub fn is_not_found(&self) -> bool {
        matches!(self, PatternError::NotFound { .. })
    }
}

/// Result type using PatternError
pub type Result<T> = std::result::Result<T, PatternError>;
