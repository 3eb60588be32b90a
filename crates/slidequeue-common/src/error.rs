//! Error types used throughout slidequeue.
//!
//! [`Error`] covers genuine failures. Pausing or cancelling a scan is not a
//! failure and is modelled separately by [`Interrupt`]; a call that returns
//! [`Result`] and is stopped at a checkpoint reports
//! [`Error::Interrupted`], which [`Error::is_transient`] and
//! [`Error::is_not_found`] never match.

use std::fmt;

/// Common error type for slidequeue.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A remote call (listing, resolving, querying) failed.
    #[error("Transient network error during {operation}: {message}")]
    TransientNetwork {
        /// The remote operation that failed (e.g. "browse").
        operation: String,
        /// Human-readable error description.
        message: String,
    },

    /// A remote call did not complete within its deadline.
    #[error("{operation} timed out after {secs}s")]
    Timeout {
        /// The remote operation that timed out.
        operation: String,
        /// The deadline that was exceeded, in seconds.
        secs: u64,
    },

    /// The requested resource does not exist (any more).
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "item", "folder").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// The engine was configured in a way it cannot run with.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A mutation (favorite, edit, delete) was rejected by the source.
    #[error("Mutation {action} failed for {id}: {message}")]
    Mutation {
        /// The action that was attempted.
        action: String,
        /// The id of the item the action targeted.
        id: String,
        /// Human-readable error description.
        message: String,
    },

    /// The source does not support the requested operation.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),

    /// The call was stopped at a pause/cancel checkpoint before reaching
    /// the remote.
    #[error("Interrupted: {0}")]
    Interrupted(Interrupt),
}

impl Error {
    /// Create a new TransientNetwork error.
    pub fn transient(operation: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::TransientNetwork {
            operation: operation.into(),
            message: message.to_string(),
        }
    }

    /// Create a new Timeout error.
    pub fn timeout(operation: impl Into<String>, secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            secs,
        }
    }

    /// Create a new NotFound error.
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Create a new Configuration error.
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a new Mutation error.
    pub fn mutation(
        action: impl fmt::Display,
        id: impl Into<String>,
        message: impl fmt::Display,
    ) -> Self {
        Self::Mutation {
            action: action.to_string(),
            id: id.into(),
            message: message.to_string(),
        }
    }

    /// Create a new Internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the failure is local to one remote call and worth skipping
    /// rather than surfacing.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientNetwork { .. } | Self::Timeout { .. })
    }

    /// Whether the call was stopped by a pause or cancel.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted(_))
    }

    /// Whether the failure means the resource is gone.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Why a cooperative task stopped early.
///
/// Returned from suspension-point checks. Neither variant loses data: a paused
/// scan keeps everything it discovered and can be resumed after reattachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// The consumer is not visible; stop work until resumed.
    Paused,
    /// The consumer was torn down.
    Cancelled,
}

impl From<Interrupt> for Error {
    fn from(interrupt: Interrupt) -> Self {
        Self::Interrupted(interrupt)
    }
}

impl fmt::Display for Interrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Paused => write!(f, "paused"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::not_found("item", "photos/a.jpg");
        assert_eq!(err.to_string(), "item not found: photos/a.jpg");

        let err = Error::timeout("browse", 180);
        assert_eq!(err.to_string(), "browse timed out after 180s");

        let err = Error::transient("query_ordered", "connection reset");
        assert_eq!(
            err.to_string(),
            "Transient network error during query_ordered: connection reset"
        );

        let err = Error::configuration("no root path");
        assert_eq!(err.to_string(), "Configuration error: no root path");
    }

    #[test]
    fn test_error_classification() {
        assert!(Error::timeout("browse", 1).is_transient());
        assert!(Error::transient("browse", "boom").is_transient());
        assert!(!Error::configuration("x").is_transient());

        assert!(Error::not_found("item", "x").is_not_found());
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(Error::from(io).is_not_found());
        assert!(!Error::internal("bug").is_not_found());
    }

    #[test]
    fn test_interrupt_display() {
        assert_eq!(Interrupt::Paused.to_string(), "paused");
        assert_eq!(Interrupt::Cancelled.to_string(), "cancelled");
    }

    #[test]
    fn test_interrupt_converts_to_error() {
        let err = Error::from(Interrupt::Paused);
        assert!(err.is_interrupted());
        assert!(!err.is_transient());
        assert!(!err.is_not_found());
        assert_eq!(err.to_string(), "Interrupted: paused");
    }
}
