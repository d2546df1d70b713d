//! Unified error types for the Solder dispatch engine.
//!
//! The taxonomy is deliberately small. Admission denial and a correlation
//! miss are ordinary control flow, not errors, and have no representation
//! here. Handler faults are contained inside their pool task and logged by
//! [`TaskPool`](crate::pool::TaskPool), never propagated.

use thiserror::Error;

// =============================================================================
// Dispatch Errors
// =============================================================================

/// Fatal errors that terminate the router loop.
///
/// This is the only error class that surfaces to the process owner.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// The inbound update stream closed.
    ///
    /// The source dropped its sender half, so no further updates can ever
    /// arrive. The router cancels the shutdown token before returning this.
    #[error("inbound update stream closed")]
    StreamClosed,
}

// =============================================================================
// Source Errors
// =============================================================================

/// Errors reported by [`UpdateSource`](crate::source::UpdateSource)
/// implementations.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Connecting to or polling the platform failed.
    #[error("source connection failed: {reason}")]
    Connection {
        /// Reason for failure.
        reason: String,
    },

    /// I/O error.
    #[error("source I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The router-side receiver is gone; nothing left to feed.
    #[error("update queue closed")]
    QueueClosed,
}

impl SourceError {
    /// Creates a connection error.
    pub fn connection(reason: impl Into<String>) -> Self {
        Self::Connection {
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for router operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Result type for update-source operations.
pub type SourceResult<T> = Result<T, SourceError>;
