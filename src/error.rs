//! Error taxonomy for import processing.
//!
//! Every failure is scoped to the single source being processed, except
//! [`ImportError::StoreUnavailable`], which aborts the whole batch before any
//! source is touched. None of these are process-fatal.

use thiserror::Error;

/// Result type for import pipeline operations.
pub type Result<T> = std::result::Result<T, ImportError>;

/// A classified per-source (or, for `StoreUnavailable`, per-batch) failure.
///
/// Collaborators report plain `anyhow` errors; the orchestrator classifies
/// them by the boundary they crossed. Records without a usable identity are
/// not errors at all and never surface here.
#[derive(Debug, Error)]
pub enum ImportError {
    /// Network failure, timeout, non-success status, or a redirect to the
    /// login page during the freshness check or download.
    #[error("transport error: {0:#}")]
    Transport(anyhow::Error),

    /// The downloaded contact file was malformed or contained no records.
    #[error("parse error: {0:#}")]
    Parse(anyhow::Error),

    /// The contact store rejected a single mutation. Processing of the
    /// affected source stops; already-applied fields are not rolled back.
    #[error("store write error: {0:#}")]
    StoreWrite(anyhow::Error),

    /// The contact store could not be read at all. The one batch-fatal case.
    #[error("contact store unavailable: {0:#}")]
    StoreUnavailable(anyhow::Error),
}
