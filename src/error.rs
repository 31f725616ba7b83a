//! Error types for the retess engine.

use thiserror::Error;

/// The error type for retess operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TessError {
    /// A dynamic array or hash table allocation failed.
    #[error("out of memory")]
    OutOfMemory,

    /// A zero-area triangle or zero-length normal was encountered where a
    /// non-degenerate one was required.
    #[error("degenerate geometry: {0}")]
    Degenerate(String),

    /// A neighbor or vertex index was out of range. Always a bug; the
    /// caller should treat this as fatal rather than retry.
    #[error("index error: {0}")]
    IndexError(String),

    /// A geometric guard rejected a candidate operation. Non-fatal — the
    /// caller simply tries the next candidate.
    #[error("rejected: {0}")]
    RangeError(String),

    /// The surface evaluator reported the parameter point as outside its
    /// domain. The site is skipped for this refinement pass.
    #[error("evaluator extrapolated outside face domain at uv=({0}, {1})")]
    Extrapolation(f64, f64),

    /// No containing frame triangle was found for a barycentric lookup;
    /// the caller falls back to the least-negative candidate cell.
    #[error("no containing frame triangle for uv=({0}, {1})")]
    NotFound(f64, f64),

    /// The calling thread does not match the face's `sameThread` guard.
    #[error("face evaluator is not safe to call from this thread")]
    WrongThread,
}

/// A specialized `Result` type for retess operations.
pub type Result<T> = std::result::Result<T, TessError>;
