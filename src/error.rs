//! Error types for identic operations.

use thiserror::Error;

use crate::stream::Source;

/// Errors that can occur during identic operations.
///
/// Note that an ordinary "not equal" outcome is never an error: mismatches,
/// length differences, and cancellations are all reported through
/// [`Verdict`](crate::Verdict). Errors cover the cases where the engine
/// could not run at all, or a joined reader thread died.
#[derive(Error, Debug)]
pub enum IdenticError {
    /// I/O error while querying stream lengths or spawning readers.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A reader thread panicked before it could report an outcome.
    #[error("reader thread for stream {0:?} panicked")]
    ReaderPanicked(Source),
}

/// Result type for identic operations.
pub type Result<T> = std::result::Result<T, IdenticError>;
