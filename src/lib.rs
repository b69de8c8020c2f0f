//! # Identic
//!
//! Large-payload binary equality verification in 100% safe Rust.
//!
//! Identic answers one question — are two byte sequences identical? — for
//! inputs ranging from small in-memory buffers to streams of hundreds of
//! gigabytes, with bounded memory, parallel chunk comparison, and
//! cooperative cancellation.
//!
//! ## Features
//!
//! - **Lane Comparison**: byte ranges compared a full lane at a time, with
//!   a scalar tail for the remainder
//! - **Parallel Chunks**: large buffers fan out across a rayon worker pool
//!   and short-circuit on the first mismatch
//! - **Streaming**: two reader threads feed bounded queues, keeping memory
//!   flat regardless of input size
//! - **Cancellation**: a shared [`CancelToken`] stops work at the next
//!   chunk or lane checkpoint; an interrupted comparison always reports
//!   not-equal
//!
//! ## Example
//!
//! ```rust
//! use identic::{bytes_eq, CancelToken, StreamComparer};
//! use std::io::Cursor;
//!
//! // In-memory comparison
//! assert!(bytes_eq(b"same bytes", b"same bytes"));
//! assert!(!bytes_eq(b"same bytes", b"same Bytes"));
//!
//! // Streaming comparison over seekable sources
//! let comparer = StreamComparer::new();
//! let cancel = CancelToken::new();
//! let report = comparer
//!     .compare(Cursor::new(vec![7u8; 4096]), Cursor::new(vec![7u8; 4096]), &cancel)
//!     .unwrap();
//! assert!(report.is_equal());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

mod cancel;
mod error;
mod parallel;
pub mod stream;
#[cfg(feature = "async")]
pub mod stream_async;
mod vector;

pub use cancel::CancelToken;
pub use error::{IdenticError, Result};
pub use parallel::{bytes_eq_parallel, DEFAULT_PARALLEL_CHUNK_SIZE};
pub use stream::{
    ReaderOutcome, Source, StreamComparer, StreamComparerBuilder, StreamConfig, StreamLen,
    StreamReport, Verdict, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_IN_FLIGHT,
};
#[cfg(feature = "async")]
pub use stream_async::AsyncStreamComparer;
pub use vector::{bytes_eq, bytes_eq_cancellable, LANE_WIDTH};
