//! Cooperative cancellation for long-running comparisons.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One-way cancellation signal shared between a caller and the comparison
/// engine.
///
/// The token starts untriggered and permits a single `false -> true`
/// transition; it is never reset. Clones share the same underlying flag, so
/// a caller can hand one clone to the engine and keep another to trigger
/// from a different thread. Work observes the token cooperatively, at chunk
/// and lane granularity — once triggered, in-flight work winds down at its
/// next checkpoint and the overall result is reported as not-equal.
///
/// # Example
///
/// ```rust
/// use identic::CancelToken;
///
/// let token = CancelToken::new();
/// assert!(!token.is_cancelled());
///
/// let remote = token.clone();
/// remote.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a new, untriggered token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent; the flag never clears.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Check whether cancellation has been requested.
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Raw flag, for the lane-granularity checks inside the comparators.
    #[inline]
    pub(crate) fn flag(&self) -> &AtomicBool {
        &self.flag
    }
}
