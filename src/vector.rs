//! Lane-width byte equality over in-memory ranges.
//!
//! This is the innermost comparator: a pure function over two equal-length
//! byte ranges. Full lanes are compared one load at a time (the compiler
//! vectorizes the `u128` loads into SIMD compares on every mainstream
//! target), and the tail shorter than a lane falls back to byte-by-byte.
//! An optional cooperative-cancellation flag is checked once per lane.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::cancel::CancelToken;

/// Number of bytes one lane comparison processes at once.
pub const LANE_WIDTH: usize = 16;

/// Compare two byte slices for equality.
///
/// Slices of differing length are unequal by definition and return `false`
/// without scanning a single byte.
///
/// # Example
///
/// ```rust
/// use identic::bytes_eq;
///
/// assert!(bytes_eq(b"identical", b"identical"));
/// assert!(!bytes_eq(b"identical", b"different"));
/// assert!(!bytes_eq(b"short", b"longer input"));
/// ```
#[must_use]
pub fn bytes_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    eq_range(a, b, 0, a.len())
}

/// Compare two byte slices, checking a [`CancelToken`] once per lane.
///
/// A triggered token makes the comparison bail out with `false`: an
/// abandoned scan is "not confirmed equal", never "equal".
///
/// # Example
///
/// ```rust
/// use identic::{bytes_eq_cancellable, CancelToken};
///
/// let token = CancelToken::new();
/// assert!(bytes_eq_cancellable(b"abc", b"abc", &token));
///
/// token.cancel();
/// assert!(!bytes_eq_cancellable(b"abc", b"abc", &token));
/// ```
#[must_use]
pub fn bytes_eq_cancellable(a: &[u8], b: &[u8], cancel: &CancelToken) -> bool {
    if a.len() != b.len() {
        return false;
    }
    eq_range_with_flag(a, b, cancel.flag(), 0, a.len())
}

/// Equality over `a[start..end]` and `b[start..end]`.
///
/// `end` is clamped to the slice length; an empty range is trivially equal.
/// Callers guarantee `a.len() == b.len()`.
pub(crate) fn eq_range(a: &[u8], b: &[u8], start: usize, end: usize) -> bool {
    debug_assert_eq!(a.len(), b.len());
    let end = end.min(a.len());
    if start >= end {
        return true;
    }

    let mut pos = start;
    while end - pos >= LANE_WIDTH {
        if lane_at(a, pos) != lane_at(b, pos) {
            return false;
        }
        pos += LANE_WIDTH;
    }

    a[pos..end] == b[pos..end]
}

/// Equality over a range with a shared stop flag checked once per lane.
///
/// The flag doubles as mismatch signal and cancellation signal: sibling
/// workers set it on a local mismatch, the stream engine sets it on fault
/// or cancel. Either way a raised flag ends the scan with `false`. The
/// flag is only ever read here, never written.
pub(crate) fn eq_range_with_flag(
    a: &[u8],
    b: &[u8],
    stop: &AtomicBool,
    start: usize,
    end: usize,
) -> bool {
    debug_assert_eq!(a.len(), b.len());
    let end = end.min(a.len());
    if start >= end {
        return true;
    }

    let mut pos = start;
    while end - pos >= LANE_WIDTH {
        if lane_at(a, pos) != lane_at(b, pos) || stop.load(Ordering::Relaxed) {
            return false;
        }
        pos += LANE_WIDTH;
    }

    while pos < end {
        if a[pos] != b[pos] || stop.load(Ordering::Relaxed) {
            return false;
        }
        pos += 1;
    }

    true
}

/// Load one lane starting at `pos`. Caller guarantees a full lane remains,
/// so the slice-to-array conversion cannot fail.
#[inline]
#[allow(clippy::missing_panics_doc)]
fn lane_at(data: &[u8], pos: usize) -> u128 {
    let lane: [u8; LANE_WIDTH] = data[pos..pos + LANE_WIDTH]
        .try_into()
        .expect("lane slice has LANE_WIDTH bytes");
    u128::from_le_bytes(lane)
}
