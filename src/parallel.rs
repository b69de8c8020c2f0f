//! Chunked parallel equality over large in-memory buffers.
//!
//! Buffers bigger than one chunk are partitioned into fixed-size chunks and
//! compared concurrently on the rayon pool. All workers share a single
//! one-way mismatch flag: a worker checks it before touching its chunk
//! (skipping work a sibling already invalidated) and raises it when its own
//! chunk differs. The boolean outcome is deterministic even though worker
//! scheduling is not.

use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;

use crate::vector;

/// Default chunk size for parallel comparison (1 MiB).
///
/// Measured sweet spot: slightly larger chunks win on very large inputs,
/// but 1 MiB holds up across the board.
pub const DEFAULT_PARALLEL_CHUNK_SIZE: usize = 1 << 20;

/// Compare two byte slices chunk-parallel.
///
/// Inputs that fit a single chunk delegate straight to [`bytes_eq`]
/// (spinning up the pool would cost more than the scan). For any
/// `chunk_size >= 1` the result equals [`bytes_eq`] on the same input.
///
/// # Panics
///
/// Panics if `chunk_size` is zero.
///
/// # Example
///
/// ```rust
/// use identic::bytes_eq_parallel;
///
/// let a = vec![0xABu8; 4 << 20];
/// let mut b = a.clone();
/// assert!(bytes_eq_parallel(&a, &b, 1 << 20));
///
/// b[3_000_000] ^= 1;
/// assert!(!bytes_eq_parallel(&a, &b, 1 << 20));
/// ```
///
/// [`bytes_eq`]: crate::bytes_eq
#[must_use]
pub fn bytes_eq_parallel(a: &[u8], b: &[u8], chunk_size: usize) -> bool {
    assert!(chunk_size >= 1, "chunk size must be at least 1");

    if a.len() != b.len() {
        return false;
    }
    if a.len() <= chunk_size {
        return vector::bytes_eq(a, b);
    }

    let mismatch = AtomicBool::new(false);
    eq_parallel_with_flag(a, b, chunk_size, &mismatch)
}

/// Chunk-parallel equality sharing an external stop flag.
///
/// The stream engine passes its mismatch signal here so that a fault or
/// cancellation raised elsewhere aborts lane scans already in flight, and
/// so that a mismatch found here is visible to the readers immediately.
/// Callers guarantee `a.len() == b.len()`.
pub(crate) fn eq_parallel_with_flag(
    a: &[u8],
    b: &[u8],
    chunk_size: usize,
    mismatch: &AtomicBool,
) -> bool {
    debug_assert_eq!(a.len(), b.len());

    if a.len() <= chunk_size {
        return vector::eq_range_with_flag(a, b, mismatch, 0, a.len());
    }

    let chunk_count = a.len().div_ceil(chunk_size);

    (0..chunk_count).into_par_iter().for_each(|i| {
        if mismatch.load(Ordering::Relaxed) {
            return;
        }
        let start = i * chunk_size;
        let end = (start + chunk_size).min(a.len());
        if !vector::eq_range_with_flag(a, b, mismatch, start, end) {
            mismatch.store(true, Ordering::Relaxed);
        }
    });

    !mismatch.load(Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_chunk_delegates_to_lane_compare() {
        let a = vec![1u8; 512];
        let b = vec![1u8; 512];
        assert!(bytes_eq_parallel(&a, &b, 1024));
    }

    #[test]
    fn multi_chunk_equal() {
        let a: Vec<u8> = (0..1_000_000).map(|i| (i % 256) as u8).collect();
        assert!(bytes_eq_parallel(&a, &a.clone(), 4096));
    }

    #[test]
    fn multi_chunk_difference_found() {
        let a = vec![0u8; 1_000_000];
        let mut b = a.clone();
        b[999_999] = 1;
        assert!(!bytes_eq_parallel(&a, &b, 4096));
    }

    #[test]
    fn difference_in_middle_chunk() {
        let a = vec![0u8; 1 << 20];
        let mut b = a.clone();
        b[1 << 19] = 0xFF;
        assert!(!bytes_eq_parallel(&a, &b, 1 << 16));
    }

    #[test]
    fn length_mismatch_short_circuits() {
        let a = vec![0u8; 100];
        let b = vec![0u8; 99];
        assert!(!bytes_eq_parallel(&a, &b, 16));
    }

    #[test]
    fn chunk_size_one_works() {
        let a = b"tiny".to_vec();
        let mut b = a.clone();
        assert!(bytes_eq_parallel(&a, &b, 1));

        b[2] = b'M';
        assert!(!bytes_eq_parallel(&a, &b, 1));
    }

    #[test]
    #[should_panic(expected = "chunk size must be at least 1")]
    fn zero_chunk_size_rejected() {
        let _ = bytes_eq_parallel(b"a", b"a", 0);
    }

    #[test]
    fn pre_raised_flag_reports_unequal() {
        let a = vec![5u8; 100_000];
        let mismatch = AtomicBool::new(true);
        assert!(!eq_parallel_with_flag(&a, &a.clone(), 4096, &mismatch));
    }

    #[test]
    fn flag_raised_on_mismatch() {
        let a = vec![0u8; 100_000];
        let mut b = a.clone();
        b[50_000] = 1;

        let mismatch = AtomicBool::new(false);
        assert!(!eq_parallel_with_flag(&a, &b, 4096, &mismatch));
        assert!(mismatch.load(Ordering::Relaxed));
    }

    #[test]
    fn large_identical_buffers_many_workers() {
        // 200 MiB of pseudo-random data, 1 MiB chunks.
        let len = 200 << 20;
        let mut a = vec![0u8; len];
        let mut state = 0x9E37_79B9_7F4A_7C15u64;
        for chunk in a.chunks_mut(8) {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let bytes = state.to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }

        assert!(bytes_eq_parallel(&a, &a.clone(), DEFAULT_PARALLEL_CHUNK_SIZE));
    }
}
