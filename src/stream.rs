//! Bounded-memory streaming equality over two byte sources.
//!
//! This module carries the concurrency engineering of the crate. A
//! comparison runs as `LENGTH_CHECK -> STREAMING -> {EQUAL, UNEQUAL,
//! CANCELLED}`: stream lengths are verified first (unequal lengths settle
//! the question with zero bytes read), then two reader threads pull chunks
//! into bounded FIFO queues while the calling thread pairs chunks in
//! arrival order and hands each pair to the parallel comparator.
//!
//! The only shared mutable state is the pair of bounded queues (one mutex
//! plus condition variables) and two one-way signals: the caller's
//! [`CancelToken`] and the internal mismatch flag. Chunks are never mutated
//! after being enqueued. A full queue blocks its reader (backpressure); a
//! raised signal stops new reads and comparisons at the next checkpoint,
//! and in-flight work winds down without being forcibly aborted.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::cancel::CancelToken;
use crate::error::{IdenticError, Result};
use crate::parallel::{self, DEFAULT_PARALLEL_CHUNK_SIZE};

/// Default read chunk size for streaming comparison (64 MiB).
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024 * 1024;

/// Default bound on chunks held in each queue.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 4;

/// Poll interval for condition-variable waits.
///
/// Waits are re-armed on this tick so an externally triggered cancel token
/// can never strand a parked thread, even without a matching notify.
const WAIT_TICK: Duration = Duration::from_millis(25);

/// Identifies one of the two streams under comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// The first stream.
    A,
    /// The second stream.
    B,
}

/// Byte source with a cheap total-length query.
///
/// Blanket-implemented for every [`Seek`] type (files, cursors) by seeking
/// to the end and restoring the position. Streams are expected to be
/// positioned at the start; the engine reads forward from the current
/// position.
pub trait StreamLen {
    /// Total length of the underlying stream in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying length query fails.
    fn byte_len(&mut self) -> io::Result<u64>;
}

impl<T: Seek> StreamLen for T {
    fn byte_len(&mut self) -> io::Result<u64> {
        let pos = self.stream_position()?;
        let end = self.seek(SeekFrom::End(0))?;
        if pos != end {
            self.seek(SeekFrom::Start(pos))?;
        }
        Ok(end)
    }
}

/// Final state of a streaming comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Every byte matched.
    Equal,
    /// A length mismatch, content mismatch, or reader fault was found.
    Unequal,
    /// Cancellation was requested before the comparison could finish.
    /// Reported to callers as not-equal: an inconclusive result must never
    /// be mistaken for confirmed equality.
    Cancelled,
}

impl Verdict {
    /// True only for [`Verdict::Equal`].
    #[must_use]
    pub const fn is_equal(self) -> bool {
        matches!(self, Self::Equal)
    }
}

/// How one reader thread ended.
///
/// This is the out-of-band fault channel: an I/O error inside a reader
/// escalates the comparison to [`Verdict::Unequal`], but the error itself
/// is only visible here, not through the verdict.
#[derive(Debug)]
pub struct ReaderOutcome {
    /// Which stream this reader consumed.
    pub source: Source,
    /// Bytes successfully read before the reader stopped.
    pub bytes_read: u64,
    /// The I/O fault that stopped the reader, if any.
    pub fault: Option<io::Error>,
}

impl ReaderOutcome {
    /// True when the reader stopped without an I/O fault.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.fault.is_none()
    }
}

/// Result of a streaming comparison.
#[derive(Debug)]
pub struct StreamReport {
    /// Final state of the comparison.
    pub verdict: Verdict,
    /// Bytes confirmed equal before the comparison ended.
    pub bytes_compared: u64,
    /// Outcome of the first reader. Populated only with
    /// [`force_finish`](StreamComparerBuilder::force_finish); in the default
    /// mode readers wind down in the background after the report returns.
    pub reader_a: Option<ReaderOutcome>,
    /// Outcome of the second reader. See [`StreamReport::reader_a`].
    pub reader_b: Option<ReaderOutcome>,
}

impl StreamReport {
    /// True only when the streams were confirmed byte-for-byte identical.
    #[must_use]
    pub fn is_equal(&self) -> bool {
        self.verdict.is_equal()
    }
}

/// Configuration for streaming comparison.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Bytes read from each stream per chunk.
    pub chunk_size: usize,
    /// Chunk size handed to the parallel buffer comparator.
    pub compare_chunk_size: usize,
    /// Maximum chunks held in each queue before its reader blocks.
    pub max_in_flight: usize,
    /// Join both reader threads before returning.
    pub force_finish: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            compare_chunk_size: DEFAULT_PARALLEL_CHUNK_SIZE,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            force_finish: false,
        }
    }
}

/// Builder for [`StreamComparer`].
///
/// # Example
///
/// ```rust
/// use identic::StreamComparer;
///
/// let comparer = StreamComparer::builder()
///     .chunk_size(8 * 1024 * 1024)
///     .max_in_flight(2)
///     .force_finish(true)
///     .build();
/// assert_eq!(comparer.config().chunk_size, 8 * 1024 * 1024);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StreamComparerBuilder {
    config: StreamConfig,
}

impl StreamComparerBuilder {
    /// Create a builder with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the stream read chunk size.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero.
    #[must_use]
    pub fn chunk_size(mut self, size: usize) -> Self {
        assert!(size >= 1, "chunk size must be at least 1");
        self.config.chunk_size = size;
        self
    }

    /// Set the chunk size used by the parallel comparator on each pair.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero.
    #[must_use]
    pub fn compare_chunk_size(mut self, size: usize) -> Self {
        assert!(size >= 1, "compare chunk size must be at least 1");
        self.config.compare_chunk_size = size;
        self
    }

    /// Set the queue bound (chunks in flight per stream).
    ///
    /// # Panics
    ///
    /// Panics if `count` is zero.
    #[must_use]
    pub fn max_in_flight(mut self, count: usize) -> Self {
        assert!(count >= 1, "in-flight bound must be at least 1");
        self.config.max_in_flight = count;
        self
    }

    /// Block until both reader threads have terminated before returning,
    /// and surface their outcomes in the report.
    #[must_use]
    pub fn force_finish(mut self, force: bool) -> Self {
        self.config.force_finish = force;
        self
    }

    /// Build the comparer.
    #[must_use]
    pub fn build(self) -> StreamComparer {
        StreamComparer {
            config: self.config,
        }
    }
}

/// Streaming equality engine.
///
/// Compares two seekable byte sources without materializing them, using
/// bounded memory (`2 * max_in_flight * chunk_size` worst case). The engine
/// performs no retries; re-copy/re-verify policies belong to the caller.
#[derive(Debug, Clone)]
pub struct StreamComparer {
    config: StreamConfig,
}

impl StreamComparer {
    /// Create a comparer with default configuration.
    #[must_use]
    pub fn new() -> Self {
        StreamComparerBuilder::new().build()
    }

    /// Builder for custom configuration.
    #[must_use]
    pub fn builder() -> StreamComparerBuilder {
        StreamComparerBuilder::new()
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Compare two streams chunk by chunk.
    ///
    /// Streams are consumed; a handle cannot be reused across calls, so
    /// callers reopen instead. Cancellation via `cancel` yields
    /// [`Verdict::Cancelled`].
    ///
    /// # Errors
    ///
    /// Returns an error if a length query fails, a reader thread cannot be
    /// spawned, or (with `force_finish`) a reader thread panicked. Reader
    /// I/O faults are not errors here: they surface as
    /// [`Verdict::Unequal`] plus a populated
    /// [`fault`](ReaderOutcome::fault) slot.
    pub fn compare<A, B>(&self, mut a: A, mut b: B, cancel: &CancelToken) -> Result<StreamReport>
    where
        A: Read + StreamLen + Send + 'static,
        B: Read + StreamLen + Send + 'static,
    {
        // LENGTH_CHECK: settle unequal lengths before any byte is read.
        let len_a = a.byte_len()?;
        let len_b = b.byte_len()?;
        if len_a != len_b {
            return Ok(StreamReport {
                verdict: Verdict::Unequal,
                bytes_compared: 0,
                reader_a: None,
                reader_b: None,
            });
        }

        let shared = Arc::new(Shared::new(cancel.clone(), self.config.max_in_flight));
        let chunk_size = self.config.chunk_size;

        let shared_a = Arc::clone(&shared);
        let handle_a = thread::Builder::new()
            .name("identic-reader-a".into())
            .spawn(move || run_reader(a, Source::A, &shared_a, chunk_size))
            .map_err(|e| {
                shared.halt();
                IdenticError::Io(e)
            })?;

        let shared_b = Arc::clone(&shared);
        let handle_b = thread::Builder::new()
            .name("identic-reader-b".into())
            .spawn(move || run_reader(b, Source::B, &shared_b, chunk_size))
            .map_err(|e| {
                shared.halt();
                IdenticError::Io(e)
            })?;

        let (verdict, bytes_compared) = self.drive(&shared);

        // Wake any parked reader so wind-down is prompt.
        shared.space.notify_all();

        let (reader_a, reader_b) = if self.config.force_finish {
            (
                Some(join_reader(handle_a, Source::A)?),
                Some(join_reader(handle_b, Source::B)?),
            )
        } else {
            (None, None)
        };

        Ok(StreamReport {
            verdict,
            bytes_compared,
            reader_a,
            reader_b,
        })
    }

    /// Compare two files by path.
    ///
    /// Convenience wrapper opening both files and delegating to
    /// [`compare`](StreamComparer::compare).
    ///
    /// # Errors
    ///
    /// Returns an error if either file cannot be opened, plus the error
    /// cases of [`compare`](StreamComparer::compare).
    pub fn compare_files<P, Q>(&self, a: P, b: Q, cancel: &CancelToken) -> Result<StreamReport>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let file_a = File::open(a)?;
        let file_b = File::open(b)?;
        self.compare(file_a, file_b, cancel)
    }

    /// STREAMING main loop: pair chunks in arrival order and compare them.
    fn drive(&self, shared: &Shared) -> (Verdict, u64) {
        let mut bytes_compared = 0u64;

        loop {
            let step = {
                let mut state = shared.lock_state();
                loop {
                    if shared.cancel.is_cancelled() {
                        break Step::Cancelled;
                    }
                    if !state.a.is_empty() && !state.b.is_empty() {
                        if let (Some(ca), Some(cb)) = (state.a.pop_front(), state.b.pop_front()) {
                            break Step::Pair(ca, cb);
                        }
                    }
                    if state.a_done && state.b_done {
                        break Step::Drained {
                            leftovers: !state.a.is_empty() || !state.b.is_empty(),
                        };
                    }
                    // One stream exhausted while the other still holds data
                    // it can never match: lengths were verified equal, so a
                    // stream ran short. Escalated as mismatch, same as the
                    // paired-length check below.
                    if (state.a_done && state.a.is_empty() && !state.b.is_empty())
                        || (state.b_done && state.b.is_empty() && !state.a.is_empty())
                    {
                        break Step::Desync;
                    }
                    state = shared.wait_ready(state);
                }
            };

            match step {
                Step::Cancelled => return (Verdict::Cancelled, bytes_compared),
                Step::Desync => {
                    shared.raise_mismatch();
                    return (Verdict::Unequal, bytes_compared);
                }
                Step::Drained { leftovers } => {
                    if leftovers || shared.mismatch.load(Ordering::Acquire) {
                        shared.raise_mismatch();
                        return (Verdict::Unequal, bytes_compared);
                    }
                    return (Verdict::Equal, bytes_compared);
                }
                Step::Pair(ca, cb) => {
                    shared.space.notify_all();
                    debug_assert_eq!(ca.seq, cb.seq, "queues advanced out of step");

                    // A signal raised since the dequeue means no new
                    // comparison starts.
                    if shared.mismatch.load(Ordering::Acquire) {
                        return (Verdict::Unequal, bytes_compared);
                    }
                    if ca.data.len() != cb.data.len() {
                        shared.raise_mismatch();
                        return (Verdict::Unequal, bytes_compared);
                    }
                    if !parallel::eq_parallel_with_flag(
                        &ca.data,
                        &cb.data,
                        self.config.compare_chunk_size,
                        &shared.mismatch,
                    ) {
                        shared.raise_mismatch();
                        return (Verdict::Unequal, bytes_compared);
                    }
                    bytes_compared += ca.data.len() as u64;
                }
            }
        }
    }
}

impl Default for StreamComparer {
    fn default() -> Self {
        Self::new()
    }
}

/// One step decided by the main loop under the queue lock.
enum Step {
    Pair(Chunk, Chunk),
    Drained { leftovers: bool },
    Desync,
    Cancelled,
}

/// A buffer read from one stream, tagged with its arrival order.
struct Chunk {
    seq: u64,
    data: Vec<u8>,
}

/// Both queues plus reader completion flags, guarded by one mutex.
struct QueueState {
    a: VecDeque<Chunk>,
    b: VecDeque<Chunk>,
    a_done: bool,
    b_done: bool,
}

impl QueueState {
    fn queue_mut(&mut self, source: Source) -> &mut VecDeque<Chunk> {
        match source {
            Source::A => &mut self.a,
            Source::B => &mut self.b,
        }
    }

    fn mark_done(&mut self, source: Source) {
        match source {
            Source::A => self.a_done = true,
            Source::B => self.b_done = true,
        }
    }
}

/// State shared between the main loop and the two readers.
struct Shared {
    state: Mutex<QueueState>,
    /// Readers wait here for queue capacity.
    space: Condvar,
    /// The main loop waits here for chunks or completion.
    ready: Condvar,
    /// One-way mismatch signal; set on content mismatch, desync, or fault.
    mismatch: AtomicBool,
    cancel: CancelToken,
    max_in_flight: usize,
}

impl Shared {
    fn new(cancel: CancelToken, max_in_flight: usize) -> Self {
        Self {
            state: Mutex::new(QueueState {
                a: VecDeque::new(),
                b: VecDeque::new(),
                a_done: false,
                b_done: false,
            }),
            space: Condvar::new(),
            ready: Condvar::new(),
            mismatch: AtomicBool::new(false),
            cancel,
            max_in_flight,
        }
    }

    /// A raised signal of either kind stops new work.
    fn halted(&self) -> bool {
        self.cancel.is_cancelled() || self.mismatch.load(Ordering::Acquire)
    }

    fn raise_mismatch(&self) {
        self.mismatch.store(true, Ordering::Release);
    }

    /// Raise the mismatch signal and wake everything; used when setup
    /// fails after a reader has already started.
    fn halt(&self) {
        self.raise_mismatch();
        self.space.notify_all();
        self.ready.notify_all();
    }

    /// Lock the queue state, recovering from poisoning: a panicked peer
    /// never leaves the queues structurally broken, only incomplete.
    fn lock_state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait_ready<'a>(&self, guard: MutexGuard<'a, QueueState>) -> MutexGuard<'a, QueueState> {
        let (guard, _) = self
            .ready
            .wait_timeout(guard, WAIT_TICK)
            .unwrap_or_else(PoisonError::into_inner);
        guard
    }

    fn wait_space<'a>(&self, guard: MutexGuard<'a, QueueState>) -> MutexGuard<'a, QueueState> {
        let (guard, _) = self
            .space
            .wait_timeout(guard, WAIT_TICK)
            .unwrap_or_else(PoisonError::into_inner);
        guard
    }
}

/// Reader thread body: fill one queue until EOF, fault, or a signal.
fn run_reader<R: Read>(
    mut reader: R,
    source: Source,
    shared: &Shared,
    chunk_size: usize,
) -> ReaderOutcome {
    let mut seq = 0u64;
    let mut bytes_read = 0u64;
    let mut fault = None;

    loop {
        if shared.halted() {
            break;
        }

        // Backpressure: wait for a free slot before reading.
        {
            let mut state = shared.lock_state();
            while state.queue_mut(source).len() >= shared.max_in_flight && !shared.halted() {
                state = shared.wait_space(state);
            }
        }
        if shared.halted() {
            break;
        }

        match read_chunk(&mut reader, chunk_size) {
            Ok(data) => {
                let at_eof = data.len() < chunk_size;
                bytes_read += data.len() as u64;

                if !data.is_empty() {
                    let mut state = shared.lock_state();
                    state.queue_mut(source).push_back(Chunk { seq, data });
                    seq += 1;
                }
                shared.ready.notify_all();

                if at_eof {
                    break;
                }
            }
            Err(e) => {
                // Escalate as mismatch so the comparison terminates
                // promptly; the fault itself travels in the outcome.
                shared.raise_mismatch();
                fault = Some(e);
                break;
            }
        }
    }

    let mut state = shared.lock_state();
    state.mark_done(source);
    drop(state);
    shared.ready.notify_all();
    shared.space.notify_all();

    ReaderOutcome {
        source,
        bytes_read,
        fault,
    }
}

/// Read up to `chunk_size` bytes, looping on short reads until the chunk is
/// full or the stream is exhausted.
fn read_chunk<R: Read>(reader: &mut R, chunk_size: usize) -> io::Result<Vec<u8>> {
    let mut buf = vec![0u8; chunk_size];
    let mut filled = 0;

    while filled < chunk_size {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }

    buf.truncate(filled);
    Ok(buf)
}

fn join_reader(handle: JoinHandle<ReaderOutcome>, source: Source) -> Result<ReaderOutcome> {
    handle.join().map_err(|_| IdenticError::ReaderPanicked(source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn small_comparer() -> StreamComparer {
        // Tiny chunks so even small inputs exercise multi-chunk pairing.
        StreamComparer::builder()
            .chunk_size(1024)
            .compare_chunk_size(256)
            .force_finish(true)
            .build()
    }

    fn patterned(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    // ==========================================================================
    // VERDICTS
    // ==========================================================================

    #[test]
    fn identical_streams_are_equal() {
        let data = patterned(10_000);
        let report = small_comparer()
            .compare(
                Cursor::new(data.clone()),
                Cursor::new(data.clone()),
                &CancelToken::new(),
            )
            .unwrap();

        assert_eq!(report.verdict, Verdict::Equal);
        assert!(report.is_equal());
        assert_eq!(report.bytes_compared, 10_000);
    }

    #[test]
    fn differing_streams_are_unequal() {
        let data = patterned(10_000);
        let mut other = data.clone();
        other[7_777] ^= 0x01;

        let report = small_comparer()
            .compare(Cursor::new(data), Cursor::new(other), &CancelToken::new())
            .unwrap();

        assert_eq!(report.verdict, Verdict::Unequal);
        assert!(!report.is_equal());
    }

    #[test]
    fn empty_streams_are_equal() {
        let report = small_comparer()
            .compare(
                Cursor::new(Vec::new()),
                Cursor::new(Vec::new()),
                &CancelToken::new(),
            )
            .unwrap();

        assert_eq!(report.verdict, Verdict::Equal);
        assert_eq!(report.bytes_compared, 0);
    }

    #[test]
    fn difference_in_final_partial_chunk() {
        // Length not a multiple of the chunk size; the difference sits in
        // the short final chunk.
        let mut data = patterned(2_500);
        let other = data.clone();
        *data.last_mut().unwrap() ^= 0xFF;

        let report = small_comparer()
            .compare(Cursor::new(data), Cursor::new(other), &CancelToken::new())
            .unwrap();

        assert_eq!(report.verdict, Verdict::Unequal);
    }

    // ==========================================================================
    // LENGTH CHECK
    // ==========================================================================

    /// Cursor wrapper counting read calls, to prove the length fast path
    /// never touches the data.
    struct CountingReader {
        inner: Cursor<Vec<u8>>,
        reads: Arc<std::sync::atomic::AtomicU64>,
    }

    impl Read for CountingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.reads.fetch_add(1, Ordering::Relaxed);
            self.inner.read(buf)
        }
    }

    impl Seek for CountingReader {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.inner.seek(pos)
        }
    }

    #[test]
    fn length_mismatch_reads_nothing() {
        let reads = Arc::new(std::sync::atomic::AtomicU64::new(0));
        let a = CountingReader {
            inner: Cursor::new(vec![1u8; 100]),
            reads: Arc::clone(&reads),
        };
        let b = CountingReader {
            inner: Cursor::new(vec![1u8; 99]),
            reads: Arc::clone(&reads),
        };

        let report = small_comparer()
            .compare(a, b, &CancelToken::new())
            .unwrap();

        assert_eq!(report.verdict, Verdict::Unequal);
        assert_eq!(report.bytes_compared, 0);
        assert_eq!(reads.load(Ordering::Relaxed), 0);
        assert!(report.reader_a.is_none());
        assert!(report.reader_b.is_none());
    }

    // ==========================================================================
    // CANCELLATION
    // ==========================================================================

    #[test]
    fn pre_cancelled_token_yields_cancelled() {
        let data = patterned(10_000);
        let token = CancelToken::new();
        token.cancel();

        let report = small_comparer()
            .compare(Cursor::new(data.clone()), Cursor::new(data), &token)
            .unwrap();

        assert_eq!(report.verdict, Verdict::Cancelled);
        assert!(!report.is_equal());
    }

    /// Reader that trips a cancel token after a fixed number of bytes.
    struct CancellingReader {
        inner: Cursor<Vec<u8>>,
        trip_after: u64,
        delivered: u64,
        token: CancelToken,
    }

    impl Read for CancellingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.delivered >= self.trip_after {
                self.token.cancel();
            }
            let n = self.inner.read(buf)?;
            self.delivered += n as u64;
            Ok(n)
        }
    }

    impl Seek for CancellingReader {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.inner.seek(pos)
        }
    }

    #[test]
    fn mid_stream_cancel_on_identical_data_never_reports_equal() {
        let data = patterned(64 * 1024);
        let token = CancelToken::new();

        let a = CancellingReader {
            inner: Cursor::new(data.clone()),
            trip_after: 4 * 1024,
            delivered: 0,
            token: token.clone(),
        };
        let b = Cursor::new(data);

        let report = small_comparer().compare(a, b, &token).unwrap();

        assert!(!report.is_equal());
        assert_eq!(report.verdict, Verdict::Cancelled);
    }

    // ==========================================================================
    // READER FAULTS
    // ==========================================================================

    /// Reader that fails with an I/O error after delivering some bytes.
    struct FaultyReader {
        inner: Cursor<Vec<u8>>,
        fail_after: u64,
        delivered: u64,
    }

    impl Read for FaultyReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.delivered >= self.fail_after {
                return Err(io::Error::new(io::ErrorKind::Other, "disk on fire"));
            }
            let n = self.inner.read(buf)?;
            self.delivered += n as u64;
            Ok(n)
        }
    }

    impl Seek for FaultyReader {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.inner.seek(pos)
        }
    }

    #[test]
    fn reader_fault_escalates_to_unequal_with_fault_slot() {
        let data = patterned(16 * 1024);
        let a = FaultyReader {
            inner: Cursor::new(data.clone()),
            fail_after: 2048,
            delivered: 0,
        };
        let b = Cursor::new(data);

        let report = small_comparer()
            .compare(a, b, &CancelToken::new())
            .unwrap();

        assert_eq!(report.verdict, Verdict::Unequal);

        let outcome_a = report.reader_a.expect("force_finish populates outcomes");
        assert_eq!(outcome_a.source, Source::A);
        assert!(!outcome_a.is_clean());
        assert!(outcome_a
            .fault
            .as_ref()
            .map(|e| e.to_string().contains("disk on fire"))
            .unwrap_or(false));
    }

    // ==========================================================================
    // SHORT STREAMS (DESYNC)
    // ==========================================================================

    /// Claims a longer length than it can deliver, simulating a stream
    /// that runs short mid-comparison.
    struct ShortReader {
        inner: Cursor<Vec<u8>>,
        claimed_len: u64,
    }

    impl Read for ShortReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.inner.read(buf)
        }
    }

    impl Seek for ShortReader {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            match pos {
                SeekFrom::End(0) => Ok(self.claimed_len),
                other => self.inner.seek(other),
            }
        }
    }

    #[test]
    fn stream_running_short_is_a_mismatch() {
        let full = patterned(8 * 1024);
        let truncated = full[..3 * 1024].to_vec();

        let a = ShortReader {
            inner: Cursor::new(truncated),
            claimed_len: 8 * 1024,
        };
        let b = Cursor::new(full);

        let report = small_comparer()
            .compare(a, b, &CancelToken::new())
            .unwrap();

        assert_eq!(report.verdict, Verdict::Unequal);
    }

    // ==========================================================================
    // FORCE FINISH
    // ==========================================================================

    #[test]
    fn force_finish_reports_bytes_read() {
        let data = patterned(5_000);
        let report = small_comparer()
            .compare(
                Cursor::new(data.clone()),
                Cursor::new(data),
                &CancelToken::new(),
            )
            .unwrap();

        let a = report.reader_a.expect("outcome present");
        let b = report.reader_b.expect("outcome present");
        assert_eq!(a.bytes_read, 5_000);
        assert_eq!(b.bytes_read, 5_000);
        assert!(a.is_clean() && b.is_clean());
    }

    #[test]
    fn default_mode_omits_reader_outcomes() {
        let data = patterned(2_000);
        let comparer = StreamComparer::builder().chunk_size(512).build();
        let report = comparer
            .compare(
                Cursor::new(data.clone()),
                Cursor::new(data),
                &CancelToken::new(),
            )
            .unwrap();

        assert!(report.is_equal());
        assert!(report.reader_a.is_none());
        assert!(report.reader_b.is_none());
    }

    // ==========================================================================
    // CONFIG / BUILDER
    // ==========================================================================

    #[test]
    fn builder_defaults() {
        let comparer = StreamComparer::new();
        assert_eq!(comparer.config().chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(comparer.config().max_in_flight, DEFAULT_MAX_IN_FLIGHT);
        assert!(!comparer.config().force_finish);
    }

    #[test]
    #[should_panic(expected = "chunk size must be at least 1")]
    fn builder_rejects_zero_chunk_size() {
        let _ = StreamComparer::builder().chunk_size(0);
    }

    #[test]
    #[should_panic(expected = "in-flight bound must be at least 1")]
    fn builder_rejects_zero_in_flight() {
        let _ = StreamComparer::builder().max_in_flight(0);
    }

    #[test]
    fn stream_len_reports_total_and_restores_position() {
        let mut cursor = Cursor::new(vec![0u8; 123]);
        cursor.set_position(10);
        assert_eq!(cursor.byte_len().unwrap(), 123);
        assert_eq!(cursor.position(), 10);
    }

    // ==========================================================================
    // BACKPRESSURE
    // ==========================================================================

    #[test]
    fn tight_queue_bound_still_completes() {
        // One chunk in flight forces constant producer/consumer handoff.
        let data = patterned(20_000);
        let comparer = StreamComparer::builder()
            .chunk_size(512)
            .max_in_flight(1)
            .force_finish(true)
            .build();

        let report = comparer
            .compare(
                Cursor::new(data.clone()),
                Cursor::new(data),
                &CancelToken::new(),
            )
            .unwrap();

        assert!(report.is_equal());
        assert_eq!(report.bytes_compared, 20_000);
    }
}
