//! Async streaming comparison using tokio.
//!
//! Mirrors [`crate::stream`] for async I/O: two reader tasks feed bounded
//! channels, the driver pairs chunks in arrival order, and each pair is
//! compared on the blocking pool so lane scans never stall the runtime.
//! Backpressure comes from the channel bound instead of explicit condition
//! variables, and wind-down rides on channel closure.

use std::io::{self, SeekFrom};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::cancel::CancelToken;
use crate::error::{IdenticError, Result};
use crate::parallel;
use crate::stream::{ReaderOutcome, Source, StreamConfig, StreamReport, Verdict};

/// Async streaming equality engine.
///
/// Shares its configuration and report types with the blocking
/// [`StreamComparer`](crate::stream::StreamComparer).
#[derive(Debug, Clone)]
pub struct AsyncStreamComparer {
    config: StreamConfig,
}

impl AsyncStreamComparer {
    /// Create a comparer with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: StreamConfig::default(),
        }
    }

    /// Create a comparer with custom configuration.
    ///
    /// # Panics
    ///
    /// Panics if any size or bound in `config` is zero.
    #[must_use]
    pub fn with_config(config: StreamConfig) -> Self {
        assert!(config.chunk_size >= 1, "chunk size must be at least 1");
        assert!(
            config.compare_chunk_size >= 1,
            "compare chunk size must be at least 1"
        );
        assert!(
            config.max_in_flight >= 1,
            "in-flight bound must be at least 1"
        );
        Self { config }
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Compare two async streams chunk by chunk.
    ///
    /// Semantics match the blocking engine: length check first, then
    /// streaming, with cancellation reported as [`Verdict::Cancelled`] and
    /// reader faults as [`Verdict::Unequal`].
    ///
    /// # Errors
    ///
    /// Returns an error if a length query fails, a comparison task is
    /// aborted, or (with `force_finish`) a reader task panicked.
    pub async fn compare<A, B>(&self, mut a: A, mut b: B, cancel: &CancelToken) -> Result<StreamReport>
    where
        A: AsyncRead + AsyncSeek + Unpin + Send + 'static,
        B: AsyncRead + AsyncSeek + Unpin + Send + 'static,
    {
        let len_a = stream_len(&mut a).await?;
        let len_b = stream_len(&mut b).await?;
        if len_a != len_b {
            return Ok(StreamReport {
                verdict: Verdict::Unequal,
                bytes_compared: 0,
                reader_a: None,
                reader_b: None,
            });
        }

        let mismatch = Arc::new(AtomicBool::new(false));
        let (tx_a, mut rx_a) = mpsc::channel(self.config.max_in_flight);
        let (tx_b, mut rx_b) = mpsc::channel(self.config.max_in_flight);
        let chunk_size = self.config.chunk_size;

        let handle_a = tokio::spawn(run_reader(
            a,
            Source::A,
            tx_a,
            Arc::clone(&mismatch),
            cancel.clone(),
            chunk_size,
        ));
        let handle_b = tokio::spawn(run_reader(
            b,
            Source::B,
            tx_b,
            Arc::clone(&mismatch),
            cancel.clone(),
            chunk_size,
        ));

        let mut bytes_compared = 0u64;
        let verdict = loop {
            let ca = rx_a.recv().await;
            let cb = rx_b.recv().await;

            if cancel.is_cancelled() {
                break Verdict::Cancelled;
            }

            match (ca, cb) {
                (None, None) => {
                    if mismatch.load(Ordering::Acquire) {
                        break Verdict::Unequal;
                    }
                    break Verdict::Equal;
                }
                (Some(ca), Some(cb)) => {
                    if mismatch.load(Ordering::Acquire) {
                        break Verdict::Unequal;
                    }
                    if ca.len() != cb.len() {
                        mismatch.store(true, Ordering::Release);
                        break Verdict::Unequal;
                    }

                    let len = ca.len() as u64;
                    let flag = Arc::clone(&mismatch);
                    let compare_chunk_size = self.config.compare_chunk_size;
                    let equal = tokio::task::spawn_blocking(move || {
                        parallel::eq_parallel_with_flag(&ca, &cb, compare_chunk_size, &flag)
                    })
                    .await
                    .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

                    if !equal {
                        mismatch.store(true, Ordering::Release);
                        break Verdict::Unequal;
                    }
                    bytes_compared += len;
                }
                // One stream ran short of its reported length.
                (Some(_), None) | (None, Some(_)) => {
                    mismatch.store(true, Ordering::Release);
                    break Verdict::Unequal;
                }
            }
        };

        // Closing the receivers fails any blocked send, so readers wind
        // down without further signalling.
        drop(rx_a);
        drop(rx_b);

        let (reader_a, reader_b) = if self.config.force_finish {
            (
                Some(join_reader(handle_a, Source::A).await?),
                Some(join_reader(handle_b, Source::B).await?),
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

    /// Compare two files by path using tokio's filesystem handles.
    ///
    /// # Errors
    ///
    /// Returns an error if either file cannot be opened, plus the error
    /// cases of [`compare`](AsyncStreamComparer::compare).
    pub async fn compare_files<P, Q>(
        &self,
        a: P,
        b: Q,
        cancel: &CancelToken,
    ) -> Result<StreamReport>
    where
        P: AsRef<std::path::Path>,
        Q: AsRef<std::path::Path>,
    {
        let file_a = tokio::fs::File::open(a).await?;
        let file_b = tokio::fs::File::open(b).await?;
        self.compare(file_a, file_b, cancel).await
    }
}

impl Default for AsyncStreamComparer {
    fn default() -> Self {
        Self::new()
    }
}

async fn stream_len<S: AsyncSeek + Unpin>(stream: &mut S) -> io::Result<u64> {
    let pos = stream.stream_position().await?;
    let end = stream.seek(SeekFrom::End(0)).await?;
    if pos != end {
        stream.seek(SeekFrom::Start(pos)).await?;
    }
    Ok(end)
}

/// Reader task body: fill one channel until EOF, fault, or a signal.
async fn run_reader<R: AsyncRead + Unpin>(
    mut reader: R,
    source: Source,
    tx: mpsc::Sender<Vec<u8>>,
    mismatch: Arc<AtomicBool>,
    cancel: CancelToken,
    chunk_size: usize,
) -> ReaderOutcome {
    let mut bytes_read = 0u64;
    let mut fault = None;

    loop {
        if cancel.is_cancelled() || mismatch.load(Ordering::Acquire) {
            break;
        }

        match read_chunk(&mut reader, chunk_size).await {
            Ok(data) => {
                let at_eof = data.len() < chunk_size;
                bytes_read += data.len() as u64;

                // A closed channel means the driver has settled the
                // verdict; stop reading.
                if !data.is_empty() && tx.send(data).await.is_err() {
                    break;
                }
                if at_eof {
                    break;
                }
            }
            Err(e) => {
                mismatch.store(true, Ordering::Release);
                fault = Some(e);
                break;
            }
        }
    }

    ReaderOutcome {
        source,
        bytes_read,
        fault,
    }
}

async fn read_chunk<R: AsyncRead + Unpin>(
    reader: &mut R,
    chunk_size: usize,
) -> io::Result<Vec<u8>> {
    let mut buf = vec![0u8; chunk_size];
    let mut filled = 0;

    while filled < chunk_size {
        match reader.read(&mut buf[filled..]).await? {
            0 => break,
            n => filled += n,
        }
    }

    buf.truncate(filled);
    Ok(buf)
}

async fn join_reader(
    handle: JoinHandle<ReaderOutcome>,
    source: Source,
) -> Result<ReaderOutcome> {
    handle
        .await
        .map_err(|_| IdenticError::ReaderPanicked(source))
}
