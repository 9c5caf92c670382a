// src/process/chunk.rs

use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{self, RecvTimeoutError},
        Arc,
    },
    time::{Duration, Instant},
};
use tracing::{debug, error, instrument, warn};

use crate::error::LoadError;
use crate::process::{parse_invoice_file, raw_table::FileRows};

#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Threads in the worker pool
    pub n_workers: usize,
    /// How long the coordinator waits for every chunk to report back
    pub timeout: Duration,
}

/// The rows of one chunk, grouped per file in chunk order.
#[derive(Debug)]
pub struct ChunkRows {
    pub index: usize,
    pub files: Vec<FileRows>,
}

enum ChunkOutcome {
    Loaded(Vec<FileRows>),
    /// Stopped early because another worker failed or the deadline passed.
    Aborted,
    Failed(LoadError),
}

/// Parse every file of every chunk on a pool of `n_workers` threads.
///
/// Each chunk is one task that owns its paths and reports once, after its last file.
/// The first failure raises the shared abort flag so the other workers stop before
/// their next file; all failures received are returned together. Results come back
/// sorted by chunk index regardless of completion order.
#[instrument(
    level = "info",
    skip(chunks, options),
    fields(chunks = chunks.len(), workers = options.n_workers)
)]
pub fn load_chunks(
    chunks: Vec<Vec<PathBuf>>,
    options: &LoadOptions,
) -> Result<Vec<ChunkRows>, LoadError> {
    load_chunks_with(chunks, options, parse_invoice_file)
}

pub(crate) fn load_chunks_with<F>(
    chunks: Vec<Vec<PathBuf>>,
    options: &LoadOptions,
    parse: F,
) -> Result<Vec<ChunkRows>, LoadError>
where
    F: Fn(&Path) -> Result<FileRows, LoadError> + Send + Sync + 'static,
{
    if options.n_workers == 0 {
        return Err(LoadError::Partition(0));
    }
    let expected = chunks.len();
    if expected == 0 {
        return Ok(Vec::new());
    }

    // no more threads than there are chunks to hand out
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.n_workers.min(expected))
        .thread_name(|i| format!("invoice-loader-{}", i))
        .build()?;

    let abort = Arc::new(AtomicBool::new(false));
    let parse = Arc::new(parse);
    let (tx, rx) = mpsc::channel::<(usize, ChunkOutcome)>();

    for (index, chunk) in chunks.into_iter().enumerate() {
        let tx = tx.clone();
        let abort = Arc::clone(&abort);
        let parse = Arc::clone(&parse);
        pool.spawn(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                load_chunk(index, &chunk, &abort, &*parse)
            }))
            .unwrap_or_else(|payload| {
                ChunkOutcome::Failed(LoadError::WorkerPanicked {
                    chunk: index,
                    message: panic_message(payload.as_ref()),
                })
            });
            // the coordinator is gone after a timeout; nothing left to report to
            let _ = tx.send((index, outcome));
        });
    }
    // drop the original sender so `recv` reports disconnection once every task is done
    drop(tx);

    let deadline = Instant::now() + options.timeout;
    let mut loaded = Vec::with_capacity(expected);
    let mut failures = Vec::new();
    let mut received = 0;

    while received < expected {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok((index, outcome)) => {
                received += 1;
                match outcome {
                    ChunkOutcome::Loaded(files) => {
                        debug!(chunk = index, files = files.len(), "chunk loaded");
                        loaded.push(ChunkRows { index, files });
                    }
                    ChunkOutcome::Aborted => debug!(chunk = index, "chunk aborted"),
                    ChunkOutcome::Failed(err) => {
                        if !abort.swap(true, Ordering::SeqCst) {
                            error!(chunk = index, "worker failed, aborting load: {}", err);
                        }
                        failures.push(err);
                    }
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                abort.store(true, Ordering::SeqCst);
                if !failures.is_empty() {
                    warn!(
                        unreported = expected - received,
                        "gave up draining aborted workers"
                    );
                    break;
                }
                error!(
                    timeout = ?options.timeout,
                    unreported = expected - received,
                    "load timed out"
                );
                return Err(LoadError::Timeout(options.timeout));
            }
            Err(RecvTimeoutError::Disconnected) => {
                if failures.is_empty() {
                    return Err(LoadError::Disconnected {
                        missing: expected - received,
                    });
                }
                break;
            }
        }
    }

    if !failures.is_empty() {
        return Err(LoadError::Workers(failures));
    }

    loaded.sort_by_key(|c| c.index);
    Ok(loaded)
}

fn load_chunk<F>(
    index: usize,
    chunk: &[PathBuf],
    abort: &AtomicBool,
    parse: &F,
) -> ChunkOutcome
where
    F: Fn(&Path) -> Result<FileRows, LoadError>,
{
    let mut files = Vec::with_capacity(chunk.len());
    for path in chunk {
        if abort.load(Ordering::SeqCst) {
            debug!(chunk = index, path = %path.display(), "abort requested, stopping");
            return ChunkOutcome::Aborted;
        }
        match parse(path) {
            Ok(rows) => files.push(rows),
            Err(err) => return ChunkOutcome::Failed(err),
        }
    }
    ChunkOutcome::Loaded(files)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
