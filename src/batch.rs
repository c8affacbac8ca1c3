//! Batch compression and the result collection.
//!
//! ## Parallel Processing
//!
//! Every input is compressed independently on the rayon pool. The indexed
//! parallel iterator keeps outputs in input order no matter which worker
//! finishes first, and one input's failure never touches another's. Inputs
//! given as paths are read by the worker, so a missing file is just another
//! per-item failure.
//!
//! ## Cancellation
//!
//! A [`CancelToken`] is checked before each input starts. Inputs that had not
//! started when the token fired come back as [`CompressError::Cancelled`];
//! anything already finished stays valid. A search in progress is not
//! interrupted (its iteration cap already bounds it).
//!
//! ## Result Collection
//!
//! [`ResultSet`] is the one shared, mutable piece: results arrive from
//! parallel workers and the UI/CLI removes or clears them. A mutex serializes
//! every operation; records themselves are never mutated in place.

use crate::compress::{CompressError, compress};
use crate::config::CompressionConfig;
use crate::ids::{IdGenerator, RandomIds};
use crate::imaging::{ImageBackend, RustBackend};
use crate::types::{CompressionResult, ImageId, Totals};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::warn;

/// One input: encoded bytes plus a display name (usually the file name).
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Read a file from disk, named after its file name.
    pub fn read(path: &Path) -> Result<Self, CompressError> {
        let name = display_name(path);
        match std::fs::read(path) {
            Ok(bytes) => Ok(Self::new(name, bytes)),
            Err(source) => Err(CompressError::Read { name, source }),
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Progress events emitted while a batch runs.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    /// A batch of `total` inputs is starting.
    Started { total: usize },
    /// Input at `index` (0-based) finished successfully.
    Compressed {
        index: usize,
        name: String,
        original_size: u64,
        compressed_size: u64,
        quality: f64,
        budget_met: bool,
    },
    /// Input at `index` failed or was cancelled.
    Failed {
        index: usize,
        name: String,
        error: String,
    },
}

/// Cooperative cancellation flag shared between a caller and a running batch.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Compress every input independently; outcome `i` belongs to input `i`.
pub fn process_all<B: ImageBackend>(
    backend: &B,
    ids: &impl IdGenerator,
    inputs: &[SourceFile],
    config: &CompressionConfig,
    cancel: &CancelToken,
    progress: Option<Sender<BatchEvent>>,
) -> Vec<Result<CompressionResult, CompressError>> {
    run_indexed(
        inputs,
        |input| input.name.clone(),
        |input| compress(backend, ids, &input.bytes, &input.name, config),
        cancel,
        progress,
    )
}

/// Like [`process_all`], but each worker reads its own file first.
///
/// A file that cannot be read fails as [`CompressError::Read`] without
/// affecting the other paths.
pub fn process_paths<B: ImageBackend>(
    backend: &B,
    ids: &impl IdGenerator,
    paths: &[PathBuf],
    config: &CompressionConfig,
    cancel: &CancelToken,
    progress: Option<Sender<BatchEvent>>,
) -> Vec<Result<CompressionResult, CompressError>> {
    run_indexed(
        paths,
        |path| display_name(path),
        |path| {
            let input = SourceFile::read(path)?;
            compress(backend, ids, &input.bytes, &input.name, config)
        },
        cancel,
        progress,
    )
}

fn run_indexed<T, N, W>(
    inputs: &[T],
    name_of: N,
    work: W,
    cancel: &CancelToken,
    progress: Option<Sender<BatchEvent>>,
) -> Vec<Result<CompressionResult, CompressError>>
where
    T: Sync,
    N: Fn(&T) -> String + Sync,
    W: Fn(&T) -> Result<CompressionResult, CompressError> + Sync,
{
    if let Some(tx) = &progress {
        tx.send(BatchEvent::Started {
            total: inputs.len(),
        })
        .ok();
    }

    inputs
        .par_iter()
        .enumerate()
        .map(|(index, input)| {
            let outcome = if cancel.is_cancelled() {
                Err(CompressError::Cancelled {
                    name: name_of(input),
                })
            } else {
                work(input)
            };

            if let Err(e) = &outcome {
                warn!(index, error = %e, "image failed");
            }
            if let Some(tx) = &progress {
                tx.send(event_for(index, &outcome)).ok();
            }
            outcome
        })
        .collect()
}

fn event_for(index: usize, outcome: &Result<CompressionResult, CompressError>) -> BatchEvent {
    match outcome {
        Ok(r) => BatchEvent::Compressed {
            index,
            name: r.name.clone(),
            original_size: r.original_size,
            compressed_size: r.compressed_size,
            quality: r.quality.value(),
            budget_met: r.budget_met,
        },
        Err(e) => BatchEvent::Failed {
            index,
            name: e.name().to_string(),
            error: e.to_string(),
        },
    }
}

// =============================================================================
// Result collection
// =============================================================================

/// Thread-safe, ordered collection of finished results.
#[derive(Debug, Default)]
pub struct ResultSet {
    results: Mutex<Vec<CompressionResult>>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<CompressionResult>> {
        // Records are whole values, so a panic elsewhere cannot leave one half-written.
        self.results.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a batch of new results, keeping their order.
    pub fn append(&self, results: impl IntoIterator<Item = CompressionResult>) {
        self.lock().extend(results);
    }

    /// Remove one result by identifier, returning it if present.
    pub fn remove(&self, id: ImageId) -> Option<CompressionResult> {
        let mut results = self.lock();
        let pos = results.iter().position(|r| r.id == id)?;
        Some(results.remove(pos))
    }

    pub fn clear_all(&self) {
        self.lock().clear();
    }

    pub fn get(&self, id: ImageId) -> Option<CompressionResult> {
        self.lock().iter().find(|r| r.id == id).cloned()
    }

    /// Copy of the current contents, in insertion order.
    pub fn snapshot(&self) -> Vec<CompressionResult> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn totals(&self) -> Totals {
        Totals::from_results(self.lock().iter())
    }
}

// =============================================================================
// Runner
// =============================================================================

/// Backend, identifier source, and result collection bundled for a UI or CLI.
pub struct BatchRunner<B = RustBackend, G = RandomIds> {
    backend: B,
    ids: G,
    results: ResultSet,
}

impl BatchRunner {
    /// Production runner: `image`-crate backend and random identifiers.
    pub fn new() -> Self {
        Self::with_parts(RustBackend::new(), RandomIds)
    }
}

impl Default for BatchRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: ImageBackend, G: IdGenerator> BatchRunner<B, G> {
    pub fn with_parts(backend: B, ids: G) -> Self {
        Self {
            backend,
            ids,
            results: ResultSet::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Compress `files` and add every success to the collection.
    ///
    /// Returns one outcome per input, in input order.
    pub fn compress_batch(
        &self,
        files: &[SourceFile],
        config: &CompressionConfig,
        cancel: &CancelToken,
        progress: Option<Sender<BatchEvent>>,
    ) -> Vec<Result<CompressionResult, CompressError>> {
        let outcomes = process_all(&self.backend, &self.ids, files, config, cancel, progress);
        self.collect(outcomes)
    }

    /// Read and compress the files at `paths`, adding every success to the
    /// collection. Unreadable paths are per-item failures.
    pub fn compress_paths(
        &self,
        paths: &[PathBuf],
        config: &CompressionConfig,
        cancel: &CancelToken,
        progress: Option<Sender<BatchEvent>>,
    ) -> Vec<Result<CompressionResult, CompressError>> {
        let outcomes = process_paths(&self.backend, &self.ids, paths, config, cancel, progress);
        self.collect(outcomes)
    }

    fn collect(
        &self,
        outcomes: Vec<Result<CompressionResult, CompressError>>,
    ) -> Vec<Result<CompressionResult, CompressError>> {
        self.results
            .append(outcomes.iter().filter_map(|o| o.as_ref().ok()).cloned());
        outcomes
    }

    pub fn remove(&self, id: ImageId) -> Option<CompressionResult> {
        self.results.remove(id)
    }

    pub fn clear_all(&self) {
        self.results.clear_all();
    }

    pub fn totals(&self) -> Totals {
        self.results.totals()
    }

    pub fn results(&self) -> &ResultSet {
        &self.results
    }
}
