//! Bounded execution of blocking extraction work, plus run cancellation.
//!
//! OCR and legacy-DOC conversion are CPU- or subprocess-bound; running one
//! pipeline per tender unbounded would fork a tesseract per core per tender.
//! The pool caps how many blocking jobs run at once, independently of the
//! async runtime's own thread budget.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Semaphore;

#[derive(Error, Debug)]
pub enum PoolError {
    #[error("Extraction pool is closed")]
    Closed,
    #[error("Extraction job panicked: {0}")]
    Panicked(String),
}

/// Semaphore-bounded `spawn_blocking` pool. Cloning shares the same permits.
#[derive(Clone)]
pub struct ExtractionPool {
    permits: Arc<Semaphore>,
}

impl ExtractionPool {
    pub fn new(workers: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(workers.max(1))),
        }
    }

    /// Pool sized from the configured worker cap.
    pub fn from_config(config: &crate::config::PipelineConfig) -> Self {
        Self::new(config.extraction_workers)
    }

    /// Run a blocking job once a worker slot frees up.
    pub async fn run<F, T>(&self, job: F) -> Result<T, PoolError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| PoolError::Closed)?;
        let handle = tokio::task::spawn_blocking(move || {
            let result = job();
            drop(permit);
            result
        });
        handle
            .await
            .map_err(|join_err| PoolError::Panicked(join_err.to_string()))
    }
}

/// Shared flag the calling layer flips to stop a run between files.
#[derive(Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
