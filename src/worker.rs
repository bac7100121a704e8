//! Bounded pool for blocking work
//!
//! Extraction and transcoding block for minutes at a time. Jobs are submitted
//! here instead of running on the async runtime; the caller awaits the result
//! while the dispatcher keeps serving other conversations. A semaphore bounds
//! how many jobs run at once across every conversation.

use crate::error::{DownloadError, Error, Result};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Handle to the shared blocking worker pool (cheap to clone)
#[derive(Clone, Debug)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    /// Create a pool that runs at most `size` jobs concurrently
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    /// Maximum number of concurrent jobs
    pub fn size(&self) -> usize {
        self.size
    }

    /// Jobs that could start right now without waiting
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Run a blocking job and await its result
    ///
    /// Waits for a free slot first. A job that panics surfaces as
    /// [`DownloadError::WorkerCrashed`].
    pub async fn run<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| Error::Download(DownloadError::WorkerCrashed(e.to_string())))?;

        let handle = tokio::task::spawn_blocking(move || {
            let result = job();
            drop(permit);
            result
        });

        match handle.await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error = %e, "blocking job did not complete");
                Err(Error::Download(DownloadError::WorkerCrashed(e.to_string())))
            }
        }
    }
}
