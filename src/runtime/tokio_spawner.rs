//! Tokio runtime spawner implementation.

use std::sync::Arc;

use tokio::runtime::{Handle, Runtime};

use crate::core::{SchedulerError, Spawn};

/// Spawner that runs each run chain on a tokio runtime's blocking pool.
///
/// Batch actions are synchronous, so they go through `spawn_blocking` and never
/// stall the runtime's async workers.
#[derive(Clone)]
pub struct TokioSpawner {
    handle: Handle,
    /// Keeps an owned runtime alive for as long as any spawner clone exists.
    owned_runtime: Option<Arc<Runtime>>,
}

impl TokioSpawner {
    /// Create a spawner from a tokio runtime handle.
    #[must_use]
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            owned_runtime: None,
        }
    }

    /// Create a spawner on the runtime the caller is running in.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::Infrastructure` outside a tokio runtime.
    pub fn current() -> Result<Self, SchedulerError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| SchedulerError::Infrastructure(format!("no tokio runtime: {e}")))
    }

    /// Create a spawner owning a new multi-threaded runtime.
    ///
    /// # Errors
    ///
    /// Returns the I/O error from building the runtime.
    pub fn with_worker_threads(worker_threads: usize) -> Result<Self, std::io::Error> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(worker_threads)
            .thread_name("coalesce-tokio")
            .enable_all()
            .build()?;
        Ok(Self {
            handle: runtime.handle().clone(),
            owned_runtime: Some(Arc::new(runtime)),
        })
    }
}

impl Spawn for TokioSpawner {
    fn spawn<F>(&self, job: F) -> Result<(), SchedulerError>
    where
        F: FnOnce() + Send + 'static,
    {
        drop(self.handle.spawn_blocking(job));
        Ok(())
    }
}

impl std::fmt::Debug for TokioSpawner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokioSpawner")
            .field("owns_runtime", &self.owned_runtime.is_some())
            .finish()
    }
}
