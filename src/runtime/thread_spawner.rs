//! Spawner that gives every run chain its own OS thread.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use crate::core::{SchedulerError, Spawn};

/// Spawns a named, detached OS thread per run chain.
///
/// A chain keeps its thread until no follow-up run is attached, so a busy
/// scheduler reuses one thread across many runs.
#[derive(Debug, Clone)]
pub struct ThreadSpawner {
    name_prefix: Arc<str>,
    stack_size: Option<usize>,
    spawned: Arc<AtomicU64>,
}

impl ThreadSpawner {
    /// Create a spawner naming its threads `{prefix}-{n}`.
    pub fn new(name_prefix: impl Into<String>, stack_size: Option<usize>) -> Self {
        Self {
            name_prefix: Arc::from(name_prefix.into()),
            stack_size,
            spawned: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Threads spawned so far.
    #[must_use]
    pub fn spawned(&self) -> u64 {
        self.spawned.load(Ordering::Relaxed)
    }
}

impl Default for ThreadSpawner {
    fn default() -> Self {
        Self::new("coalesce", None)
    }
}

impl Spawn for ThreadSpawner {
    fn spawn<F>(&self, job: F) -> Result<(), SchedulerError>
    where
        F: FnOnce() + Send + 'static,
    {
        let n = self.spawned.fetch_add(1, Ordering::Relaxed);
        let mut builder = thread::Builder::new().name(format!("{}-{n}", self.name_prefix));
        if let Some(size) = self.stack_size {
            builder = builder.stack_size(size);
        }
        builder
            .spawn(job)
            .map(|_| ())
            .map_err(|e| SchedulerError::Infrastructure(format!("failed to spawn run thread: {e}")))
    }
}
