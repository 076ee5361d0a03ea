//! Runtime adapters: where runs execute.

pub mod thread_spawner;
#[cfg(feature = "tokio-runtime")]
pub mod tokio_spawner;
pub mod worker_pool;

use std::sync::Arc;

pub use thread_spawner::ThreadSpawner;
#[cfg(feature = "tokio-runtime")]
pub use tokio_spawner::TokioSpawner;
pub use worker_pool::{PoolStats, WorkerPool};

use crate::core::{SchedulerError, Spawn};

/// Spawner chosen at runtime from configuration.
#[derive(Clone)]
pub enum ConfiguredSpawner {
    /// One OS thread per run chain.
    Thread(ThreadSpawner),
    /// Shared fixed-size worker pool.
    WorkerPool(Arc<WorkerPool>),
    /// Tokio blocking pool.
    #[cfg(feature = "tokio-runtime")]
    Tokio(TokioSpawner),
}

impl Spawn for ConfiguredSpawner {
    fn spawn<F>(&self, job: F) -> Result<(), SchedulerError>
    where
        F: FnOnce() + Send + 'static,
    {
        match self {
            Self::Thread(spawner) => spawner.spawn(job),
            Self::WorkerPool(pool) => pool.spawn(job),
            #[cfg(feature = "tokio-runtime")]
            Self::Tokio(spawner) => spawner.spawn(job),
        }
    }
}

impl std::fmt::Debug for ConfiguredSpawner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Thread(spawner) => f.debug_tuple("Thread").field(spawner).finish(),
            Self::WorkerPool(pool) => f.debug_tuple("WorkerPool").field(&pool.stats()).finish(),
            #[cfg(feature = "tokio-runtime")]
            Self::Tokio(spawner) => f.debug_tuple("Tokio").field(spawner).finish(),
        }
    }
}
