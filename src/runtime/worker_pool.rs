//! Fixed pool of OS threads that run chains for any number of schedulers.
//!
//! # Design Principles
//!
//! - **No polling**: workers block on a crossbeam channel `recv`
//! - **Bounded admission**: a full queue is reported, never waited on
//! - **Clean shutdown**: dropping the sender unblocks idle workers naturally

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::SchedulerConfig;
use crate::core::executor::panic_message;
use crate::core::{SchedulerError, Spawn};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Statistics about pool utilization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Number of worker threads.
    pub worker_count: usize,
    /// Jobs currently executing.
    pub active_jobs: u64,
    /// Jobs waiting in the queue.
    pub queued_jobs: u64,
    /// Jobs accepted.
    pub submitted_jobs: u64,
    /// Jobs finished, including ones that panicked.
    pub completed_jobs: u64,
    /// Jobs rejected because the queue was full or the pool was shut down.
    pub rejected_jobs: u64,
}

/// Internal counters for pool statistics (thread-safe).
#[derive(Debug, Default)]
struct PoolCounters {
    active_jobs: AtomicU64,
    queued_jobs: AtomicU64,
    submitted_jobs: AtomicU64,
    completed_jobs: AtomicU64,
    rejected_jobs: AtomicU64,
}

impl PoolCounters {
    fn snapshot(&self, worker_count: usize) -> PoolStats {
        PoolStats {
            worker_count,
            active_jobs: self.active_jobs.load(Ordering::Relaxed),
            queued_jobs: self.queued_jobs.load(Ordering::Relaxed),
            submitted_jobs: self.submitted_jobs.load(Ordering::Relaxed),
            completed_jobs: self.completed_jobs.load(Ordering::Relaxed),
            rejected_jobs: self.rejected_jobs.load(Ordering::Relaxed),
        }
    }
}

/// Worker pool with dedicated OS threads.
///
/// Share one pool between many schedulers by wrapping it in an `Arc`; `Spawn`
/// is implemented for both `WorkerPool` and `Arc<WorkerPool>`.
pub struct WorkerPool {
    /// Job sender. `None` once shut down.
    job_tx: Mutex<Option<Sender<Job>>>,
    counters: Arc<PoolCounters>,
    shutdown: AtomicBool,
    workers: Mutex<Vec<JoinHandle<()>>>,
    worker_count: usize,
}

impl WorkerPool {
    /// Spawn `worker_count` threads fed by a queue holding `max_queue_depth` jobs.
    ///
    /// # Errors
    ///
    /// - `SchedulerError::InvalidConfig` for a zero worker count or queue depth
    /// - `SchedulerError::Infrastructure` if a worker thread cannot be spawned
    pub fn new(
        worker_count: usize,
        max_queue_depth: usize,
        name_prefix: &str,
        stack_size: Option<usize>,
    ) -> Result<Self, SchedulerError> {
        if worker_count == 0 {
            return Err(SchedulerError::InvalidConfig(
                "worker_count must be greater than 0".into(),
            ));
        }
        if max_queue_depth == 0 {
            return Err(SchedulerError::InvalidConfig(
                "max_queue_depth must be greater than 0".into(),
            ));
        }

        let (job_tx, job_rx) = bounded::<Job>(max_queue_depth);
        let counters = Arc::new(PoolCounters::default());

        let mut workers = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let worker = spawn_worker(
                worker_id,
                name_prefix,
                stack_size,
                job_rx.clone(),
                Arc::clone(&counters),
            )
            .map_err(|e| {
                SchedulerError::Infrastructure(format!("failed to spawn worker {worker_id}: {e}"))
            })?;
            workers.push(worker);
        }

        info!(worker_count, max_queue_depth, "worker pool initialized");

        Ok(Self {
            job_tx: Mutex::new(Some(job_tx)),
            counters,
            shutdown: AtomicBool::new(false),
            workers: Mutex::new(workers),
            worker_count,
        })
    }

    /// Build a pool from the worker settings of a scheduler configuration.
    ///
    /// # Errors
    ///
    /// See [`WorkerPool::new`].
    pub fn from_config(cfg: &SchedulerConfig) -> Result<Self, SchedulerError> {
        Self::new(
            cfg.worker_count,
            cfg.max_queue_depth,
            &cfg.thread_name_prefix,
            cfg.thread_stack_size,
        )
    }

    /// Current pool statistics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.counters.snapshot(self.worker_count)
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Stop accepting jobs and join workers, waiting up to 2 seconds each.
    ///
    /// Queued jobs still run before the workers exit. Workers that do not exit in
    /// time are detached.
    pub fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }

        info!("shutting down worker pool");
        *self.job_tx.lock() = None;

        let mut workers = self.workers.lock();
        let worker_count = workers.len();

        for (idx, worker) in workers.drain(..).enumerate() {
            let (tx, rx) = std::sync::mpsc::channel();
            let join_thread = thread::spawn(move || {
                let result = worker.join();
                let _ = tx.send(result.is_ok());
            });

            match rx.recv_timeout(Duration::from_secs(2)) {
                Ok(true) => debug!(worker_id = idx, "worker joined"),
                Ok(false) => warn!(worker_id = idx, "worker panicked"),
                Err(_) => warn!(worker_id = idx, "worker did not exit within timeout, detaching"),
            }

            let _ = join_thread.join();
        }

        info!(worker_count, "worker pool shut down");
    }

    fn submit(&self, job: Job) -> Result<(), SchedulerError> {
        let reject = |reason: &str| {
            self.counters.rejected_jobs.fetch_add(1, Ordering::Relaxed);
            SchedulerError::Infrastructure(reason.to_string())
        };

        if self.is_shut_down() {
            return Err(reject("worker pool is shut down"));
        }

        let job_tx = self.job_tx.lock();
        let Some(job_tx) = job_tx.as_ref() else {
            return Err(reject("worker pool is shut down"));
        };

        // Count before sending so a fast worker never decrements below zero.
        self.counters.queued_jobs.fetch_add(1, Ordering::Relaxed);
        match job_tx.try_send(job) {
            Ok(()) => {
                self.counters.submitted_jobs.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                self.counters.queued_jobs.fetch_sub(1, Ordering::Relaxed);
                warn!("worker pool queue is full");
                Err(reject("worker pool queue is full"))
            }
            Err(TrySendError::Disconnected(_)) => {
                self.counters.queued_jobs.fetch_sub(1, Ordering::Relaxed);
                Err(reject("worker pool is shut down"))
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Signal shutdown but don't join; explicit shutdown() is the graceful path.
        if !self.shutdown.swap(true, Ordering::AcqRel) {
            *self.job_tx.lock() = None;
            debug!("WorkerPool dropped without explicit shutdown - workers will be detached");
        }
    }
}

impl Spawn for WorkerPool {
    fn spawn<F>(&self, job: F) -> Result<(), SchedulerError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit(Box::new(job))
    }
}

impl Spawn for Arc<WorkerPool> {
    fn spawn<F>(&self, job: F) -> Result<(), SchedulerError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit(Box::new(job))
    }
}

fn spawn_worker(
    worker_id: usize,
    name_prefix: &str,
    stack_size: Option<usize>,
    job_rx: Receiver<Job>,
    counters: Arc<PoolCounters>,
) -> std::io::Result<JoinHandle<()>> {
    let mut builder = thread::Builder::new().name(format!("{name_prefix}-worker-{worker_id}"));
    if let Some(size) = stack_size {
        builder = builder.stack_size(size);
    }
    builder.spawn(move || {
        debug!(worker_id, "worker thread started");

        // Blocks until a job arrives; returns Err once the sender is dropped.
        while let Ok(job) = job_rx.recv() {
            counters.queued_jobs.fetch_sub(1, Ordering::Relaxed);
            counters.active_jobs.fetch_add(1, Ordering::Relaxed);

            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
                error!(
                    worker_id,
                    panic = %panic_message(payload.as_ref()),
                    "job panicked; worker continues"
                );
            }

            counters.active_jobs.fetch_sub(1, Ordering::Relaxed);
            counters.completed_jobs.fetch_add(1, Ordering::Relaxed);
        }

        debug!(worker_id, "worker thread exiting");
    })
}
