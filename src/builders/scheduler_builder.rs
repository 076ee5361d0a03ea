//! Build schedulers from configuration.

use std::sync::Arc;

use crate::config::{MailboxBackendConfig, SchedulerConfig, SpawnerConfig};
use crate::core::{BatchAction, CoalescingScheduler, ErrorObserver, Mailbox, SchedulerError};
use crate::infra::mailbox::{ChannelMailbox, LockedMailbox};
use crate::runtime::{ConfiguredSpawner, ThreadSpawner, WorkerPool};

/// Create the mailbox backend selected by `backend`.
#[must_use]
pub fn build_mailbox<T>(backend: MailboxBackendConfig) -> Box<dyn Mailbox<T>>
where
    T: Send + 'static,
{
    match backend {
        MailboxBackendConfig::Locked => Box::new(LockedMailbox::new()),
        MailboxBackendConfig::Channel => Box::new(ChannelMailbox::new()),
    }
}

/// Create the spawner selected by `cfg.spawner`.
///
/// For [`SpawnerConfig::Tokio`] the caller's runtime is used when there is one;
/// otherwise a runtime with `cfg.worker_count` threads is created and owned.
///
/// # Errors
///
/// - `SchedulerError::InvalidConfig` if `cfg` fails validation or selects tokio
///   without the `tokio-runtime` feature
/// - `SchedulerError::Infrastructure` if worker threads or a runtime cannot start
pub fn build_spawner(cfg: &SchedulerConfig) -> Result<ConfiguredSpawner, SchedulerError> {
    cfg.validate().map_err(SchedulerError::InvalidConfig)?;

    match cfg.spawner {
        SpawnerConfig::Thread => Ok(ConfiguredSpawner::Thread(ThreadSpawner::new(
            cfg.thread_name_prefix.clone(),
            cfg.thread_stack_size,
        ))),
        SpawnerConfig::WorkerPool => Ok(ConfiguredSpawner::WorkerPool(Arc::new(
            WorkerPool::from_config(cfg)?,
        ))),
        #[cfg(feature = "tokio-runtime")]
        SpawnerConfig::Tokio => {
            use crate::runtime::TokioSpawner;

            let spawner = match TokioSpawner::current() {
                Ok(spawner) => spawner,
                Err(_) => TokioSpawner::with_worker_threads(cfg.worker_count).map_err(|e| {
                    SchedulerError::Infrastructure(format!("failed to start tokio runtime: {e}"))
                })?,
            };
            Ok(ConfiguredSpawner::Tokio(spawner))
        }
        #[cfg(not(feature = "tokio-runtime"))]
        SpawnerConfig::Tokio => Err(SchedulerError::InvalidConfig(
            "tokio spawner requires the `tokio-runtime` feature".into(),
        )),
    }
}

/// Build a scheduler from configuration.
///
/// # Errors
///
/// See [`build_spawner`].
pub fn build_scheduler<T>(
    cfg: &SchedulerConfig,
) -> Result<CoalescingScheduler<T, ConfiguredSpawner>, SchedulerError>
where
    T: Send + 'static,
{
    let spawner = build_spawner(cfg)?;
    Ok(CoalescingScheduler::with_parts(
        build_mailbox(cfg.mailbox),
        spawner,
        cfg.auto_reset_on_fault,
    ))
}

/// Fluent construction of a ready-to-use scheduler.
///
/// ```rust,ignore
/// let scheduler = SchedulerBuilder::new()
///     .config(SchedulerConfig::new().with_mailbox(MailboxBackendConfig::Channel))
///     .action(|batch: Vec<Event>| sink.write_all(&batch))
///     .observer(|err| tracing::error!(%err, "event batch failed"))
///     .build()?;
/// ```
pub struct SchedulerBuilder<T> {
    config: SchedulerConfig,
    action: Option<Arc<dyn BatchAction<T>>>,
    observers: Vec<ErrorObserver>,
    pool: Option<Arc<WorkerPool>>,
}

impl<T> Default for SchedulerBuilder<T>
where
    T: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SchedulerBuilder<T>
where
    T: Send + 'static,
{
    /// Start from the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: SchedulerConfig::default(),
            action: None,
            observers: Vec::new(),
            pool: None,
        }
    }

    /// Use `config` instead of the defaults.
    #[must_use]
    pub fn config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    /// Assign the batch action up front.
    #[must_use]
    pub fn action<A>(mut self, action: A) -> Self
    where
        A: BatchAction<T>,
    {
        self.action = Some(Arc::new(action));
        self
    }

    /// Register an error observer up front.
    #[must_use]
    pub fn observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(&SchedulerError) + Send + Sync + 'static,
    {
        self.observers.push(Arc::new(observer));
        self
    }

    /// Run on an existing worker pool shared with other schedulers. Overrides
    /// the configured spawner.
    #[must_use]
    pub fn shared_pool(mut self, pool: Arc<WorkerPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Build the scheduler.
    ///
    /// # Errors
    ///
    /// See [`build_spawner`].
    pub fn build(self) -> Result<CoalescingScheduler<T, ConfiguredSpawner>, SchedulerError> {
        let spawner = match self.pool {
            Some(pool) => {
                self.config
                    .validate()
                    .map_err(SchedulerError::InvalidConfig)?;
                ConfiguredSpawner::WorkerPool(pool)
            }
            None => build_spawner(&self.config)?,
        };

        let scheduler = CoalescingScheduler::with_parts(
            build_mailbox(self.config.mailbox),
            spawner,
            self.config.auto_reset_on_fault,
        );
        for observer in self.observers {
            scheduler.subscribe(move |err| observer(err));
        }
        if let Some(action) = self.action {
            scheduler.set_shared_action(action);
        }
        Ok(scheduler)
    }
}
