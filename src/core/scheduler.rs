//! The coalescing scheduler and its spawning seam.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::executor::{execute_run, panic_message};
use super::gatekeeper::Gatekeeper;
use super::run::RunCell;
use super::{
    BatchAction, ErrorChannel, Mailbox, RunOutcome, RunState, SchedulerCounters, SchedulerError,
    SchedulerStats, SubscriptionId,
};
use crate::infra::mailbox::LockedMailbox;
use crate::runtime::ThreadSpawner;

/// Abstraction for handing a run to a worker.
///
/// Errors mean the job was not accepted and will never run; the scheduler then
/// marks the run as faulted.
pub trait Spawn {
    /// Run `job` on some worker, detached from the caller.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Infrastructure`] when the job cannot be handed off.
    fn spawn<F>(&self, job: F) -> Result<(), SchedulerError>
    where
        F: FnOnce() + Send + 'static;
}

/// State shared between the scheduler handle and the worker driving a run chain.
pub(crate) struct Shared<T> {
    pub(crate) id: Uuid,
    pub(crate) mailbox: Box<dyn Mailbox<T>>,
    pub(crate) action: RwLock<Option<Arc<dyn BatchAction<T>>>>,
    pub(crate) errors: ErrorChannel,
    pub(crate) gate: Gatekeeper,
    pub(crate) counters: SchedulerCounters,
}

/// Serial task-coalescing scheduler.
///
/// Any number of threads may [`push`](Self::push) items. A single batch action
/// processes everything that accumulated, on at most one worker at a time; items
/// arriving while a run is in flight are picked up by one chained follow-up run.
///
/// Cloning yields another handle to the same scheduler.
///
/// # Example
///
/// ```rust,ignore
/// use coalescing_scheduler::core::CoalescingScheduler;
///
/// let scheduler = CoalescingScheduler::<u64>::new();
/// scheduler.set_action(|ids: Vec<u64>| {
///     store.mark_read(&ids)?;
///     Ok(())
/// });
/// scheduler.subscribe(|err| tracing::error!(%err, "mark_read batch failed"));
///
/// for id in incoming {
///     scheduler.push(id);
/// }
/// scheduler.flush(std::time::Duration::from_secs(5))?;
/// ```
pub struct CoalescingScheduler<T, S = ThreadSpawner> {
    shared: Arc<Shared<T>>,
    spawner: S,
}

impl<T> CoalescingScheduler<T, ThreadSpawner>
where
    T: Send + 'static,
{
    /// Create a scheduler with the locked mailbox and one thread per run chain.
    #[must_use]
    pub fn new() -> Self {
        Self::with_parts(
            Box::new(LockedMailbox::new()),
            ThreadSpawner::default(),
            false,
        )
    }
}

impl<T> Default for CoalescingScheduler<T, ThreadSpawner>
where
    T: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, S> CoalescingScheduler<T, S>
where
    T: Send + 'static,
    S: Spawn,
{
    /// Create a scheduler from explicit components.
    ///
    /// With `auto_reset_on_fault` a faulted chain restarts on the next push
    /// instead of waiting for [`reset`](Self::reset).
    pub fn with_parts(mailbox: Box<dyn Mailbox<T>>, spawner: S, auto_reset_on_fault: bool) -> Self {
        let id = Uuid::new_v4();
        info!(scheduler_id = %id, auto_reset_on_fault, "coalescing scheduler created");
        Self {
            shared: Arc::new(Shared {
                id,
                mailbox,
                action: RwLock::new(None),
                errors: ErrorChannel::new(),
                gate: Gatekeeper::new(auto_reset_on_fault),
                counters: SchedulerCounters::default(),
            }),
            spawner,
        }
    }

    /// Identifier used in this scheduler's log records.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    /// Assign the batch action, replacing any previous one.
    ///
    /// Items that queued up while no action was assigned are scheduled right away.
    pub fn set_action<A>(&self, action: A)
    where
        A: BatchAction<T>,
    {
        self.set_shared_action(Arc::new(action));
    }

    /// Assign an action that is already shared, e.g. between several schedulers.
    pub fn set_shared_action(&self, action: Arc<dyn BatchAction<T>>) {
        *self.shared.action.write() = Some(action);
        debug!(scheduler_id = %self.shared.id, "batch action assigned");
        if !self.shared.mailbox.is_empty() {
            self.trigger();
        }
    }

    /// The currently assigned batch action.
    #[must_use]
    pub fn action(&self) -> Option<Arc<dyn BatchAction<T>>> {
        self.shared.action.read().clone()
    }

    /// Remove the batch action. Later runs report a configuration error.
    pub fn clear_action(&self) -> Option<Arc<dyn BatchAction<T>>> {
        self.shared.action.write().take()
    }

    /// Queue an item and make sure a run will pick it up.
    ///
    /// Never blocks on another thread's scheduling decision and never reports
    /// batch-processing errors.
    pub fn push(&self, item: T) {
        self.shared.mailbox.push(item);
        SchedulerCounters::bump(&self.shared.counters.pushes);
        self.trigger();
    }

    /// Queue several items with a single scheduling decision.
    pub fn push_many<I>(&self, items: I)
    where
        I: IntoIterator<Item = T>,
    {
        let mut pushed = 0_u64;
        for item in items {
            self.shared.mailbox.push(item);
            pushed += 1;
        }
        if pushed > 0 {
            self.shared
                .counters
                .pushes
                .fetch_add(pushed, std::sync::atomic::Ordering::Relaxed);
            self.trigger();
        }
    }

    /// Register an error observer.
    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&SchedulerError) + Send + Sync + 'static,
    {
        self.shared.errors.subscribe(observer)
    }

    /// Remove an error observer. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.errors.unsubscribe(id)
    }

    /// State of the tracked run.
    #[must_use]
    pub fn run_state(&self) -> RunState {
        self.shared.gate.state()
    }

    /// Items queued and not yet drained. Advisory under concurrent pushes.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.shared.mailbox.len()
    }

    /// Snapshot of activity counters.
    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        self.shared.counters.snapshot()
    }

    /// Clear a fault-halted chain and reschedule any queued items.
    ///
    /// Returns `false` if the chain was not halted.
    pub fn reset(&self) -> bool {
        if !self.shared.gate.reset() {
            return false;
        }
        SchedulerCounters::bump(&self.shared.counters.resets);
        info!(scheduler_id = %self.shared.id, "run chain reset after fault");
        if !self.shared.mailbox.is_empty() {
            self.trigger();
        }
        true
    }

    /// Block until every queued item has been processed and no run is in flight.
    ///
    /// # Errors
    ///
    /// - [`SchedulerError::Timeout`] if the deadline passes first
    /// - [`SchedulerError::Halted`] if a fault halted the chain with items queued
    /// - [`SchedulerError::Configuration`] if items are queued but no action is set
    pub fn flush(&self, timeout: Duration) -> Result<(), SchedulerError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(run) = self.shared.gate.current() {
                match run.state() {
                    RunState::Active => {
                        if !run.wait_until(deadline) {
                            return Err(SchedulerError::Timeout);
                        }
                        continue;
                    }
                    RunState::CompletedFault if !self.shared.mailbox.is_empty() => {
                        return Err(SchedulerError::Halted);
                    }
                    _ => {}
                }
            }

            if self.shared.mailbox.is_empty() {
                return Ok(());
            }
            if self.shared.action.read().is_none() {
                return Err(SchedulerError::Configuration(
                    "items queued but no batch action assigned".into(),
                ));
            }
            if Instant::now() >= deadline {
                return Err(SchedulerError::Timeout);
            }
            // Items visible but no run tracked yet: a producer's decision is in
            // progress, or we raced it. Deciding again is always safe.
            self.trigger();
            thread::yield_now();
        }
    }

    fn trigger(&self) {
        let shared = &self.shared;
        for err in shared.gate.trigger(&shared.counters, |run| self.launch(run)) {
            shared.errors.publish(&err);
        }
    }

    /// Hand `run` to the spawner. Called under decision rights, so it must not
    /// publish to observers itself.
    fn launch(&self, run: Arc<RunCell>) -> Result<(), SchedulerError> {
        let run_id = run.id();
        let handoff = Arc::new(Mutex::new(Handoff {
            launching: true,
            dropped: None,
        }));
        let job = RunJob {
            shared: Arc::clone(&self.shared),
            run: Some(run),
            handoff: Arc::clone(&handoff),
        };

        let spawned = self.spawner.spawn(move || job.execute());
        let dropped = {
            let mut handoff = handoff.lock();
            handoff.launching = false;
            handoff.dropped.take()
        };

        spawned
            .and_then(|()| dropped.map_or(Ok(()), Err))
            .inspect_err(|err| {
                error!(
                    scheduler_id = %self.shared.id,
                    run_id,
                    error = %err,
                    "failed to hand run to a worker; chain halted"
                );
            })
    }
}

#[cfg(feature = "tokio-runtime")]
impl<T, S> CoalescingScheduler<T, S>
where
    T: Send + 'static,
    S: Spawn + Clone + Send + Sync + 'static,
{
    /// Async variant of [`flush`](Self::flush); the wait happens on tokio's
    /// blocking pool.
    ///
    /// # Errors
    ///
    /// Same as [`flush`](Self::flush), plus [`SchedulerError::Infrastructure`] if
    /// the blocking task could not complete.
    pub async fn flush_async(&self, timeout: Duration) -> Result<(), SchedulerError> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.flush(timeout))
            .await
            .map_err(|e| SchedulerError::Infrastructure(format!("flush task failed: {e}")))?
    }
}

impl<T, S: Clone> Clone for CoalescingScheduler<T, S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            spawner: self.spawner.clone(),
        }
    }
}

impl<T, S> fmt::Debug for CoalescingScheduler<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoalescingScheduler")
            .field("id", &self.shared.id)
            .field("pending", &self.shared.mailbox.len())
            .field("run_state", &self.shared.gate.state())
            .field("observers", &self.shared.errors.len())
            .finish_non_exhaustive()
    }
}

struct Handoff {
    /// The spawner call is still in progress on the launching thread.
    launching: bool,
    dropped: Option<SchedulerError>,
}

/// Job handed to the spawner. Dropping it without executing faults the run.
struct RunJob<T>
where
    T: Send + 'static,
{
    shared: Arc<Shared<T>>,
    run: Option<Arc<RunCell>>,
    handoff: Arc<Mutex<Handoff>>,
}

impl<T> RunJob<T>
where
    T: Send + 'static,
{
    fn execute(mut self) {
        if let Some(run) = self.run.take() {
            run_chain(&self.shared, run);
        }
    }
}

impl<T> Drop for RunJob<T>
where
    T: Send + 'static,
{
    fn drop(&mut self) {
        let Some(run) = self.run.take() else {
            return;
        };
        run.finish(RunState::CompletedFault);
        let err =
            SchedulerError::Infrastructure("run discarded by its worker before starting".into());

        let mut handoff = self.handoff.lock();
        if handoff.launching {
            // The launching thread reports it once decision rights are released.
            handoff.dropped = Some(err);
            return;
        }
        drop(handoff);

        SchedulerCounters::bump(&self.shared.counters.faults);
        error!(
            scheduler_id = %self.shared.id,
            run_id = run.id(),
            "run discarded by its worker before starting; chain halted"
        );
        self.shared.errors.publish(&err);
    }
}

/// Worker body: execute `first`, then every run chained behind it.
///
/// A panic escaping the executor (an observer panicking) faults the run and any
/// successor already attached, which halts the chain.
fn run_chain<T>(shared: &Shared<T>, first: Arc<RunCell>)
where
    T: Send + 'static,
{
    let mut next = Some(first);
    while let Some(run) = next.take() {
        run.mark_started();
        let action = shared.action.read().clone();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            execute_run(run.id(), shared.mailbox.as_ref(), action, &shared.errors)
        }));

        match result {
            Ok(outcome) => {
                record_outcome(shared, outcome);
                next = run.finish(RunState::CompletedClean);
            }
            Err(payload) => {
                SchedulerCounters::bump(&shared.counters.faults);
                error!(
                    scheduler_id = %shared.id,
                    run_id = run.id(),
                    panic = %panic_message(payload.as_ref()),
                    "run aborted by a panic outside the batch action; chain halted"
                );
                let mut successor = run.finish(RunState::CompletedFault);
                while let Some(pending) = successor {
                    warn!(run_id = pending.id(), "dropping chained run behind faulted run");
                    successor = pending.finish(RunState::CompletedFault);
                }
            }
        }
    }
}

fn record_outcome<T>(shared: &Shared<T>, outcome: RunOutcome) {
    let counters = &shared.counters;
    match outcome {
        RunOutcome::Empty => SchedulerCounters::bump(&counters.empty_runs),
        RunOutcome::Processed { batch_size } => {
            SchedulerCounters::bump(&counters.batches_processed);
            counters
                .items_processed
                .fetch_add(batch_size as u64, std::sync::atomic::Ordering::Relaxed);
        }
        RunOutcome::ActionFailed { batch_size } => {
            SchedulerCounters::bump(&counters.action_failures);
            counters
                .items_processed
                .fetch_add(batch_size as u64, std::sync::atomic::Ordering::Relaxed);
        }
        RunOutcome::Unconfigured => SchedulerCounters::bump(&counters.configuration_errors),
    }
}
