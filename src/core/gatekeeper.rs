//! Gatekeeper: decides on every push whether a run must be started or chained.
//!
//! Decision rights are a zero-wait `try_lock` on the current-run slot. A thread
//! that loses the race returns immediately; the `pending` flag it raised makes the
//! winner run one more decision after releasing the slot, so no push is stranded
//! between a run's drain and the end of the winner's decision.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::run::{Chain, RunCell};
use super::{RunState, SchedulerCounters, SchedulerError};

/// What one decision did.
#[derive(Debug)]
pub(crate) enum Decision {
    /// A fresh run was handed to a worker.
    Started,
    /// Handing a fresh run to a worker failed; the chain is now faulted.
    LaunchFailed(SchedulerError),
    /// A run was chained behind the in-flight one.
    Chained,
    /// A chained run that has not started yet will absorb the new items.
    Coalesced,
    /// The chain is halted by a fault.
    Halted,
}

/// Per-scheduler state machine over the current run.
pub(crate) struct Gatekeeper {
    current: Mutex<Option<Arc<RunCell>>>,
    pending: AtomicBool,
    next_run_id: AtomicU64,
    auto_reset_on_fault: bool,
}

impl Gatekeeper {
    pub(crate) fn new(auto_reset_on_fault: bool) -> Self {
        Self {
            current: Mutex::new(None),
            pending: AtomicBool::new(false),
            next_run_id: AtomicU64::new(1),
            auto_reset_on_fault,
        }
    }

    /// Try to decide. `launch` hands a fresh run to a worker.
    ///
    /// Never blocks: if another thread holds decision rights this returns at once
    /// and that thread re-decides on our behalf. Launch failures are returned
    /// once decision rights are released, so callers may publish them to code
    /// that calls back into the gatekeeper.
    pub(crate) fn trigger<F>(
        &self,
        counters: &SchedulerCounters,
        mut launch: F,
    ) -> Vec<SchedulerError>
    where
        F: FnMut(Arc<RunCell>) -> Result<(), SchedulerError>,
    {
        let mut failures = Vec::new();
        self.pending.store(true, Ordering::SeqCst);
        loop {
            let Some(mut current) = self.current.try_lock() else {
                SchedulerCounters::bump(&counters.skipped_triggers);
                return failures;
            };
            self.pending.store(false, Ordering::SeqCst);
            SchedulerCounters::bump(&counters.triggers);

            let state = current.as_ref().map_or(RunState::Idle, |run| run.state());
            let decision = self.decide(state, &mut current, counters, &mut launch);
            drop(current);

            match decision {
                Decision::Started => SchedulerCounters::bump(&counters.runs_started),
                Decision::LaunchFailed(err) => {
                    SchedulerCounters::bump(&counters.faults);
                    failures.push(err);
                }
                Decision::Chained => SchedulerCounters::bump(&counters.runs_chained),
                Decision::Coalesced => SchedulerCounters::bump(&counters.coalesced_triggers),
                Decision::Halted => SchedulerCounters::bump(&counters.halted_triggers),
            }

            if !self.pending.load(Ordering::SeqCst) {
                return failures;
            }
        }
    }

    fn decide<F>(
        &self,
        state: RunState,
        current: &mut Option<Arc<RunCell>>,
        counters: &SchedulerCounters,
        launch: &mut F,
    ) -> Decision
    where
        F: FnMut(Arc<RunCell>) -> Result<(), SchedulerError>,
    {
        match state {
            RunState::Idle | RunState::CompletedClean => self.start(current, launch),
            RunState::CompletedFault if self.auto_reset_on_fault => {
                info!("resetting faulted run chain");
                SchedulerCounters::bump(&counters.resets);
                self.start(current, launch)
            }
            RunState::CompletedFault => {
                warn!("run chain halted by an earlier fault; call reset() to resume");
                Decision::Halted
            }
            RunState::Active => {
                let Some(tail) = current.as_ref() else {
                    return self.start(current, launch);
                };
                match tail.chain_with(|| RunCell::new(self.next_id())) {
                    Chain::Attached(next) => {
                        debug!(after = tail.id(), run_id = next.id(), "chained follow-up run");
                        *current = Some(next);
                        Decision::Chained
                    }
                    Chain::Coalesced => Decision::Coalesced,
                    // Finished between the state read and the chain attempt.
                    Chain::Finished(finished) => self.decide(finished, current, counters, launch),
                }
            }
        }
    }

    fn start<F>(&self, current: &mut Option<Arc<RunCell>>, launch: &mut F) -> Decision
    where
        F: FnMut(Arc<RunCell>) -> Result<(), SchedulerError>,
    {
        let run = RunCell::new(self.next_id());
        *current = Some(Arc::clone(&run));
        match launch(Arc::clone(&run)) {
            Ok(()) => {
                debug!(run_id = run.id(), "started run");
                Decision::Started
            }
            Err(err) => {
                run.finish(RunState::CompletedFault);
                Decision::LaunchFailed(err)
            }
        }
    }

    fn next_id(&self) -> u64 {
        self.next_run_id.fetch_add(1, Ordering::Relaxed)
    }

    /// The tracked run, if any. Waits for decision rights.
    pub(crate) fn current(&self) -> Option<Arc<RunCell>> {
        self.current.lock().clone()
    }

    pub(crate) fn state(&self) -> RunState {
        self.current().map_or(RunState::Idle, |run| run.state())
    }

    /// Drop a faulted run so the next trigger starts fresh. Returns whether the
    /// chain was faulted.
    pub(crate) fn reset(&self) -> bool {
        let mut current = self.current.lock();
        if current.as_ref().map(|run| run.state()) == Some(RunState::CompletedFault) {
            *current = None;
            true
        } else {
            false
        }
    }
}
