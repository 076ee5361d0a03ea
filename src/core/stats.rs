//! Scheduler statistics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Point-in-time counters describing scheduler activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    /// Items pushed.
    pub pushes: u64,
    /// Triggers that acquired decision rights.
    pub triggers: u64,
    /// Triggers that found decision rights held elsewhere.
    pub skipped_triggers: u64,
    /// Fresh runs handed to a worker.
    pub runs_started: u64,
    /// Runs chained behind an in-flight run.
    pub runs_chained: u64,
    /// Triggers absorbed by a chained run that had not started yet.
    pub coalesced_triggers: u64,
    /// Triggers ignored because the chain is halted.
    pub halted_triggers: u64,
    /// Runs that drained nothing.
    pub empty_runs: u64,
    /// Action invocations that returned successfully.
    pub batches_processed: u64,
    /// Items handed to the action across all invocations.
    pub items_processed: u64,
    /// Action invocations that failed.
    pub action_failures: u64,
    /// Runs that found queued items but no action.
    pub configuration_errors: u64,
    /// Runs that ended in an infrastructure fault.
    pub faults: u64,
    /// Explicit or automatic resets out of a faulted state.
    pub resets: u64,
}

/// Internal counters for scheduler statistics (thread-safe).
#[derive(Debug, Default)]
pub(crate) struct SchedulerCounters {
    pub pushes: AtomicU64,
    pub triggers: AtomicU64,
    pub skipped_triggers: AtomicU64,
    pub runs_started: AtomicU64,
    pub runs_chained: AtomicU64,
    pub coalesced_triggers: AtomicU64,
    pub halted_triggers: AtomicU64,
    pub empty_runs: AtomicU64,
    pub batches_processed: AtomicU64,
    pub items_processed: AtomicU64,
    pub action_failures: AtomicU64,
    pub configuration_errors: AtomicU64,
    pub faults: AtomicU64,
    pub resets: AtomicU64,
}

impl SchedulerCounters {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of current statistics.
    pub(crate) fn snapshot(&self) -> SchedulerStats {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        SchedulerStats {
            pushes: load(&self.pushes),
            triggers: load(&self.triggers),
            skipped_triggers: load(&self.skipped_triggers),
            runs_started: load(&self.runs_started),
            runs_chained: load(&self.runs_chained),
            coalesced_triggers: load(&self.coalesced_triggers),
            halted_triggers: load(&self.halted_triggers),
            empty_runs: load(&self.empty_runs),
            batches_processed: load(&self.batches_processed),
            items_processed: load(&self.items_processed),
            action_failures: load(&self.action_failures),
            configuration_errors: load(&self.configuration_errors),
            faults: load(&self.faults),
            resets: load(&self.resets),
        }
    }
}
