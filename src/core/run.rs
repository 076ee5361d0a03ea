//! Run lifecycle tracking.
//!
//! A [`RunCell`] is the self-tracked record of one batch run. The gatekeeper holds
//! the current cell; the worker executing the run finishes it, which wakes anyone
//! waiting on it and hands over the chained successor, if one was attached.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};

/// State of the run currently tracked by a scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// No run is tracked.
    Idle,
    /// The tracked run has not finished. Covers chained runs still waiting on
    /// their predecessor.
    Active,
    /// The tracked run finished normally or after a handled action error.
    CompletedClean,
    /// The tracked run ended because of an infrastructure failure.
    CompletedFault,
}

impl RunState {
    /// Whether the run has reached a terminal state.
    #[must_use]
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::CompletedClean | Self::CompletedFault)
    }
}

/// What a single run did with its snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The drained snapshot was empty; the action was not called.
    Empty,
    /// The action processed the snapshot successfully.
    Processed {
        /// Items in the snapshot.
        batch_size: usize,
    },
    /// The action failed on the snapshot; the error went to observers.
    ActionFailed {
        /// Items in the snapshot.
        batch_size: usize,
    },
    /// Items were queued but no action was assigned; nothing was drained.
    Unconfigured,
}

/// Result of trying to attach a follow-up run.
pub(crate) enum Chain {
    /// A new successor was attached and must become current.
    Attached(Arc<RunCell>),
    /// The run has not started draining yet, so it will pick the new items up itself.
    Coalesced,
    /// The run already finished with the given state.
    Finished(RunState),
}

struct RunInner {
    state: RunState,
    started: bool,
    next: Option<Arc<RunCell>>,
}

/// Shared record for one run, signalled through a condvar on completion.
pub(crate) struct RunCell {
    id: u64,
    inner: Mutex<RunInner>,
    finished: Condvar,
}

impl RunCell {
    pub(crate) fn new(id: u64) -> Arc<Self> {
        Arc::new(Self {
            id,
            inner: Mutex::new(RunInner {
                state: RunState::Active,
                started: false,
                next: None,
            }),
            finished: Condvar::new(),
        })
    }

    pub(crate) const fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn state(&self) -> RunState {
        self.inner.lock().state
    }

    /// Mark the run as draining. After this point new items need a successor.
    pub(crate) fn mark_started(&self) {
        self.inner.lock().started = true;
    }

    /// Attach a successor built by `make` if this run is still active.
    ///
    /// Checking the state and attaching happen under one lock, so a successor is
    /// never attached to a run that has already handed off its chain.
    pub(crate) fn chain_with(&self, make: impl FnOnce() -> Arc<Self>) -> Chain {
        let mut inner = self.inner.lock();
        if inner.state.is_finished() {
            return Chain::Finished(inner.state);
        }
        if !inner.started {
            return Chain::Coalesced;
        }
        debug_assert!(inner.next.is_none(), "only the tail run accepts a successor");
        let next = make();
        inner.next = Some(Arc::clone(&next));
        Chain::Attached(next)
    }

    /// Move to a terminal state, wake waiters and hand back the successor.
    pub(crate) fn finish(&self, state: RunState) -> Option<Arc<Self>> {
        debug_assert!(state.is_finished());
        let next = {
            let mut inner = self.inner.lock();
            inner.state = state;
            inner.next.take()
        };
        self.finished.notify_all();
        next
    }

    /// Block until the run finishes or `deadline` passes. Returns whether it finished.
    pub(crate) fn wait_until(&self, deadline: Instant) -> bool {
        let mut inner = self.inner.lock();
        while !inner.state.is_finished() {
            if self.finished.wait_until(&mut inner, deadline).timed_out() {
                return inner.state.is_finished();
            }
        }
        true
    }
}
