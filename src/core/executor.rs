//! Batch action trait and the run executor.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use anyhow::anyhow;
use tracing::{debug, warn};

use super::{ErrorChannel, Mailbox, RunOutcome, SchedulerError};

/// Caller-supplied routine that consumes one drained snapshot.
///
/// The scheduler guarantees that at most one `execute` call is in progress per
/// scheduler instance. The order of items within `batch` carries no meaning.
///
/// Any closure `Fn(Vec<T>) -> anyhow::Result<()>` is a `BatchAction<T>`.
///
/// # Example
///
/// ```rust,ignore
/// use coalescing_scheduler::core::BatchAction;
///
/// struct BulkInsert {
///     table: String,
/// }
///
/// impl BatchAction<Row> for BulkInsert {
///     fn execute(&self, batch: Vec<Row>) -> anyhow::Result<()> {
///         db::insert_many(&self.table, &batch)?;
///         Ok(())
///     }
/// }
/// ```
pub trait BatchAction<T>: Send + Sync + 'static {
    /// Process one snapshot of items.
    ///
    /// # Errors
    ///
    /// Errors are reported to the scheduler's error observers. The items are not
    /// replayed.
    fn execute(&self, batch: Vec<T>) -> anyhow::Result<()>;
}

impl<T, F> BatchAction<T> for F
where
    F: Fn(Vec<T>) -> anyhow::Result<()> + Send + Sync + 'static,
{
    fn execute(&self, batch: Vec<T>) -> anyhow::Result<()> {
        self(batch)
    }
}

/// Execute one run: drain the mailbox and hand the snapshot to `action`.
///
/// Action errors and panics are converted into [`SchedulerError::UserAction`] and
/// published; they never escape this function. Observer panics do.
pub(crate) fn execute_run<T>(
    run_id: u64,
    mailbox: &dyn Mailbox<T>,
    action: Option<Arc<dyn BatchAction<T>>>,
    errors: &ErrorChannel,
) -> RunOutcome
where
    T: Send + 'static,
{
    let Some(action) = action else {
        if mailbox.is_empty() {
            debug!(run_id, "run found nothing to drain");
            return RunOutcome::Empty;
        }
        warn!(
            run_id,
            queued = mailbox.len(),
            "run found queued items but no batch action is assigned"
        );
        errors.publish(&SchedulerError::Configuration(
            "no batch action assigned".into(),
        ));
        return RunOutcome::Unconfigured;
    };

    let batch = mailbox.drain_all();
    if batch.is_empty() {
        debug!(run_id, "run found nothing to drain");
        return RunOutcome::Empty;
    }

    let batch_size = batch.len();
    debug!(run_id, batch_size, "executing batch action");

    let error = match panic::catch_unwind(AssertUnwindSafe(|| action.execute(batch))) {
        Ok(Ok(())) => {
            debug!(run_id, batch_size, "batch action completed");
            return RunOutcome::Processed { batch_size };
        }
        Ok(Err(err)) => err,
        Err(payload) => anyhow!("batch action panicked: {}", panic_message(payload.as_ref())),
    };

    warn!(run_id, batch_size, error = %format!("{error:#}"), "batch action failed");
    errors.publish(&SchedulerError::UserAction(error));
    RunOutcome::ActionFailed { batch_size }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
