//! Core scheduling abstractions: mailbox, gatekeeper, executor and error channel.

pub mod error;
pub mod executor;
pub mod mailbox;
pub mod observers;
pub mod run;
pub mod scheduler;
pub mod stats;

mod gatekeeper;

pub use error::{AppResult, SchedulerError};
pub use executor::BatchAction;
pub use mailbox::Mailbox;
pub use observers::{ErrorChannel, ErrorObserver, SubscriptionId};
pub use run::{RunOutcome, RunState};
pub use scheduler::{CoalescingScheduler, Spawn};
pub use stats::SchedulerStats;

pub(crate) use stats::SchedulerCounters;
