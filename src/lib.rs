//! # Coalescing Scheduler
//!
//! A serial task-coalescing scheduler: many producer threads push items, and a
//! single caller-supplied batch action processes them, never on more than one
//! thread at a time.
//!
//! ## Core Problem Solved
//!
//! Many individually-triggered writes (read receipts, cache invalidations, index
//! updates) are far cheaper as one downstream call. Batching them by hand means
//! juggling timers, locks and "is a flush already running?" flags. This crate
//! packages that pattern:
//!
//! - **Mailbox**: producers push into an unordered concurrent buffer
//! - **Gatekeeper**: every push makes a zero-wait decision to start, chain, or skip
//! - **Executor**: a run drains everything queued and hands it to the action once
//! - **Error channel**: action failures go to observers, never to producers
//!
//! ## Key Guarantees
//!
//! - At most one batch action invocation in flight per scheduler
//! - Every pushed item lands in exactly one batch
//! - Items pushed during a run are picked up by one chained follow-up run
//! - An empty drain never calls the action
//!
//! ```rust,ignore
//! use coalescing_scheduler::core::CoalescingScheduler;
//! use std::time::Duration;
//!
//! let scheduler = CoalescingScheduler::<u64>::new();
//! scheduler.set_action(|ids: Vec<u64>| {
//!     repository.mark_delivered(&ids)?;
//!     Ok(())
//! });
//! scheduler.subscribe(|err| tracing::error!(%err, "delivery batch failed"));
//!
//! scheduler.push(42);
//! scheduler.flush(Duration::from_secs(5))?;
//! ```
//!
//! Configuration-driven construction (mailbox backend, spawner, fault policy) is
//! available through [`builders::SchedulerBuilder`] and [`config::SchedulerConfig`].
//!
//! For complete examples, see:
//! - `tests/coalescing_test.rs` - Concurrency scenarios and guarantees
//! - `tests/worker_pool_test.rs` - Shared worker pools and fault handling

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling abstractions: mailbox, gatekeeper, executor, error channel.
pub mod core;
/// Configuration models for schedulers and their backends.
pub mod config;
/// Builders to construct schedulers from configuration.
pub mod builders;
/// Infrastructure adapters for mailbox backends.
pub mod infra;
/// Runtime adapters: thread, worker pool and tokio spawners.
pub mod runtime;
/// Shared utilities.
pub mod util;

pub use crate::core::{BatchAction, CoalescingScheduler, RunState, SchedulerError};
