//! Builders to construct schedulers from configuration.

pub mod scheduler_builder;

pub use scheduler_builder::{build_mailbox, build_scheduler, build_spawner, SchedulerBuilder};
