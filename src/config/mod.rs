//! Configuration models for schedulers, mailboxes and spawners.

pub mod scheduler;

pub use scheduler::{MailboxBackendConfig, SchedulerConfig, SpawnerConfig};
