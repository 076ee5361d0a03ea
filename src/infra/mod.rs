//! Infrastructure adapters: mailbox backends.

pub mod mailbox;

pub use mailbox::{ChannelMailbox, LockedMailbox};
