//! Mailbox backends.

pub mod channel;
pub mod locked;

pub use channel::ChannelMailbox;
pub use locked::LockedMailbox;
