//! Tests for mailbox implementations

use coalescing_scheduler::builders::build_mailbox;
use coalescing_scheduler::config::MailboxBackendConfig;
use coalescing_scheduler::core::Mailbox;
use coalescing_scheduler::infra::mailbox::{ChannelMailbox, LockedMailbox};

fn exercise(mailbox: &dyn Mailbox<String>) {
    assert!(mailbox.is_empty());
    assert!(mailbox.drain_all().is_empty());

    mailbox.push("a".to_string());
    mailbox.push("b".to_string());
    mailbox.push("a".to_string());
    assert_eq!(mailbox.len(), 3);

    let mut drained = mailbox.drain_all();
    drained.sort();
    assert_eq!(drained, vec!["a", "a", "b"]);
    assert!(mailbox.is_empty());
}

#[test]
fn test_locked_mailbox_keeps_duplicates() {
    exercise(&LockedMailbox::<String>::new());
    exercise(&LockedMailbox::<String>::with_capacity(8));
}

#[test]
fn test_channel_mailbox_keeps_duplicates() {
    exercise(&ChannelMailbox::<String>::new());
}

#[test]
fn test_build_mailbox_for_each_backend() {
    for backend in [MailboxBackendConfig::Locked, MailboxBackendConfig::Channel] {
        let mailbox = build_mailbox::<String>(backend);
        exercise(mailbox.as_ref());
    }
}

#[test]
fn test_push_after_drain_lands_in_next_snapshot() {
    let mailbox = LockedMailbox::new();
    mailbox.push(1_u32);
    assert_eq!(mailbox.drain_all(), vec![1]);

    mailbox.push(2);
    assert_eq!(mailbox.drain_all(), vec![2]);
}
