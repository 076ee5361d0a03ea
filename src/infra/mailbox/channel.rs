//! Lock-free mailbox backend on a crossbeam channel.

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::core::Mailbox;

/// Mailbox backed by an unbounded `crossbeam_channel`.
///
/// Pushes never take a lock. A drain takes at most the number of items present
/// when it starts, so a steady stream of producers cannot keep one drain going
/// forever; the remainder goes to the next run.
pub struct ChannelMailbox<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
}

impl<T> ChannelMailbox<T> {
    /// Create an empty mailbox.
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }
}

impl<T> Default for ChannelMailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send> Mailbox<T> for ChannelMailbox<T> {
    fn push(&self, item: T) {
        // Only fails once every receiver is gone, and we own one.
        let _ = self.tx.send(item);
    }

    fn drain_all(&self) -> Vec<T> {
        let present = self.rx.len();
        self.rx.try_iter().take(present).collect()
    }

    fn len(&self) -> usize {
        self.rx.len()
    }
}
