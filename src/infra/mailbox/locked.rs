//! Mutex-guarded mailbox backend.

use parking_lot::Mutex;

use crate::core::Mailbox;

/// Mailbox backed by a `Vec` behind a `parking_lot::Mutex`.
///
/// A drain swaps the buffer for an empty one under the lock, so the critical
/// section is constant time regardless of how many items queued up.
pub struct LockedMailbox<T> {
    items: Mutex<Vec<T>>,
}

impl<T> LockedMailbox<T> {
    /// Create an empty mailbox.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
        }
    }

    /// Create an empty mailbox with room for `capacity` items.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Mutex::new(Vec::with_capacity(capacity)),
        }
    }
}

impl<T> Default for LockedMailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send> Mailbox<T> for LockedMailbox<T> {
    fn push(&self, item: T) {
        self.items.lock().push(item);
    }

    fn drain_all(&self) -> Vec<T> {
        std::mem::take(&mut *self.items.lock())
    }

    fn len(&self) -> usize {
        self.items.lock().len()
    }
}
