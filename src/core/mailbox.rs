//! Mailbox abstraction: the unordered buffer producers push into.

/// Abstraction for mailbox backends.
///
/// A mailbox is a concurrent multiset. `push` must never wait on the scheduler's
/// decision lock and `drain_all` must hand every returned item to exactly one caller.
pub trait Mailbox<T>: Send + Sync {
    /// Add an item; it becomes visible to the next drain.
    fn push(&self, item: T);

    /// Atomically remove and return every item present at the instant of the call.
    ///
    /// Items pushed concurrently may land in this drain or a later one, never both.
    fn drain_all(&self) -> Vec<T>;

    /// Number of queued items. Advisory only under concurrent pushes.
    fn len(&self) -> usize;

    /// Whether the mailbox currently holds no items.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
