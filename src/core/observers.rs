//! Error channel: fan-out of handled errors to registered observers.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use uuid::Uuid;

use super::SchedulerError;

/// Callback invoked with every error the scheduler handles.
pub type ErrorObserver = Arc<dyn Fn(&SchedulerError) + Send + Sync>;

/// Handle returned by `subscribe`, used to remove the observer again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Ordered collection of error observers.
///
/// Observers are called synchronously, in registration order, on the thread that
/// publishes. The list is snapshotted before delivery, so an observer may
/// subscribe or unsubscribe from inside its own callback.
#[derive(Default)]
pub struct ErrorChannel {
    observers: RwLock<Vec<(SubscriptionId, ErrorObserver)>>,
}

impl ErrorChannel {
    /// Create an empty channel.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer at the end of the delivery order.
    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&SchedulerError) + Send + Sync + 'static,
    {
        let id = SubscriptionId(Uuid::new_v4());
        self.observers.write().push((id, Arc::new(observer)));
        id
    }

    /// Remove an observer. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    /// Number of registered observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.read().len()
    }

    /// Whether no observers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.read().is_empty()
    }

    /// Deliver `error` to every registered observer. Returns how many were called.
    ///
    /// Observer panics are not caught here.
    pub fn publish(&self, error: &SchedulerError) -> usize {
        let snapshot: Vec<ErrorObserver> = self
            .observers
            .read()
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();
        for observer in &snapshot {
            observer(error);
        }
        snapshot.len()
    }
}

impl fmt::Debug for ErrorChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorChannel")
            .field("observers", &self.len())
            .finish()
    }
}
