//! Auth state listeners.
//!
//! Typed publish/subscribe for session transitions. Listeners run
//! synchronously on the notifying thread; a panicking listener is logged and
//! skipped so the others still run.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::warn;

use crate::client::ClientError;

// == Events ==
/// Session transition delivered to listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    LoggedIn,
    Refreshed,
    LoggedOut,
    /// The session ended without the user asking; log in again
    SessionExpired(ClientError),
}

type Listener = Arc<dyn Fn(&AuthEvent) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<(u64, Listener)>,
}

// == Listener Registry ==
/// Listener registry. Clones share the same set of listeners.
#[derive(Clone, Default)]
pub struct Listeners {
    registry: Arc<Mutex<Registry>>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` until the returned [`Subscription`] is dropped.
    ///
    /// # Arguments
    /// * `listener` - Callback run synchronously for every event
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&AuthEvent) + Send + Sync + 'static,
    {
        let listener: Listener = Arc::new(listener);
        let mut registry = self.lock();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.listeners.push((id, listener));

        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Notifies every listener, in subscription order.
    pub fn emit(&self, event: &AuthEvent) {
        // Snapshot so listeners may subscribe/unsubscribe while being notified
        let listeners: Vec<Listener> = self
            .lock()
            .listeners
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            if panic::catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                warn!(?event, "auth listener panicked");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.lock().listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle returned by [`Listeners::subscribe`].
#[must_use = "dropping a Subscription unsubscribes its listener"]
// == Subscription ==
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    /// Removes the listener now.
    pub fn unsubscribe(self) {}

    /// Keeps the listener registered for the registry's whole lifetime.
    pub fn detach(mut self) {
        self.registry = Weak::new();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            let mut registry = registry.lock().unwrap_or_else(PoisonError::into_inner);
            registry.listeners.retain(|(id, _)| *id != self.id);
        }
    }
}
