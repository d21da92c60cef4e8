//! Typed publish/subscribe.
//!
//! [`EventBus`] maps a key (frame kind, notification subtype) to an ordered
//! list of handlers. Subscribing returns a [`Subscription`]; dropping or
//! cancelling it removes exactly that registration, so two consumers that
//! register the same closure can never remove each other's handler.
//!
//! # Dispatch
//!
//! - Handlers for a key run in registration order.
//! - The handler list is snapshotted before delivery and the lock released, so
//!   handlers may subscribe or unsubscribe (including themselves) mid-dispatch.
//!   Changes take effect from the next event.
//! - A handler returning [`HandlerError`] is logged; delivery continues with
//!   the next handler.

use std::{
    collections::HashMap,
    fmt,
    hash::Hash,
    sync::{Arc, Weak},
};

use parking_lot::Mutex;

use crate::error::HandlerError;

/// Event handler stored on the bus.
pub type Handler<E> = Arc<dyn Fn(&E) -> Result<(), HandlerError> + Send + Sync>;

struct Registry<K, E> {
    next_id: u64,
    handlers: HashMap<K, Vec<(u64, Handler<E>)>>,
}

impl<K: Eq + Hash, E> Registry<K, E> {
    fn remove(&mut self, key: &K, id: u64) -> bool {
        let Some(list) = self.handlers.get_mut(key) else { return false };
        let before = list.len();
        list.retain(|(handler_id, _)| *handler_id != id);
        let removed = list.len() != before;
        if list.is_empty() {
            self.handlers.remove(key);
        }
        removed
    }
}

/// Keyed handler registry with ordered delivery.
///
/// Cloning yields another handle to the same registry.
pub struct EventBus<K, E> {
    inner: Arc<Mutex<Registry<K, E>>>,
}

impl<K, E> Clone for EventBus<K, E> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<K, E> Default for EventBus<K, E>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + 'static,
    E: 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, E> fmt::Debug for EventBus<K, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.inner.lock();
        let total: usize = registry.handlers.values().map(Vec::len).sum();
        f.debug_struct("EventBus").field("handlers", &total).finish()
    }
}

impl<K, E> EventBus<K, E>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + 'static,
    E: 'static,
{
    /// Create an empty bus.
    pub fn new() -> Self {
        Self { inner: Arc::new(Mutex::new(Registry { next_id: 0, handlers: HashMap::new() })) }
    }

    /// Register `handler` for `key`.
    ///
    /// The handler stays registered until the returned [`Subscription`] is
    /// dropped or cancelled.
    #[must_use = "dropping the subscription unsubscribes the handler"]
    pub fn subscribe<F>(&self, key: K, handler: F) -> Subscription
    where
        F: Fn(&E) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let id = {
            let mut registry = self.inner.lock();
            let id = registry.next_id;
            registry.next_id += 1;
            registry.handlers.entry(key.clone()).or_default().push((id, Arc::new(handler)));
            id
        };

        let registry: Weak<Mutex<Registry<K, E>>> = Arc::downgrade(&self.inner);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(registry) = registry.upgrade() {
                    registry.lock().remove(&key, id);
                }
            })),
        }
    }

    /// Deliver `event` to every handler registered for `key`.
    ///
    /// Returns the number of handlers invoked.
    pub fn dispatch(&self, key: &K, event: &E) -> usize {
        let snapshot: Vec<Handler<E>> = {
            let registry = self.inner.lock();
            match registry.handlers.get(key) {
                Some(list) => list.iter().map(|(_, handler)| Arc::clone(handler)).collect(),
                None => return 0,
            }
        };

        for handler in &snapshot {
            if let Err(error) = handler(event) {
                tracing::warn!(?key, %error, "event handler failed");
            }
        }
        snapshot.len()
    }

    /// Number of handlers registered for `key`.
    pub fn handler_count(&self, key: &K) -> usize {
        self.inner.lock().handlers.get(key).map_or(0, Vec::len)
    }

    /// Total number of registered handlers.
    pub fn len(&self) -> usize {
        self.inner.lock().handlers.values().map(Vec::len).sum()
    }

    /// Whether no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle to one registration on an [`EventBus`].
///
/// Dropping the handle unsubscribes. Use [`Subscription::detach`] to keep the
/// handler registered for the lifetime of the bus.
#[must_use = "dropping the subscription unsubscribes the handler"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Unsubscribe now.
    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    /// Keep the handler registered after this handle goes away.
    pub fn detach(mut self) {
        self.cancel = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("active", &self.cancel.is_some()).finish()
    }
}
