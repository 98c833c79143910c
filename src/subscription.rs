//! Change listeners shared by both container families.

use std::sync::{Arc, Mutex, PoisonError, Weak};

type Listener<S> = Arc<dyn Fn(&S, &S) + Send + Sync>;

struct Registry<S> {
    next_id: u64,
    entries: Vec<(u64, Listener<S>)>,
}

/// A set of listeners called with `(next, previous)` after each change.
///
/// Listeners are called outside the registry lock, so a listener may
/// subscribe, unsubscribe or read the container that notified it.
///
pub struct Listeners<S> {
    registry: Arc<Mutex<Registry<S>>>,
}

impl<S: 'static> Default for Listeners<S> {
    fn default() -> Self {
        Listeners {
            registry: Arc::new(Mutex::new(Registry {
                next_id: 0,
                entries: vec![],
            })),
        }
    }
}

impl<S: 'static> Listeners<S> {
    pub fn new() -> Self {
        Listeners::default()
    }

    /// Register a listener. It stays registered until the returned
    /// subscription is unsubscribed or the listeners are cleared.
    ///
    pub fn add(&self, listener: impl Fn(&S, &S) + Send + Sync + 'static) -> Subscription {
        let id = {
            let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
            let id = registry.next_id;
            registry.next_id += 1;
            registry.entries.push((id, Arc::new(listener)));
            id
        };
        let registry: Weak<Mutex<Registry<S>>> = Arc::downgrade(&self.registry);
        Subscription {
            remove: Some(Box::new(move || {
                if let Some(registry) = registry.upgrade() {
                    registry
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .entries
                        .retain(|(entry, _)| *entry != id);
                }
            })),
        }
    }

    pub fn notify(&self, next: &S, previous: &S) {
        let listeners: Vec<Listener<S>> = self
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(next, previous);
        }
    }

    pub fn clear(&self) {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .clear();
    }

    pub fn len(&self) -> usize {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle returned by every `subscribe` call.
///
/// Dropping the handle does not unsubscribe; call [`Subscription::unsubscribe`].
///
#[must_use = "keep the subscription to be able to unsubscribe"]
pub struct Subscription {
    remove: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}
