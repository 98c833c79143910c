use crate::api::{ApiError, CancelToken, Inflight};
use crate::model::{TodoFilter, UserSort};
use crate::slices::{AsyncPhase, Outcome, Slice, TodoStats};
use crate::storage::{KvStorage, StorageError};
use crate::subscription::{Listeners, Subscription};
use log::*;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

/// Equality used by selector subscriptions.
///
/// Shared collections compare by reference, so an untouched list never
/// wakes its subscribers. Plain values compare by value.
///
pub trait Shallow {
    fn same(&self, other: &Self) -> bool;
}

impl<T: ?Sized> Shallow for Arc<T> {
    fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

impl<T: Shallow> Shallow for Option<T> {
    fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.same(b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<A: Shallow, B: Shallow> Shallow for (A, B) {
    fn same(&self, other: &Self) -> bool {
        self.0.same(&other.0) && self.1.same(&other.1)
    }
}

macro_rules! shallow_by_value {
    ($($ty:ty),*) => {
        $(impl Shallow for $ty {
            fn same(&self, other: &Self) -> bool {
                self == other
            }
        })*
    };
}

shallow_by_value!(bool, i64, u64, usize, String, TodoFilter, UserSort, TodoStats);

struct Persist {
    storage: Arc<dyn KvStorage>,
    key: String,
    writes: tokio::sync::Mutex<()>,
}

struct Inner<S> {
    name: String,
    state: Mutex<S>,
    listeners: Listeners<S>,
    persist: Option<Persist>,
}

/// A self-contained store for one slice.
///
/// Updates run a recipe against a copy-on-write draft. Subscribers are
/// notified only when the recipe actually changed the state. A persisted
/// store writes the whole slice under its key after each change. Clones are
/// handles to the same store.
///
pub struct Store<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for Store<S> {
    fn clone(&self) -> Self {
        Store {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Slice> Store<S> {
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Return a snapshot of the current state.
    ///
    pub fn get(&self) -> S {
        self.lock().clone()
    }

    /// Read a value derived from the current state without cloning it.
    ///
    pub fn read<T>(&self, selector: impl FnOnce(&S) -> T) -> T {
        selector(&*self.lock())
    }

    /// Apply `recipe` in memory and notify subscribers if anything changed.
    /// Nothing is written to storage.
    ///
    pub fn update(&self, recipe: impl FnOnce(&mut S)) -> bool {
        let changed = {
            let mut state = self.lock();
            let previous = state.clone();
            recipe(&mut *state);
            if *state == previous {
                None
            } else {
                Some((state.clone(), previous))
            }
        };
        match changed {
            Some((next, previous)) => {
                trace!("Store '{}' changed.", self.inner.name);
                self.inner.listeners.notify(&next, &previous);
                true
            }
            None => false,
        }
    }

    /// Apply `recipe`, notify subscribers and wait for the change to be
    /// persisted.
    ///
    pub async fn set<F>(&self, recipe: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut S) + Send,
    {
        if self.update(recipe) {
            self.persist().await?;
        }
        Ok(())
    }

    /// Like [`Store::set`], but a persistence failure is recorded in the
    /// slice's error field instead of being returned.
    ///
    pub async fn commit<F>(&self, recipe: F)
    where
        F: FnOnce(&mut S) + Send,
    {
        if let Err(e) = self.set(recipe).await {
            warn!("Store '{}' could not persist: {}", self.inner.name, e);
            self.update(|state| state.record_error(e.to_string()));
        }
    }

    /// Write the current state to storage. A store without persistence
    /// does nothing.
    ///
    pub async fn persist(&self) -> Result<(), StorageError> {
        let persist = match &self.inner.persist {
            Some(persist) => persist,
            None => return Ok(()),
        };
        let _write = persist.writes.lock().await;
        let json = serde_json::to_string(&self.get())
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        debug!("Persisting store '{}' under '{}'.", self.inner.name, persist.key);
        persist.storage.set_item(&persist.key, &json).await
    }

    pub fn subscribe(
        &self,
        listener: impl Fn(&S, &S) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.listeners.add(listener)
    }

    /// Call `listener` with the new and previous selected values whenever the
    /// selection changes according to [`Shallow`].
    ///
    pub fn subscribe_with_selector<T>(
        &self,
        selector: impl Fn(&S) -> T + Send + Sync + 'static,
        listener: impl Fn(&T, &T) + Send + Sync + 'static,
    ) -> Subscription
    where
        T: Shallow + 'static,
    {
        self.inner.listeners.add(move |next, previous| {
            let (next, previous) = (selector(next), selector(previous));
            if !next.same(&previous) {
                listener(&next, &previous);
            }
        })
    }

    /// Run one backend request through the slice's load lifecycle.
    ///
    /// `reduce` receives the pending phase first and the settling phase
    /// last. The settled state is persisted.
    ///
    pub async fn request<T, F, Fut>(
        &self,
        inflight: &Inflight,
        key: String,
        cancel: &CancelToken,
        reduce: impl Fn(&mut S, AsyncPhase<T>) + Send + Sync,
        call: F,
    ) -> Outcome<T>
    where
        T: Clone + Send,
        F: FnOnce(CancelToken) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let request = inflight.start(key);
        let id = request.id;
        self.update(|state| reduce(state, AsyncPhase::Pending(id)));
        let response = call(request.token());
        let phase = inflight.settle(request, cancel, response).await;
        let outcome = Outcome::from_phase(&phase);
        self.commit(|state| reduce(state, phase)).await;
        outcome
    }

    /// Drop every subscriber. The state stays readable.
    ///
    pub fn destroy(&self) {
        self.inner.listeners.clear();
        debug!("Store '{}' destroyed.", self.inner.name);
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.listeners.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, S> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Builds a [`Store`], optionally backed by persistent storage.
///
pub struct StoreBuilder<S> {
    name: String,
    initial: S,
    persist: Option<(Arc<dyn KvStorage>, String)>,
}

impl<S: Slice> StoreBuilder<S> {
    pub fn new(name: impl Into<String>) -> Self {
        StoreBuilder {
            name: name.into(),
            initial: S::default(),
            persist: None,
        }
    }

    /// Start from `state` instead of the default.
    ///
    pub fn initial(mut self, state: S) -> Self {
        self.initial = state;
        self
    }

    pub fn persist(mut self, storage: Arc<dyn KvStorage>, key: impl Into<String>) -> Self {
        self.persist = Some((storage, key.into()));
        self
    }

    /// Build the store, rehydrating from storage when a saved blob exists.
    ///
    /// A blob that no longer parses is ignored and the store starts from the
    /// initial state. A failing read is returned as an error.
    ///
    pub async fn build(self) -> Result<Store<S>, StorageError> {
        let mut state = self.initial;
        let persist = match self.persist {
            Some((storage, key)) => {
                if let Some(raw) = storage.get_item(&key).await? {
                    match serde_json::from_str::<S>(&raw) {
                        Ok(saved) => {
                            info!("Rehydrated store '{}' from '{}'.", self.name, key);
                            state = saved;
                        }
                        Err(e) => {
                            let error = StorageError::Deserialization {
                                key: key.clone(),
                                message: e.to_string(),
                            };
                            warn!("{}; starting from defaults.", error);
                        }
                    }
                }
                Some(Persist {
                    storage,
                    key,
                    writes: tokio::sync::Mutex::new(()),
                })
            }
            None => None,
        };
        Ok(Store {
            inner: Arc::new(Inner {
                name: self.name,
                state: Mutex::new(state),
                listeners: Listeners::new(),
                persist,
            }),
        })
    }
}
