use super::{Store, StoreBuilder};
use crate::container::{Container, SnapshotListener};
use crate::slices::{CounterCommand, CounterState};
use crate::storage::{KvStorage, StorageError, COUNTER_KEY};
use crate::subscription::Subscription;
use async_trait::async_trait;
use std::sync::Arc;

/// Persisted counter with its value history.
///
#[derive(Clone)]
pub struct CounterStore {
    store: Store<CounterState>,
}

impl CounterStore {
    pub async fn create(storage: Arc<dyn KvStorage>) -> Result<Self, StorageError> {
        let store = StoreBuilder::new("counter")
            .persist(storage, COUNTER_KEY)
            .build()
            .await?;
        Ok(CounterStore { store })
    }

    pub fn store(&self) -> &Store<CounterState> {
        &self.store
    }

    pub fn value(&self) -> i64 {
        self.store.read(|s| s.value)
    }

    pub fn history(&self) -> Vec<i64> {
        self.store.read(|s| s.history.clone())
    }

    pub fn error(&self) -> Option<String> {
        self.store.read(|s| s.error.clone())
    }

    pub async fn increment(&self) {
        self.apply(CounterCommand::Increment).await
    }

    pub async fn decrement(&self) {
        self.apply(CounterCommand::Decrement).await
    }

    pub async fn add_amount(&self, amount: i64) {
        self.apply(CounterCommand::AddAmount(amount)).await
    }

    pub async fn reset(&self) {
        self.apply(CounterCommand::Reset).await
    }

    pub async fn clear_history(&self) {
        self.apply(CounterCommand::ClearHistory).await
    }

    pub async fn clear_error(&self) {
        self.apply(CounterCommand::ClearError).await
    }

    async fn apply(&self, command: CounterCommand) {
        self.store.commit(move |s| s.apply(command)).await
    }
}

#[async_trait]
impl Container for CounterStore {
    type Snapshot = CounterState;
    type Command = CounterCommand;

    fn snapshot(&self) -> CounterState {
        self.store.get()
    }

    async fn dispatch(&self, command: CounterCommand) {
        self.apply(command).await
    }

    fn subscribe(&self, listener: SnapshotListener<CounterState>) -> Subscription {
        self.store.subscribe(move |next, _| listener(next))
    }
}
