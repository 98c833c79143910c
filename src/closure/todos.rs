use super::{Store, StoreBuilder};
use crate::api::{CancelToken, Inflight, MockApi};
use crate::container::{Container, SnapshotListener};
use crate::model::{id, Priority, Todo, TodoFilter};
use crate::slices::{AsyncPhase, Outcome, TodoCommand, TodoStats, TodosState};
use crate::storage::{KvStorage, StorageError, TODO_KEY};
use crate::subscription::Subscription;
use async_trait::async_trait;
use log::*;
use std::sync::Arc;

/// Persisted todo list with a filter and backend operations.
///
#[derive(Clone)]
pub struct TodoStore {
    store: Store<TodosState>,
    api: MockApi,
    inflight: Inflight,
}

impl TodoStore {
    pub async fn create(storage: Arc<dyn KvStorage>, api: MockApi) -> Result<Self, StorageError> {
        let store = StoreBuilder::new("todos")
            .persist(storage, TODO_KEY)
            .build()
            .await?;
        Ok(TodoStore {
            store,
            api,
            inflight: Inflight::new(),
        })
    }

    pub fn store(&self) -> &Store<TodosState> {
        &self.store
    }

    pub fn todos(&self) -> Arc<Vec<Arc<Todo>>> {
        self.store.read(|s| Arc::clone(&s.items))
    }

    pub fn filter(&self) -> TodoFilter {
        self.store.read(|s| s.filter)
    }

    pub fn filtered_todos(&self) -> Vec<Arc<Todo>> {
        self.store.read(TodosState::filtered)
    }

    pub fn stats(&self) -> TodoStats {
        self.store.read(TodosState::stats)
    }

    pub fn todos_by_priority(&self) -> Vec<Arc<Todo>> {
        self.store.read(TodosState::by_priority)
    }

    pub fn loading(&self) -> bool {
        self.store.read(|s| s.load.loading())
    }

    pub fn error(&self) -> Option<String> {
        self.store.read(|s| s.load.error.clone())
    }

    /// Add a medium-priority todo.
    ///
    pub async fn add_todo(&self, text: &str) {
        self.apply(TodoCommand::add(text)).await
    }

    pub async fn add_todo_with_priority(&self, text: &str, priority: Priority) {
        self.apply(TodoCommand::add_with_priority(text, priority)).await
    }

    pub async fn toggle_todo(&self, id: &str) {
        self.apply(TodoCommand::Toggle { id: id.to_string() }).await
    }

    pub async fn delete_todo(&self, id: &str) {
        self.apply(TodoCommand::Remove { id: id.to_string() }).await
    }

    pub async fn edit_todo(&self, id: &str, text: &str) {
        self.apply(TodoCommand::Edit {
            id: id.to_string(),
            text: text.to_string(),
        })
        .await
    }

    pub async fn set_priority(&self, id: &str, priority: Priority) {
        self.apply(TodoCommand::SetPriority {
            id: id.to_string(),
            priority,
        })
        .await
    }

    pub async fn clear_completed(&self) {
        self.apply(TodoCommand::ClearCompleted).await
    }

    pub async fn mark_all_completed(&self) {
        self.apply(TodoCommand::MarkAllCompleted).await
    }

    pub async fn set_filter(&self, filter: TodoFilter) {
        self.apply(TodoCommand::SetFilter(filter)).await
    }

    pub async fn clear_error(&self) {
        self.apply(TodoCommand::ClearError).await
    }

    /// Replace the list with the backend's todos.
    ///
    pub async fn fetch_todos(&self, cancel: &CancelToken) -> Outcome<Vec<Todo>> {
        info!("Fetching todos...");
        let api = self.api.clone();
        self.store
            .request(
                &self.inflight,
                "todos/fetch".to_string(),
                cancel,
                |state, phase: AsyncPhase<Vec<Todo>>| {
                    if let Some(todos) = state.load.resolve(phase) {
                        state.replace(todos);
                    }
                },
                move |token| async move { api.fetch_todos(&token).await },
            )
            .await
    }

    /// Append one todo created by the backend.
    ///
    pub async fn add_todo_async(
        &self,
        text: &str,
        priority: Priority,
        cancel: &CancelToken,
    ) -> Outcome<Todo> {
        info!("Adding todo '{}' through the backend...", text);
        let api = self.api.clone();
        let text = text.to_string();
        self.store
            .request(
                &self.inflight,
                format!("todos/addAsync/{}", id::next_id()),
                cancel,
                |state, phase: AsyncPhase<Todo>| {
                    if let Some(todo) = state.load.resolve(phase) {
                        state.push(todo);
                    }
                },
                move |token| async move { api.create_todo(&text, priority, &token).await },
            )
            .await
    }

    /// Call `listener` only when the item list itself changes.
    ///
    pub fn subscribe_todos(
        &self,
        listener: impl Fn(&Arc<Vec<Arc<Todo>>>) + Send + Sync + 'static,
    ) -> Subscription {
        self.store
            .subscribe_with_selector(|s| Arc::clone(&s.items), move |next, _| listener(next))
    }

    pub fn cancel_all(&self) {
        self.inflight.cancel_all();
    }

    async fn apply(&self, command: TodoCommand) {
        self.store.commit(move |s| s.apply(command)).await
    }
}

#[async_trait]
impl Container for TodoStore {
    type Snapshot = TodosState;
    type Command = TodoCommand;

    fn snapshot(&self) -> TodosState {
        self.store.get()
    }

    async fn dispatch(&self, command: TodoCommand) {
        self.apply(command).await
    }

    fn subscribe(&self, listener: SnapshotListener<TodosState>) -> Subscription {
        self.store.subscribe(move |next, _| listener(next))
    }
}
