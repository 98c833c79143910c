//! Action-dispatch store.
//!
//! One store owns the counter, todo, user and auth slices. State changes only
//! through [`Store::dispatch`], which runs the pure root reducer in dispatch
//! order and then notifies subscribers. Asynchronous work lives in
//! [`Thunks`], which dispatches the pending / fulfilled / rejected phases of
//! each request.

mod handles;
mod thunks;

pub use handles::{CounterHandle, TodosHandle, UsersHandle};
pub use thunks::Thunks;

use crate::model::{StatusUpdate, Todo, User};
use crate::slices::{
    AsyncPhase, AuthAction, AuthState, CounterCommand, CounterState, TodoCommand, TodosState,
    UserCommand, UsersState,
};
use crate::subscription::{Listeners, Subscription};
use log::*;
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};

/// Serializable snapshot of every slice.
///
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RootState {
    pub counter: CounterState,
    pub todos: TodosState,
    pub users: UsersState,
    pub auth: AuthState,
}

/// Specify the todo slice actions.
///
#[derive(Clone, Debug, PartialEq)]
pub enum TodosAction {
    Command(TodoCommand),
    Fetch(AsyncPhase<Vec<Todo>>),
    AddAsync(AsyncPhase<Todo>),
}

/// Specify the user slice actions.
///
#[derive(Clone, Debug, PartialEq)]
pub enum UsersAction {
    Command(UserCommand),
    Fetch(AsyncPhase<Vec<User>>),
    UpdateStatus(AsyncPhase<StatusUpdate>),
}

/// Specify every action the store accepts.
///
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    Counter(CounterCommand),
    Todos(TodosAction),
    Users(UsersAction),
    Auth(AuthAction),
    /// Return every slice to its initial state.
    Reset,
}

impl Action {
    /// Return the action type as `slice/name[/stage]`.
    ///
    pub fn kind(&self) -> String {
        match self {
            Action::Counter(command) => format!("counter/{}", variant_name(command)),
            Action::Todos(TodosAction::Command(command)) => {
                format!("todos/{}", variant_name(command))
            }
            Action::Todos(TodosAction::Fetch(phase)) => format!("todos/fetch/{}", phase.stage()),
            Action::Todos(TodosAction::AddAsync(phase)) => {
                format!("todos/addAsync/{}", phase.stage())
            }
            Action::Users(UsersAction::Command(command)) => {
                format!("users/{}", variant_name(command))
            }
            Action::Users(UsersAction::Fetch(phase)) => format!("users/fetch/{}", phase.stage()),
            Action::Users(UsersAction::UpdateStatus(phase)) => {
                format!("users/updateStatus/{}", phase.stage())
            }
            Action::Auth(AuthAction::Login(phase)) => format!("auth/login/{}", phase.stage()),
            Action::Auth(AuthAction::Restore(phase)) => format!("auth/restore/{}", phase.stage()),
            Action::Auth(action) => format!("auth/{}", variant_name(action)),
            Action::Reset => "root/reset".to_string(),
        }
    }
}

fn variant_name(value: &impl std::fmt::Debug) -> String {
    let debug = format!("{:?}", value);
    debug
        .split(|c: char| !c.is_alphanumeric())
        .next()
        .unwrap_or_default()
        .to_string()
}

/// The root reducer.
///
pub fn reduce(state: &mut RootState, action: Action) {
    match action {
        Action::Counter(command) => state.counter.apply(command),
        Action::Todos(action) => reduce_todos(&mut state.todos, action),
        Action::Users(action) => reduce_users(&mut state.users, action),
        Action::Auth(action) => state.auth.apply(action),
        Action::Reset => *state = RootState::default(),
    }
}

fn reduce_todos(state: &mut TodosState, action: TodosAction) {
    match action {
        TodosAction::Command(command) => state.apply(command),
        TodosAction::Fetch(phase) => {
            if let Some(todos) = state.load.resolve(phase) {
                state.replace(todos);
            }
        }
        TodosAction::AddAsync(phase) => {
            if let Some(todo) = state.load.resolve(phase) {
                state.push(todo);
            }
        }
    }
}

fn reduce_users(state: &mut UsersState, action: UsersAction) {
    match action {
        UsersAction::Command(command) => state.apply(command),
        UsersAction::Fetch(phase) => {
            if let Some(users) = state.load.resolve(phase) {
                state.replace(users);
            }
        }
        UsersAction::UpdateStatus(phase) => {
            if let Some(update) = state.load.resolve(phase) {
                state.apply_status(update);
            }
        }
    }
}

struct Inner {
    state: Mutex<RootState>,
    listeners: Listeners<RootState>,
}

/// Houses the root state. Clones are handles to the same store.
///
#[derive(Clone)]
pub struct Store {
    inner: Arc<Inner>,
}

impl Default for Store {
    fn default() -> Self {
        Store::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Store::with_state(RootState::default())
    }

    pub fn with_state(state: RootState) -> Self {
        Store {
            inner: Arc::new(Inner {
                state: Mutex::new(state),
                listeners: Listeners::new(),
            }),
        }
    }

    /// Return a snapshot of the current state.
    ///
    pub fn state(&self) -> RootState {
        self.lock().clone()
    }

    /// Read a value derived from the current state without cloning it.
    ///
    pub fn select<T>(&self, selector: impl FnOnce(&RootState) -> T) -> T {
        selector(&*self.lock())
    }

    /// Apply the action and notify every subscriber with the new and
    /// previous snapshots.
    ///
    pub fn dispatch(&self, action: Action) {
        debug!("Dispatching '{}'...", action.kind());
        trace!("Action payload: {:?}", action);
        let (next, previous) = {
            let mut state = self.lock();
            let previous = state.clone();
            reduce(&mut state, action);
            (state.clone(), previous)
        };
        self.inner.listeners.notify(&next, &previous);
    }

    pub fn subscribe(
        &self,
        listener: impl Fn(&RootState, &RootState) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.listeners.add(listener)
    }

    pub fn counter(&self) -> CounterHandle {
        CounterHandle::new(self.clone())
    }

    pub fn todos(&self) -> TodosHandle {
        TodosHandle::new(self.clone())
    }

    pub fn users(&self) -> UsersHandle {
        UsersHandle::new(self.clone())
    }

    /// Drop every subscriber and return the state to its initial value.
    ///
    pub fn teardown(&self) {
        self.inner.listeners.clear();
        *self.lock() = RootState::default();
        debug!("Store torn down.");
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.listeners.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RootState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TodoFilter;
    use crate::slices::RequestId;
    use fake::{Fake, Faker};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn counter_actions_apply_in_order() {
        let store = Store::new();
        store.dispatch(Action::Counter(CounterCommand::Increment));
        store.dispatch(Action::Counter(CounterCommand::Increment));
        store.dispatch(Action::Counter(CounterCommand::AddAmount(5)));
        store.dispatch(Action::Counter(CounterCommand::Reset));
        let counter = store.state().counter;
        assert_eq!(counter.value, 0);
        assert_eq!(counter.history, vec![0, 1, 2, 7]);
    }

    #[test]
    fn fetch_lifecycle_replaces_list() {
        let store = Store::new();
        store.dispatch(Action::Todos(TodosAction::Command(TodoCommand::add("local"))));
        let id = RequestId::next();
        store.dispatch(Action::Todos(TodosAction::Fetch(AsyncPhase::Pending(id))));
        assert!(store.select(|s| s.todos.load.loading()));
        let fetched: Vec<Todo> = vec![Faker.fake(), Faker.fake()];
        store.dispatch(Action::Todos(TodosAction::Fetch(AsyncPhase::Fulfilled(
            id,
            fetched.clone(),
        ))));
        let todos = store.state().todos;
        assert!(!todos.load.loading());
        assert_eq!(todos.items.len(), 2);
        assert_eq!(*todos.items[0], fetched[0]);
    }

    #[test]
    fn rejected_fetch_keeps_list_and_stores_error() {
        let store = Store::new();
        store.dispatch(Action::Todos(TodosAction::Command(TodoCommand::add("local"))));
        let id = RequestId::next();
        store.dispatch(Action::Todos(TodosAction::Fetch(AsyncPhase::Pending(id))));
        store.dispatch(Action::Todos(TodosAction::Fetch(AsyncPhase::Rejected(
            id,
            "Failed to fetch todos".to_string(),
        ))));
        let todos = store.state().todos;
        assert_eq!(todos.items.len(), 1);
        assert_eq!(todos.load.error.as_deref(), Some("Failed to fetch todos"));
        store.dispatch(Action::Todos(TodosAction::Command(TodoCommand::ClearError)));
        assert!(store.state().todos.load.error.is_none());
    }

    #[test]
    fn subscribers_see_next_and_previous() {
        let store = Store::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let subscription = store.subscribe(move |next, previous| {
            assert_eq!(next.counter.value, previous.counter.value + 1);
            seen.fetch_add(1, Ordering::SeqCst);
        });
        store.dispatch(Action::Counter(CounterCommand::Increment));
        subscription.unsubscribe();
        store.dispatch(Action::Counter(CounterCommand::Increment));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn action_kinds() {
        assert_eq!(
            Action::Counter(CounterCommand::AddAmount(2)).kind(),
            "counter/AddAmount"
        );
        assert_eq!(
            Action::Todos(TodosAction::Command(TodoCommand::SetFilter(TodoFilter::Active))).kind(),
            "todos/SetFilter"
        );
        assert_eq!(
            Action::Users(UsersAction::Fetch(AsyncPhase::Pending(RequestId::next()))).kind(),
            "users/fetch/pending"
        );
        assert_eq!(Action::Auth(AuthAction::Logout).kind(), "auth/Logout");
    }

    #[test]
    fn teardown_resets_state_and_subscribers() {
        let store = Store::new();
        let _subscription = store.subscribe(|_, _| {});
        store.dispatch(Action::Counter(CounterCommand::Increment));
        store.teardown();
        assert_eq!(store.state(), RootState::default());
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn reset_action_restores_defaults() {
        let store = Store::new();
        store.dispatch(Action::Counter(CounterCommand::AddAmount(3)));
        store.dispatch(Action::Reset);
        assert_eq!(store.state().counter, CounterState::default());
    }

    #[test]
    fn snapshot_serializes() {
        let store = Store::new();
        store.dispatch(Action::Todos(TodosAction::Command(TodoCommand::add("A"))));
        let json = serde_json::to_value(store.state()).unwrap();
        assert_eq!(json["todos"]["items"][0]["text"], "A");
        assert_eq!(json["auth"]["isAuthenticated"], false);
    }
}
