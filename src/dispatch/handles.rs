//! Per-slice views of the dispatch store.

use super::{Action, RootState, Store, TodosAction, UsersAction};
use crate::container::{Container, SnapshotListener};
use crate::slices::{
    CounterCommand, CounterState, TodoCommand, TodosState, UserCommand, UsersState,
};
use crate::subscription::Subscription;
use async_trait::async_trait;

/// Subscribe to one slice of the root state. The listener only runs when
/// that slice differs from the previous snapshot.
///
fn subscribe_slice<S>(
    store: &Store,
    select: fn(&RootState) -> &S,
    listener: SnapshotListener<S>,
) -> Subscription
where
    S: PartialEq + 'static,
{
    store.subscribe(move |next, previous| {
        let slice = select(next);
        if slice != select(previous) {
            listener(slice);
        }
    })
}

/// Counter slice of a [`Store`].
///
#[derive(Clone)]
pub struct CounterHandle {
    store: Store,
}

impl CounterHandle {
    pub(super) fn new(store: Store) -> Self {
        CounterHandle { store }
    }
}

#[async_trait]
impl Container for CounterHandle {
    type Snapshot = CounterState;
    type Command = CounterCommand;

    fn snapshot(&self) -> CounterState {
        self.store.select(|s| s.counter.clone())
    }

    async fn dispatch(&self, command: CounterCommand) {
        self.store.dispatch(Action::Counter(command));
    }

    fn subscribe(&self, listener: SnapshotListener<CounterState>) -> Subscription {
        subscribe_slice(&self.store, |s| &s.counter, listener)
    }
}

/// Todo slice of a [`Store`].
///
#[derive(Clone)]
pub struct TodosHandle {
    store: Store,
}

impl TodosHandle {
    pub(super) fn new(store: Store) -> Self {
        TodosHandle { store }
    }
}

#[async_trait]
impl Container for TodosHandle {
    type Snapshot = TodosState;
    type Command = TodoCommand;

    fn snapshot(&self) -> TodosState {
        self.store.select(|s| s.todos.clone())
    }

    async fn dispatch(&self, command: TodoCommand) {
        self.store.dispatch(Action::Todos(TodosAction::Command(command)));
    }

    fn subscribe(&self, listener: SnapshotListener<TodosState>) -> Subscription {
        subscribe_slice(&self.store, |s| &s.todos, listener)
    }
}

/// User slice of a [`Store`].
///
#[derive(Clone)]
pub struct UsersHandle {
    store: Store,
}

impl UsersHandle {
    pub(super) fn new(store: Store) -> Self {
        UsersHandle { store }
    }
}

#[async_trait]
impl Container for UsersHandle {
    type Snapshot = UsersState;
    type Command = UserCommand;

    fn snapshot(&self) -> UsersState {
        self.store.select(|s| s.users.clone())
    }

    async fn dispatch(&self, command: UserCommand) {
        self.store.dispatch(Action::Users(UsersAction::Command(command)));
    }

    fn subscribe(&self, listener: SnapshotListener<UsersState>) -> Subscription {
        subscribe_slice(&self.store, |s| &s.users, listener)
    }
}
