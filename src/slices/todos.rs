use super::load::LoadState;
use super::{patch_where, Slice};
use crate::model::{Priority, Todo, TodoFilter};
use log::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Todo list, active filter and fetch status. Only the list is persisted.
///
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TodosState {
    pub items: Arc<Vec<Arc<Todo>>>,
    #[serde(skip)]
    pub filter: TodoFilter,
    #[serde(skip)]
    pub load: LoadState,
}

/// Counts returned by [`TodosState::stats`].
///
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TodoStats {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
}

/// Specify the todo commands.
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TodoCommand {
    Add(Todo),
    Toggle { id: String },
    Remove { id: String },
    Edit { id: String, text: String },
    SetPriority { id: String, priority: Priority },
    ClearCompleted,
    MarkAllCompleted,
    SetFilter(TodoFilter),
    ClearError,
}

impl TodoCommand {
    /// Add a medium-priority todo.
    ///
    pub fn add(text: impl Into<String>) -> Self {
        TodoCommand::Add(Todo::new(text, Priority::Medium))
    }

    pub fn add_with_priority(text: impl Into<String>, priority: Priority) -> Self {
        TodoCommand::Add(Todo::new(text, priority))
    }
}

impl TodosState {
    /// Apply a command. Commands that change nothing leave `items`
    /// pointer-equal to the previous list.
    ///
    pub fn apply(&mut self, command: TodoCommand) {
        match command {
            TodoCommand::Add(todo) => self.push(todo),
            TodoCommand::Toggle { id } => {
                patch_where(&mut self.items, |t| t.id == id, |t| t.completed = !t.completed);
            }
            TodoCommand::Remove { id } => {
                if self.items.iter().any(|t| t.id == id) {
                    Arc::make_mut(&mut self.items).retain(|t| t.id != id);
                }
            }
            TodoCommand::Edit { id, text } => {
                patch_where(
                    &mut self.items,
                    |t| t.id == id && t.text != text,
                    |t| t.text = text.clone(),
                );
            }
            TodoCommand::SetPriority { id, priority } => {
                patch_where(
                    &mut self.items,
                    |t| t.id == id && t.priority != priority,
                    |t| t.priority = priority,
                );
            }
            TodoCommand::ClearCompleted => {
                if self.items.iter().any(|t| t.completed) {
                    Arc::make_mut(&mut self.items).retain(|t| !t.completed);
                }
            }
            TodoCommand::MarkAllCompleted => {
                if self.items.iter().any(|t| !t.completed) {
                    for todo in Arc::make_mut(&mut self.items).iter_mut() {
                        if !todo.completed {
                            Arc::make_mut(todo).completed = true;
                        }
                    }
                }
            }
            TodoCommand::SetFilter(filter) => self.filter = filter,
            TodoCommand::ClearError => self.load.error = None,
        }
    }

    /// Append a todo unless its id is already present.
    ///
    pub fn push(&mut self, todo: Todo) {
        if self.items.iter().any(|t| t.id == todo.id) {
            warn!("Ignoring todo with duplicate id '{}'.", todo.id);
            return;
        }
        Arc::make_mut(&mut self.items).push(Arc::new(todo));
    }

    /// Replace the whole list.
    ///
    pub fn replace(&mut self, todos: Vec<Todo>) {
        self.items = Arc::new(todos.into_iter().map(Arc::new).collect());
    }

    /// Return the todos visible under the current filter, in list order.
    ///
    pub fn filtered(&self) -> Vec<Arc<Todo>> {
        self.items
            .iter()
            .filter(|t| self.filter.matches(t))
            .cloned()
            .collect()
    }

    pub fn stats(&self) -> TodoStats {
        let total = self.items.len();
        let completed = self.items.iter().filter(|t| t.completed).count();
        TodoStats {
            total,
            active: total - completed,
            completed,
        }
    }

    /// Return all todos, highest priority first. Ties keep list order.
    ///
    pub fn by_priority(&self) -> Vec<Arc<Todo>> {
        let mut todos: Vec<Arc<Todo>> = self.items.iter().cloned().collect();
        todos.sort_by(|a, b| b.priority.cmp(&a.priority));
        todos
    }

    pub fn find(&self, id: &str) -> Option<&Arc<Todo>> {
        self.items.iter().find(|t| t.id == id)
    }
}

impl Slice for TodosState {
    fn record_error(&mut self, message: String) {
        self.load.error = Some(message);
    }

    fn error(&self) -> Option<&str> {
        self.load.error.as_deref()
    }
}
