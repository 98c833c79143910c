use super::load::LoadState;
use super::{patch_where, Slice};
use crate::model::{SettingsPatch, StatusUpdate, User, UserSort};
use chrono::{DateTime, Utc};
use log::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// User list, selection, search/sort selectors and fetch status. Only the
/// list is persisted.
///
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsersState {
    pub items: Arc<Vec<Arc<User>>>,
    #[serde(skip)]
    pub selected: Option<String>,
    #[serde(skip)]
    pub search: String,
    #[serde(skip)]
    pub sort: UserSort,
    #[serde(skip)]
    pub load: LoadState,
}

/// Specify the user commands.
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserCommand {
    Add(User),
    Remove { id: String },
    ToggleStatus { id: String, at: DateTime<Utc> },
    SetStatus(StatusUpdate),
    UpdateSettings { id: String, patch: SettingsPatch },
    Select(Option<String>),
    SetSearch(String),
    SetSort(UserSort),
    ClearError,
}

impl UserCommand {
    /// Flip a user's active flag, stamping the current time as last seen.
    ///
    pub fn toggle_status(id: impl Into<String>) -> Self {
        UserCommand::ToggleStatus {
            id: id.into(),
            at: Utc::now(),
        }
    }
}

impl UsersState {
    /// Apply a command. Commands naming a missing user change nothing.
    ///
    pub fn apply(&mut self, command: UserCommand) {
        match command {
            UserCommand::Add(user) => self.push(user),
            UserCommand::Remove { id } => {
                if self.items.iter().any(|u| u.id == id) {
                    Arc::make_mut(&mut self.items).retain(|u| u.id != id);
                }
                if self.selected.as_deref() == Some(id.as_str()) {
                    self.selected = None;
                }
            }
            UserCommand::ToggleStatus { id, at } => {
                patch_where(&mut self.items, |u| u.id == id, |u| {
                    u.is_active = !u.is_active;
                    u.last_seen = at;
                });
            }
            UserCommand::SetStatus(update) => self.apply_status(update),
            UserCommand::UpdateSettings { id, patch } => {
                patch_where(
                    &mut self.items,
                    |u| u.id == id && patch.changes(&u.settings),
                    |u| {
                        patch.apply_to(&mut u.settings);
                    },
                );
            }
            UserCommand::Select(id) => self.selected = id,
            UserCommand::SetSearch(query) => self.search = query,
            UserCommand::SetSort(sort) => self.sort = sort,
            UserCommand::ClearError => self.load.error = None,
        }
    }

    /// Append a user unless its id is already present.
    ///
    pub fn push(&mut self, user: User) {
        if self.items.iter().any(|u| u.id == user.id) {
            warn!("Ignoring user with duplicate id '{}'.", user.id);
            return;
        }
        Arc::make_mut(&mut self.items).push(Arc::new(user));
    }

    /// Replace the whole list. The selection is dropped if its user is gone.
    ///
    pub fn replace(&mut self, users: Vec<User>) {
        self.items = Arc::new(users.into_iter().map(Arc::new).collect());
        if let Some(id) = &self.selected {
            if !self.items.iter().any(|u| &u.id == id) {
                self.selected = None;
            }
        }
    }

    /// Patch the active flag and last-seen time of the matching user.
    ///
    pub fn apply_status(&mut self, update: StatusUpdate) {
        let patched = patch_where(&mut self.items, |u| u.id == update.id, |u| {
            u.is_active = update.is_active;
            u.last_seen = update.last_seen;
        });
        if !patched {
            debug!("No user '{}' to patch; list left unchanged.", update.id);
        }
    }

    /// Return users matching the search query, ordered by the sort key.
    ///
    pub fn filtered(&self) -> Vec<Arc<User>> {
        let query = self.search.trim().to_lowercase();
        let mut users: Vec<Arc<User>> = self
            .items
            .iter()
            .filter(|u| {
                query.is_empty()
                    || u.name.to_lowercase().contains(&query)
                    || u.email.to_lowercase().contains(&query)
            })
            .cloned()
            .collect();
        match self.sort {
            UserSort::Name => users.sort_by_key(|u| u.name.to_lowercase()),
            UserSort::Email => users.sort_by_key(|u| u.email.to_lowercase()),
            UserSort::Status => users.sort_by(|a, b| {
                b.is_active
                    .cmp(&a.is_active)
                    .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
            }),
        }
        users
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn active_count(&self) -> usize {
        self.items.iter().filter(|u| u.is_active).count()
    }

    pub fn selected_user(&self) -> Option<&Arc<User>> {
        let id = self.selected.as_deref()?;
        self.find(id)
    }

    pub fn find(&self, id: &str) -> Option<&Arc<User>> {
        self.items.iter().find(|u| u.id == id)
    }
}

impl Slice for UsersState {
    fn record_error(&mut self, message: String) {
        self.load.error = Some(message);
    }

    fn error(&self) -> Option<&str> {
        self.load.error.as_deref()
    }
}
