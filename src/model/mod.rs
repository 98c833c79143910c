//! Records owned by the containers.
//!
//! Every record is a plain value with an id; no record references another
//! container's data.

pub mod id;

use chrono::{DateTime, Utc};
use fake::Dummy;
use serde::{Deserialize, Serialize};

/// Defines todo priority.
///
#[derive(Clone, Copy, Debug, Default, Dummy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

/// Defines todo item data structure.
///
#[derive(Clone, Debug, Dummy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub priority: Priority,
}

impl Todo {
    /// Return a new incomplete todo with a freshly generated id.
    ///
    pub fn new(text: impl Into<String>, priority: Priority) -> Self {
        Todo {
            id: id::next_id(),
            text: text.into(),
            completed: false,
            created_at: Utc::now(),
            priority,
        }
    }
}

/// Defines colour scheme preference.
///
#[derive(Clone, Copy, Debug, Default, Dummy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

/// Defines per-user settings (the nested part of a user record).
///
#[derive(Clone, Debug, Dummy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    pub theme: Theme,
    pub notifications: bool,
    pub language: String,
}

impl Default for UserSettings {
    fn default() -> Self {
        UserSettings {
            theme: Theme::System,
            notifications: true,
            language: "en".to_string(),
        }
    }
}

/// Partial update for [`UserSettings`]. Absent fields are left untouched.
///
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SettingsPatch {
    pub theme: Option<Theme>,
    pub notifications: Option<bool>,
    pub language: Option<String>,
}

impl SettingsPatch {
    /// Apply the patch, returning whether any field actually changed.
    ///
    pub fn apply_to(&self, settings: &mut UserSettings) -> bool {
        let mut changed = false;
        if let Some(theme) = self.theme {
            changed |= settings.theme != theme;
            settings.theme = theme;
        }
        if let Some(notifications) = self.notifications {
            changed |= settings.notifications != notifications;
            settings.notifications = notifications;
        }
        if let Some(language) = &self.language {
            changed |= settings.language != *language;
            settings.language = language.clone();
        }
        changed
    }

    /// Whether applying the patch would change `settings`.
    ///
    pub fn changes(&self, settings: &UserSettings) -> bool {
        let mut probe = settings.clone();
        self.apply_to(&mut probe)
    }
}

/// Defines user data structure.
///
#[derive(Clone, Debug, Dummy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub is_active: bool,
    pub last_seen: DateTime<Utc>,
    #[serde(default)]
    pub settings: UserSettings,
}

impl User {
    /// Return a new active user with a freshly generated id and default settings.
    ///
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        let id = id::next_id();
        User {
            avatar: format!("https://i.pravatar.cc/150?u={}", id),
            id,
            name: name.into(),
            email: email.into(),
            is_active: true,
            last_seen: Utc::now(),
            settings: UserSettings::default(),
        }
    }
}

/// Defines the result of a user status change round trip.
///
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub id: String,
    pub is_active: bool,
    pub last_seen: DateTime<Utc>,
}

/// Defines the signed-in user's profile.
///
#[derive(Clone, Debug, Dummy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// Defines an authenticated session as stored on disk.
///
#[derive(Clone, Debug, Dummy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user: UserProfile,
    pub token: String,
}

/// Specifying todo filter options.
///
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TodoFilter {
    #[default]
    All,
    Active,
    Completed,
}

impl TodoFilter {
    /// Whether the todo is visible under this filter.
    ///
    pub fn matches(&self, todo: &Todo) -> bool {
        match self {
            TodoFilter::All => true,
            TodoFilter::Active => !todo.completed,
            TodoFilter::Completed => todo.completed,
        }
    }
}

/// Specifying user sort options.
///
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserSort {
    #[default]
    Name,
    Email,
    Status,
}

#[cfg(test)]
mod tests {
    use super::*;
    use fake::{Fake, Faker};

    #[test]
    fn new_todo_is_incomplete() {
        let todo = Todo::new("Write tests", Priority::High);
        assert!(!todo.completed);
        assert_eq!(todo.priority, Priority::High);
        assert_eq!(todo.text, "Write tests");
    }

    #[test]
    fn todo_filter_matches() {
        let mut todo: Todo = Faker.fake();
        todo.completed = false;
        assert!(TodoFilter::All.matches(&todo));
        assert!(TodoFilter::Active.matches(&todo));
        assert!(!TodoFilter::Completed.matches(&todo));
        todo.completed = true;
        assert!(!TodoFilter::Active.matches(&todo));
        assert!(TodoFilter::Completed.matches(&todo));
    }

    #[test]
    fn settings_patch_reports_changes() {
        let mut settings = UserSettings::default();
        let patch = SettingsPatch {
            theme: Some(Theme::Dark),
            ..SettingsPatch::default()
        };
        assert!(patch.changes(&settings));
        assert!(patch.apply_to(&mut settings));
        assert_eq!(settings.theme, Theme::Dark);
        assert!(!patch.changes(&settings));
        assert!(!SettingsPatch::default().apply_to(&mut settings));
    }

    #[test]
    fn todo_tolerates_missing_fields() {
        let json = r#"{"id":"1","text":"A","createdAt":"2024-01-01T00:00:00Z"}"#;
        let todo: Todo = serde_json::from_str(json).unwrap();
        assert!(!todo.completed);
        assert_eq!(todo.priority, Priority::Medium);
    }

    #[test]
    fn priority_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Priority::High).unwrap(), "\"high\"");
    }
}
