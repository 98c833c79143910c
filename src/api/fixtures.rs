//! Hardcoded payloads returned by the simulated backend.

use crate::model::{Priority, Theme, Todo, User, UserProfile, UserSettings};
use chrono::{Duration, Utc};

/// The two todos returned by a todo fetch.
///
pub fn todos() -> Vec<Todo> {
    let now = Utc::now();
    vec![
        Todo {
            id: "1".to_string(),
            text: "Learn the action-dispatch store".to_string(),
            completed: false,
            created_at: now - Duration::days(1),
            priority: Priority::High,
        },
        Todo {
            id: "2".to_string(),
            text: "Build a closure store".to_string(),
            completed: true,
            created_at: now,
            priority: Priority::Medium,
        },
    ]
}

/// The four users returned by a user fetch.
///
pub fn users() -> Vec<User> {
    let now = Utc::now();
    let user = |id: &str, name: &str, is_active: bool, minutes_ago: i64, theme: Theme| User {
        id: id.to_string(),
        name: name.to_string(),
        email: format!("{}@example.com", name.split(' ').next().unwrap_or(name).to_lowercase()),
        avatar: format!("https://i.pravatar.cc/150?img={}", id),
        is_active,
        last_seen: now - Duration::minutes(minutes_ago),
        settings: UserSettings {
            theme,
            ..UserSettings::default()
        },
    };
    vec![
        user("1", "John Doe", true, 5, Theme::Light),
        user("2", "Jane Smith", false, 120, Theme::Dark),
        user("3", "Bob Johnson", true, 1, Theme::System),
        user("4", "Alice Brown", false, 1440, Theme::Light),
    ]
}

/// The profile behind the demo credentials.
///
pub fn demo_profile(email: &str) -> UserProfile {
    UserProfile {
        id: "1".to_string(),
        name: "Demo User".to_string(),
        email: email.to_string(),
    }
}
