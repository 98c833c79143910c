use super::load::{AsyncPhase, LoadState};
use crate::model::{Session, UserProfile};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The single authentication session of the process.
///
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AuthState {
    pub user: Option<UserProfile>,
    pub token: Option<String>,
    pub is_authenticated: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub load: LoadState,
}

/// Where the session currently sits in the login cycle.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthStatus {
    Anonymous,
    Authenticating,
    Authenticated,
}

/// Specify the auth actions.
///
#[derive(Clone, Debug, PartialEq)]
pub enum AuthAction {
    Login(AsyncPhase<Session>),
    Logout,
    /// Silent re-authentication from a stored session. `None` means there
    /// was nothing stored.
    Restore(AsyncPhase<Option<Session>>),
    UpdateProfile {
        name: Option<String>,
        email: Option<String>,
    },
    PersistFailed(String),
    ClearError,
}

impl AuthState {
    /// A pending login or restore takes precedence over an existing session.
    ///
    pub fn status(&self) -> AuthStatus {
        if self.load.loading() {
            AuthStatus::Authenticating
        } else if self.is_authenticated {
            AuthStatus::Authenticated
        } else {
            AuthStatus::Anonymous
        }
    }

    pub fn apply(&mut self, action: AuthAction) {
        match action {
            AuthAction::Login(phase) => match phase {
                AsyncPhase::Rejected(id, message) => {
                    if self.load.settle(id) {
                        self.clear_session();
                        self.load.error = Some(message);
                    }
                }
                phase => {
                    if let Some(session) = self.load.resolve(phase) {
                        self.sign_in(session);
                    }
                }
            },
            AuthAction::Logout => {
                self.clear_session();
                self.load.error = None;
            }
            AuthAction::Restore(phase) => match phase {
                AsyncPhase::Pending(id) => {
                    // Silent: an existing error banner stays until cleared.
                    let error = self.load.error.take();
                    self.load.begin(id);
                    self.load.error = error;
                }
                AsyncPhase::Fulfilled(id, stored) => {
                    if self.load.settle(id) {
                        match stored {
                            Some(session) => self.sign_in(session),
                            None => self.clear_session(),
                        }
                    }
                }
                AsyncPhase::Rejected(id, _) => {
                    if self.load.settle(id) {
                        self.clear_session();
                    }
                }
                AsyncPhase::Aborted(id) => {
                    self.load.settle(id);
                }
            },
            AuthAction::UpdateProfile { name, email } => {
                if let Some(user) = self.user.as_mut() {
                    if let Some(name) = name {
                        user.name = name;
                    }
                    if let Some(email) = email {
                        user.email = email;
                    }
                }
            }
            AuthAction::PersistFailed(message) => self.load.error = Some(message),
            AuthAction::ClearError => self.load.error = None,
        }
    }

    fn sign_in(&mut self, session: Session) {
        self.user = Some(session.user);
        self.token = Some(session.token);
        self.is_authenticated = true;
        self.last_login_at = Some(Utc::now());
    }

    fn clear_session(&mut self) {
        self.user = None;
        self.token = None;
        self.is_authenticated = false;
        self.last_login_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slices::load::RequestId;
    use fake::{Fake, Faker};

    fn login(state: &mut AuthState, result: Result<Session, &str>) {
        let id = RequestId::next();
        state.apply(AuthAction::Login(AsyncPhase::Pending(id)));
        assert_eq!(state.status(), AuthStatus::Authenticating);
        match result {
            Ok(session) => state.apply(AuthAction::Login(AsyncPhase::Fulfilled(id, session))),
            Err(message) => state.apply(AuthAction::Login(AsyncPhase::Rejected(id, message.to_string()))),
        }
    }

    #[test]
    fn failed_then_successful_login() {
        let mut state = AuthState::default();
        login(&mut state, Err("Invalid email or password"));
        assert!(!state.is_authenticated);
        assert_eq!(state.status(), AuthStatus::Anonymous);
        assert!(!state.load.error.as_deref().unwrap_or_default().is_empty());

        let session: Session = Faker.fake();
        login(&mut state, Ok(session.clone()));
        assert!(state.is_authenticated);
        assert!(state.load.error.is_none());
        assert_eq!(state.user, Some(session.user));
        assert_eq!(state.token, Some(session.token));
        assert!(state.last_login_at.is_some());
    }

    #[test]
    fn relogin_reports_authenticating_while_pending() {
        let mut state = AuthState::default();
        login(&mut state, Ok(Faker.fake()));
        assert_eq!(state.status(), AuthStatus::Authenticated);

        let id = RequestId::next();
        state.apply(AuthAction::Login(AsyncPhase::Pending(id)));
        assert_eq!(state.status(), AuthStatus::Authenticating);
        state.apply(AuthAction::Login(AsyncPhase::Aborted(id)));
        assert_eq!(state.status(), AuthStatus::Authenticated);
    }

    #[test]
    fn logout_clears_everything() {
        let mut state = AuthState::default();
        login(&mut state, Ok(Faker.fake()));
        state.apply(AuthAction::Logout);
        assert_eq!(state.status(), AuthStatus::Anonymous);
        assert!(state.user.is_none());
        assert!(state.token.is_none());
        assert!(state.last_login_at.is_none());
    }

    #[test]
    fn failed_restore_is_silent() {
        let mut state = AuthState::default();
        let id = RequestId::next();
        state.apply(AuthAction::Restore(AsyncPhase::Pending(id)));
        assert_eq!(state.status(), AuthStatus::Authenticating);
        state.apply(AuthAction::Restore(AsyncPhase::Rejected(id, "expired".to_string())));
        assert_eq!(state.status(), AuthStatus::Anonymous);
        assert!(state.load.error.is_none());
    }

    #[test]
    fn restore_with_stored_session_authenticates() {
        let mut state = AuthState::default();
        let id = RequestId::next();
        let session: Session = Faker.fake();
        state.apply(AuthAction::Restore(AsyncPhase::Pending(id)));
        state.apply(AuthAction::Restore(AsyncPhase::Fulfilled(id, Some(session))));
        assert_eq!(state.status(), AuthStatus::Authenticated);
    }

    #[test]
    fn update_profile_requires_session() {
        let mut state = AuthState::default();
        state.apply(AuthAction::UpdateProfile {
            name: Some("Ann".to_string()),
            email: None,
        });
        assert!(state.user.is_none());
        login(&mut state, Ok(Faker.fake()));
        state.apply(AuthAction::UpdateProfile {
            name: Some("Ann".to_string()),
            email: None,
        });
        assert_eq!(state.user.map(|u| u.name), Some("Ann".to_string()));
    }

    #[test]
    fn persist_failure_keeps_session() {
        let mut state = AuthState::default();
        login(&mut state, Ok(Faker.fake()));
        state.apply(AuthAction::PersistFailed("disk full".to_string()));
        assert!(state.is_authenticated);
        assert_eq!(state.load.error.as_deref(), Some("disk full"));
        state.apply(AuthAction::ClearError);
        assert!(state.load.error.is_none());
    }
}
