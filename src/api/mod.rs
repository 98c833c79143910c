//! Simulated backend.
//!
//! Every operation waits a fixed, configurable delay and then returns a
//! hardcoded payload or a hardcoded error. The delay races the caller's
//! cancellation token, so an abandoned request returns
//! [`ApiError::Cancelled`] as soon as it is cancelled.

mod cancel;
mod error;
pub mod fixtures;

pub use cancel::{CancelToken, Inflight, Request};
pub use error::ApiError;

use crate::model::{Priority, Session, StatusUpdate, Todo, User, UserProfile};
use chrono::Utc;
use log::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

const TOKEN_PREFIX: &str = "mock-token-";

/// Specify the simulated endpoints.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Endpoint {
    FetchTodos,
    AddTodo,
    FetchUsers,
    UpdateUser,
    Login,
    RestoreSession,
}

impl Endpoint {
    fn describe(&self) -> &'static str {
        match self {
            Endpoint::FetchTodos => "fetch todos",
            Endpoint::AddTodo => "add todo",
            Endpoint::FetchUsers => "fetch users",
            Endpoint::UpdateUser => "update user",
            Endpoint::Login => "log in",
            Endpoint::RestoreSession => "restore session",
        }
    }
}

/// Simulated round-trip time per endpoint, in milliseconds.
///
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Latency {
    pub fetch_todos: u64,
    pub add_todo: u64,
    pub fetch_users: u64,
    pub update_user: u64,
    pub login: u64,
    pub restore_session: u64,
}

impl Default for Latency {
    fn default() -> Self {
        Latency {
            fetch_todos: 1000,
            add_todo: 500,
            fetch_users: 1000,
            update_user: 500,
            login: 1000,
            restore_session: 300,
        }
    }
}

impl Latency {
    /// Zero delay on every endpoint.
    ///
    pub fn none() -> Self {
        Latency {
            fetch_todos: 0,
            add_todo: 0,
            fetch_users: 0,
            update_user: 0,
            login: 0,
            restore_session: 0,
        }
    }

    pub fn for_endpoint(&self, endpoint: Endpoint) -> Duration {
        let millis = match endpoint {
            Endpoint::FetchTodos => self.fetch_todos,
            Endpoint::AddTodo => self.add_todo,
            Endpoint::FetchUsers => self.fetch_users,
            Endpoint::UpdateUser => self.update_user,
            Endpoint::Login => self.login,
            Endpoint::RestoreSession => self.restore_session,
        };
        Duration::from_millis(millis)
    }
}

/// The only credentials the simulated login accepts.
///
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Credentials {
            email: "demo@example.com".to_string(),
            password: "password".to_string(),
        }
    }
}

/// Responsible for the simulated network round trips of every container.
///
/// Clones share failure injection and call counters.
///
#[derive(Clone, Debug)]
pub struct MockApi {
    latency: Latency,
    credentials: Credentials,
    failures: Arc<Mutex<HashSet<Endpoint>>>,
    calls: Arc<Mutex<HashMap<Endpoint, usize>>>,
}

impl MockApi {
    pub fn new(latency: Latency, credentials: Credentials) -> Self {
        MockApi {
            latency,
            credentials,
            failures: Arc::new(Mutex::new(HashSet::new())),
            calls: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Make `endpoint` fail (or succeed again) on subsequent calls.
    ///
    pub fn fail(&self, endpoint: Endpoint, failing: bool) {
        let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        if failing {
            failures.insert(endpoint);
        } else {
            failures.remove(&endpoint);
        }
    }

    /// Number of calls made to `endpoint` so far.
    ///
    pub fn call_count(&self, endpoint: Endpoint) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&endpoint)
            .copied()
            .unwrap_or(0)
    }

    /// Returns the two fixed todos.
    ///
    pub async fn fetch_todos(&self, cancel: &CancelToken) -> Result<Vec<Todo>, ApiError> {
        self.simulate(Endpoint::FetchTodos, cancel, || Ok(fixtures::todos()))
            .await
    }

    /// Returns a newly created todo.
    ///
    pub async fn create_todo(
        &self,
        text: &str,
        priority: Priority,
        cancel: &CancelToken,
    ) -> Result<Todo, ApiError> {
        self.simulate(Endpoint::AddTodo, cancel, || Ok(Todo::new(text, priority)))
            .await
    }

    /// Returns the four fixed users.
    ///
    pub async fn fetch_users(&self, cancel: &CancelToken) -> Result<Vec<User>, ApiError> {
        self.simulate(Endpoint::FetchUsers, cancel, || Ok(fixtures::users()))
            .await
    }

    /// Returns the confirmed status change. The backend does not check that
    /// the user exists.
    ///
    pub async fn update_user_status(
        &self,
        id: &str,
        is_active: bool,
        cancel: &CancelToken,
    ) -> Result<StatusUpdate, ApiError> {
        self.simulate(Endpoint::UpdateUser, cancel, || {
            Ok(StatusUpdate {
                id: id.to_string(),
                is_active,
                last_seen: Utc::now(),
            })
        })
        .await
    }

    /// Returns a session for the demo credentials.
    ///
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        cancel: &CancelToken,
    ) -> Result<Session, ApiError> {
        self.simulate(Endpoint::Login, cancel, || {
            let email = email.trim();
            if email.eq_ignore_ascii_case(&self.credentials.email)
                && password == self.credentials.password
            {
                Ok(Session {
                    user: fixtures::demo_profile(email),
                    token: format!("{}{}", TOKEN_PREFIX, Utc::now().timestamp_millis()),
                })
            } else {
                Err(ApiError::InvalidCredentials)
            }
        })
        .await
    }

    /// Returns the profile behind a previously issued token.
    ///
    pub async fn verify_token(
        &self,
        token: &str,
        cancel: &CancelToken,
    ) -> Result<UserProfile, ApiError> {
        self.simulate(Endpoint::RestoreSession, cancel, || {
            if token.starts_with(TOKEN_PREFIX) {
                Ok(fixtures::demo_profile(&self.credentials.email))
            } else {
                Err(ApiError::InvalidToken)
            }
        })
        .await
    }

    /// Wait out the endpoint's delay unless cancelled first, then run `body`.
    ///
    async fn simulate<T>(
        &self,
        endpoint: Endpoint,
        cancel: &CancelToken,
        body: impl FnOnce() -> Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        *self
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(endpoint)
            .or_insert(0) += 1;
        debug!("Simulating request to '{}'...", endpoint.describe());

        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        tokio::select! {
            _ = tokio::time::sleep(self.latency.for_endpoint(endpoint)) => {}
            _ = cancel.cancelled() => {
                debug!("Request to '{}' cancelled.", endpoint.describe());
                return Err(ApiError::Cancelled);
            }
        }

        let failing = self
            .failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&endpoint);
        if failing {
            return Err(ApiError::Simulated {
                endpoint: endpoint.describe().to_string(),
            });
        }
        body()
    }
}

impl Default for MockApi {
    fn default() -> Self {
        MockApi::new(Latency::default(), Credentials::default())
    }
}
