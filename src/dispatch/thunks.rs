use super::{Action, Store, TodosAction, UsersAction};
use crate::api::{ApiError, CancelToken, Inflight, MockApi};
use crate::model::{id, Priority, Session, StatusUpdate, Todo, User};
use crate::slices::{AsyncPhase, AuthAction, Outcome};
use crate::storage::{KvStorage, SESSION_KEY};
use log::*;
use std::future::Future;
use std::sync::Arc;

const LOGIN_KEY: &str = "auth/login";
const RESTORE_KEY: &str = "auth/restore";

async fn discard_session(storage: &dyn KvStorage, reason: &str) {
    debug!("Discarding stored session: {}", reason);
    if let Err(e) = storage.remove_item(SESSION_KEY).await {
        warn!("Failed to remove stored session: {}", e);
    }
}

/// Runs the asynchronous actions of the dispatch store.
///
/// Each action dispatches a pending phase, awaits the simulated backend and
/// dispatches the fulfilled, rejected or aborted phase. Failures end up in the
/// slice's `error` field and in the returned [`Outcome`]; nothing is
/// propagated as an error.
///
#[derive(Clone)]
pub struct Thunks {
    store: Store,
    api: MockApi,
    storage: Arc<dyn KvStorage>,
    inflight: Inflight,
}

impl Thunks {
    pub fn new(store: Store, api: MockApi, storage: Arc<dyn KvStorage>) -> Self {
        Thunks {
            store,
            api,
            storage,
            inflight: Inflight::new(),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Replace the todo list with the backend's list.
    ///
    pub async fn fetch_todos(&self, cancel: &CancelToken) -> Outcome<Vec<Todo>> {
        info!("Fetching todos...");
        let api = self.api.clone();
        self.run(
            "todos/fetch".to_string(),
            cancel,
            |phase| Action::Todos(TodosAction::Fetch(phase)),
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
        self.run(
            format!("todos/addAsync/{}", id::next_id()),
            cancel,
            |phase| Action::Todos(TodosAction::AddAsync(phase)),
            move |token| async move { api.create_todo(&text, priority, &token).await },
        )
        .await
    }

    /// Replace the user list with the backend's list.
    ///
    pub async fn fetch_users(&self, cancel: &CancelToken) -> Outcome<Vec<User>> {
        info!("Fetching users...");
        let api = self.api.clone();
        self.run(
            "users/fetch".to_string(),
            cancel,
            |phase| Action::Users(UsersAction::Fetch(phase)),
            move |token| async move { api.fetch_users(&token).await },
        )
        .await
    }

    /// Change a user's active flag once the backend confirms it. A user
    /// missing from the list is left alone.
    ///
    pub async fn update_user_status(
        &self,
        user_id: &str,
        is_active: bool,
        cancel: &CancelToken,
    ) -> Outcome<StatusUpdate> {
        info!("Updating status of user {}...", user_id);
        let api = self.api.clone();
        let user_id = user_id.to_string();
        self.run(
            format!("users/updateStatus/{}", user_id),
            cancel,
            |phase| Action::Users(UsersAction::UpdateStatus(phase)),
            move |token| async move { api.update_user_status(&user_id, is_active, &token).await },
        )
        .await
    }

    /// Log in and store the session for later silent re-authentication.
    ///
    pub async fn login(&self, email: &str, password: &str, cancel: &CancelToken) -> Outcome<Session> {
        info!("Logging in as {}...", email);
        let api = self.api.clone();
        let (email, password) = (email.to_string(), password.to_string());
        let outcome = self
            .run(
                LOGIN_KEY.to_string(),
                cancel,
                |phase| Action::Auth(AuthAction::Login(phase)),
                move |token| async move { api.login(&email, &password, &token).await },
            )
            .await;
        if let Outcome::Fulfilled(session) = &outcome {
            if self.store.select(|s| s.auth.is_authenticated) {
                self.store_session(session).await;
            }
        }
        outcome
    }

    /// Clear the session and forget the stored copy. A login or restore
    /// still waiting on the backend is cancelled first.
    ///
    pub async fn logout(&self) {
        info!("Logging out...");
        self.inflight.cancel(LOGIN_KEY);
        self.inflight.cancel(RESTORE_KEY);
        self.store.dispatch(Action::Auth(AuthAction::Logout));
        if let Err(e) = self.storage.remove_item(SESSION_KEY).await {
            warn!("Failed to remove stored session: {}", e);
            self.store
                .dispatch(Action::Auth(AuthAction::PersistFailed(e.to_string())));
        }
    }

    /// Try to re-authenticate from the stored session. A missing or rejected
    /// session leaves the user signed out without an error message.
    ///
    /// The stored copy is discarded only when it cannot be parsed or the
    /// backend refuses its token. Any other failure keeps it for a retry.
    ///
    pub async fn check_stored_session(&self, cancel: &CancelToken) -> Outcome<Option<Session>> {
        debug!("Checking for a stored session...");
        let api = self.api.clone();
        let storage = Arc::clone(&self.storage);
        self.run(
            RESTORE_KEY.to_string(),
            cancel,
            |phase| Action::Auth(AuthAction::Restore(phase)),
            move |token| async move {
                let raw = storage
                    .get_item(SESSION_KEY)
                    .await
                    .map_err(|e| ApiError::Other(e.to_string()))?;
                let stored: Session = match raw.map(|raw| serde_json::from_str(&raw)) {
                    Some(Ok(session)) => session,
                    Some(Err(e)) => {
                        discard_session(storage.as_ref(), &e.to_string()).await;
                        return Err(ApiError::Other(e.to_string()));
                    }
                    None => return Ok(None),
                };
                match api.verify_token(&stored.token, &token).await {
                    Ok(_) => Ok(Some(stored)),
                    Err(ApiError::InvalidToken) => {
                        discard_session(storage.as_ref(), "token rejected").await;
                        Err(ApiError::InvalidToken)
                    }
                    Err(e) => Err(e),
                }
            },
        )
        .await
    }

    /// Cancel every in-flight request. Their results are discarded.
    ///
    pub fn cancel_all(&self) {
        self.inflight.cancel_all();
    }

    async fn store_session(&self, session: &Session) {
        let result = match serde_json::to_string(session) {
            Ok(json) => self.storage.set_item(SESSION_KEY, &json).await,
            Err(e) => Err(crate::storage::StorageError::Serialization(e.to_string())),
        };
        if let Err(e) = result {
            warn!("Failed to store session: {}", e);
            self.store
                .dispatch(Action::Auth(AuthAction::PersistFailed(e.to_string())));
        }
    }

    /// Drive one request through its lifecycle.
    ///
    /// The request is registered under `key`, so a newer request with the
    /// same key supersedes it. The caller's token cancels it too.
    ///
    async fn run<T, F, Fut>(
        &self,
        key: String,
        cancel: &CancelToken,
        wrap: impl Fn(AsyncPhase<T>) -> Action,
        call: F,
    ) -> Outcome<T>
    where
        T: Clone,
        F: FnOnce(CancelToken) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let request = self.inflight.start(key);
        self.store.dispatch(wrap(AsyncPhase::Pending(request.id)));
        let response = call(request.token());
        let phase = self.inflight.settle(request, cancel, response).await;
        let outcome = Outcome::from_phase(&phase);
        self.store.dispatch(wrap(phase));
        outcome
    }
}
