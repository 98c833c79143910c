//! Cancellation for simulated requests.

use super::ApiError;
use crate::slices::{AsyncPhase, RequestId};
use log::*;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;

/// Signals that the caller no longer wants a request's result.
///
/// Clones share the same flag.
///
#[derive(Clone, Debug)]
pub struct CancelToken {
    sender: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        CancelToken::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        CancelToken {
            sender: Arc::new(sender),
        }
    }

    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// Wait until the token is cancelled.
    ///
    pub async fn cancelled(&self) {
        let mut receiver = self.sender.subscribe();
        // The sender lives in `self`, so the channel cannot close while waiting.
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }
}

/// One registered in-flight request.
///
#[derive(Debug)]
pub struct Request {
    pub id: RequestId,
    key: String,
    token: CancelToken,
}

impl Request {
    /// Token to hand to the backend call.
    ///
    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Tracks the in-flight request per operation key.
///
/// Starting an operation cancels the previous request under the same key, so
/// the most recently dispatched request is the one whose result lands.
///
#[derive(Clone, Debug, Default)]
pub struct Inflight {
    tokens: Arc<Mutex<HashMap<String, CancelToken>>>,
}

impl Inflight {
    pub fn new() -> Self {
        Inflight::default()
    }

    /// Register `token` as the current request for `key`, cancelling its
    /// predecessor.
    ///
    pub fn begin(&self, key: &str, token: &CancelToken) {
        let mut tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = tokens.insert(key.to_string(), token.clone()) {
            if !Arc::ptr_eq(&previous.sender, &token.sender) {
                debug!("Superseding in-flight request '{}'.", key);
                previous.cancel();
            }
        }
    }

    /// Register a new request under `key`, superseding the previous one.
    ///
    pub fn start(&self, key: impl Into<String>) -> Request {
        let key = key.into();
        let token = CancelToken::new();
        self.begin(&key, &token);
        Request {
            id: RequestId::next(),
            key,
            token,
        }
    }

    /// Await the backend response for `request` and turn it into the
    /// settling phase.
    ///
    /// The result is discarded as [`AsyncPhase::Aborted`] when either the
    /// caller's token or the request's own token (superseded) was cancelled.
    ///
    pub async fn settle<T, F>(&self, request: Request, cancel: &CancelToken, response: F) -> AsyncPhase<T>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        let result = tokio::select! {
            result = response => result,
            _ = cancel.cancelled() => Err(ApiError::Cancelled),
            _ = request.token.cancelled() => Err(ApiError::Cancelled),
        };
        self.finish(&request.key, &request.token);

        let cancelled = cancel.is_cancelled() || request.token.is_cancelled();
        match result {
            Ok(value) if !cancelled => AsyncPhase::Fulfilled(request.id, value),
            Ok(_) | Err(ApiError::Cancelled) => {
                debug!("Request '{}' cancelled; result discarded.", request.key);
                AsyncPhase::Aborted(request.id)
            }
            Err(e) => {
                warn!("Request '{}' failed: {}", request.key, e);
                AsyncPhase::Rejected(request.id, e.to_string())
            }
        }
    }

    /// Forget `token` if it is still the current request for `key`.
    ///
    pub fn finish(&self, key: &str, token: &CancelToken) {
        let mut tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(current) = tokens.get(key) {
            if Arc::ptr_eq(&current.sender, &token.sender) {
                tokens.remove(key);
            }
        }
    }

    /// Cancel the request currently registered under `key`, if any.
    ///
    pub fn cancel(&self, key: &str) {
        let removed = self
            .tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        if let Some(token) = removed {
            debug!("Cancelling in-flight request '{}'.", key);
            token.cancel();
        }
    }

    /// Cancel every tracked request.
    ///
    pub fn cancel_all(&self) {
        let mut tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
        for (key, token) in tokens.drain() {
            debug!("Cancelling in-flight request '{}'.", key);
            token.cancel();
        }
    }

    pub fn len(&self) -> usize {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
