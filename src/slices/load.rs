//! Request lifecycle shared by every asynchronous operation.

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_REQUEST: AtomicU64 = AtomicU64::new(1);

/// Identifies one asynchronous request from pending to settlement.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    /// Return a new process-unique request id.
    ///
    pub fn next() -> Self {
        RequestId(NEXT_REQUEST.fetch_add(1, Ordering::Relaxed))
    }
}

/// The phases an asynchronous action passes through.
///
#[derive(Clone, Debug, PartialEq)]
pub enum AsyncPhase<T> {
    Pending(RequestId),
    Fulfilled(RequestId, T),
    Rejected(RequestId, String),
    /// The request was cancelled; its result, if any, is discarded.
    Aborted(RequestId),
}

impl<T> AsyncPhase<T> {
    pub fn request(&self) -> RequestId {
        match self {
            AsyncPhase::Pending(id)
            | AsyncPhase::Fulfilled(id, _)
            | AsyncPhase::Rejected(id, _)
            | AsyncPhase::Aborted(id) => *id,
        }
    }

    pub fn stage(&self) -> &'static str {
        match self {
            AsyncPhase::Pending(_) => "pending",
            AsyncPhase::Fulfilled(..) => "fulfilled",
            AsyncPhase::Rejected(..) => "rejected",
            AsyncPhase::Aborted(_) => "aborted",
        }
    }
}

/// How an asynchronous action settled, as reported to its caller.
///
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome<T> {
    Fulfilled(T),
    Rejected(String),
    Cancelled,
}

impl<T> Outcome<T> {
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, Outcome::Fulfilled(_))
    }
}

impl<T: Clone> Outcome<T> {
    /// Return the outcome of a settled phase. A pending phase has not settled
    /// and reports as cancelled.
    ///
    pub fn from_phase(phase: &AsyncPhase<T>) -> Self {
        match phase {
            AsyncPhase::Fulfilled(_, value) => Outcome::Fulfilled(value.clone()),
            AsyncPhase::Rejected(_, message) => Outcome::Rejected(message.clone()),
            AsyncPhase::Pending(_) | AsyncPhase::Aborted(_) => Outcome::Cancelled,
        }
    }
}

/// Loading flag and error message of a slice.
///
/// `loading()` is true while at least one request is pending. Settling a
/// request the slice does not know about is ignored.
///
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadState {
    pending: Vec<RequestId>,
    pub error: Option<String>,
}

impl LoadState {
    pub fn loading(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Record a new pending request and clear the previous error.
    ///
    pub fn begin(&mut self, id: RequestId) {
        if !self.pending.contains(&id) {
            self.pending.push(id);
        }
        self.error = None;
    }

    /// Remove the request from the pending set. Returns false if it was not
    /// pending.
    ///
    pub fn settle(&mut self, id: RequestId) -> bool {
        match self.pending.iter().position(|p| *p == id) {
            Some(index) => {
                self.pending.remove(index);
                true
            }
            None => false,
        }
    }

    /// Advance the lifecycle by one phase, returning the payload of a
    /// fulfilled request that was still pending.
    ///
    pub fn resolve<T>(&mut self, phase: AsyncPhase<T>) -> Option<T> {
        match phase {
            AsyncPhase::Pending(id) => {
                self.begin(id);
                None
            }
            AsyncPhase::Fulfilled(id, value) => self.settle(id).then_some(value),
            AsyncPhase::Rejected(id, message) => {
                if self.settle(id) {
                    self.error = Some(message);
                }
                None
            }
            AsyncPhase::Aborted(id) => {
                self.settle(id);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_sets_loading_and_clears_error() {
        let mut load = LoadState {
            error: Some("old".to_string()),
            ..LoadState::default()
        };
        load.resolve::<()>(AsyncPhase::Pending(RequestId::next()));
        assert!(load.loading());
        assert!(load.error.is_none());
    }

    #[test]
    fn fulfilled_returns_payload_once() {
        let mut load = LoadState::default();
        let id = RequestId::next();
        load.resolve::<u8>(AsyncPhase::Pending(id));
        assert_eq!(load.resolve(AsyncPhase::Fulfilled(id, 7)), Some(7));
        assert!(!load.loading());
        assert_eq!(load.resolve(AsyncPhase::Fulfilled(id, 8)), None);
    }

    #[test]
    fn rejected_stores_message() {
        let mut load = LoadState::default();
        let id = RequestId::next();
        load.resolve::<()>(AsyncPhase::Pending(id));
        load.resolve::<()>(AsyncPhase::Rejected(id, "boom".to_string()));
        assert!(!load.loading());
        assert_eq!(load.error.as_deref(), Some("boom"));
    }

    #[test]
    fn unknown_request_is_ignored() {
        let mut load = LoadState::default();
        load.resolve::<()>(AsyncPhase::Rejected(RequestId::next(), "late".to_string()));
        assert!(load.error.is_none());
    }

    #[test]
    fn aborted_settles_without_error() {
        let mut load = LoadState::default();
        let first = RequestId::next();
        let second = RequestId::next();
        load.resolve::<()>(AsyncPhase::Pending(first));
        load.resolve::<()>(AsyncPhase::Pending(second));
        load.resolve::<()>(AsyncPhase::Aborted(first));
        assert!(load.loading());
        load.resolve::<()>(AsyncPhase::Aborted(second));
        assert!(!load.loading());
        assert!(load.error.is_none());
    }
}
