//! The interface every concern exposes, whichever family implements it.
//!
//! A container hands out snapshots of its slice, accepts commands and
//! notifies subscribers when its slice changes. Both the dispatch store
//! handles and the closure stores implement it, so the same checks run
//! against either.

use crate::subscription::Subscription;
use async_trait::async_trait;

pub type SnapshotListener<S> = Box<dyn Fn(&S) + Send + Sync>;

#[async_trait]
pub trait Container: Send + Sync {
    type Snapshot: Clone + Send + Sync + 'static;
    type Command: Send + 'static;

    /// Return the current state of the slice.
    fn snapshot(&self) -> Self::Snapshot;

    /// Apply a command. Completes once the change, and any persistence it
    /// triggers, has settled.
    async fn dispatch(&self, command: Self::Command);

    /// Call `listener` with the new snapshot each time the slice changes.
    fn subscribe(&self, listener: SnapshotListener<Self::Snapshot>) -> Subscription;
}
