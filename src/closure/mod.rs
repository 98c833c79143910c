//! Closure stores.
//!
//! Each concern gets its own [`Store`] built with [`StoreBuilder`]. Mutators
//! are bound methods that run a recipe against a copy-on-write draft; the
//! store persists the slice after every change and notifies subscribers only
//! when something actually changed.

mod counter;
mod store;
mod todos;
mod users;

pub use counter::CounterStore;
pub use store::{Shallow, Store, StoreBuilder};
pub use todos::TodoStore;
pub use users::UserStore;
