//! Slice state and commands shared by both container families.
//!
//! Each concern has one state type and one command type. The action-dispatch
//! store and the closure stores differ only in how they wire persistence,
//! nested updates and subscriptions around these.

pub mod auth;
pub mod counter;
pub mod load;
pub mod todos;
pub mod users;

pub use auth::{AuthAction, AuthState, AuthStatus};
pub use counter::{CounterCommand, CounterState};
pub use load::{AsyncPhase, LoadState, Outcome, RequestId};
pub use todos::{TodoCommand, TodoStats, TodosState};
pub use users::{UserCommand, UsersState};

use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;

/// State that can live in a persistent store.
///
/// Error messages are transient: implementors keep them out of the
/// serialized form.
///
pub trait Slice:
    Clone + Default + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    fn record_error(&mut self, message: String);

    fn error(&self) -> Option<&str>;
}

/// Copy-on-write patch of the first item matching `matches`.
///
/// Only the list spine and the patched item are cloned; every other item
/// stays pointer-equal. Returns false and leaves `items` untouched when
/// nothing matches.
///
pub(crate) fn patch_where<T: Clone>(
    items: &mut Arc<Vec<Arc<T>>>,
    matches: impl Fn(&T) -> bool,
    patch: impl FnOnce(&mut T),
) -> bool {
    let index = match items.iter().position(|item| matches(item.as_ref())) {
        Some(index) => index,
        None => return false,
    };
    let list = Arc::make_mut(items);
    patch(Arc::make_mut(&mut list[index]));
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_where_copies_only_the_path() {
        let mut items = Arc::new(vec![Arc::new(1), Arc::new(2), Arc::new(3)]);
        let old = Arc::clone(&items);
        assert!(patch_where(&mut items, |v| *v == 2, |v| *v = 20));
        assert_eq!(*old[1], 2);
        assert_eq!(*items[1], 20);
        assert!(!Arc::ptr_eq(&old, &items));
        assert!(Arc::ptr_eq(&old[0], &items[0]));
        assert!(Arc::ptr_eq(&old[2], &items[2]));
    }

    #[test]
    fn patch_where_without_match_is_untouched() {
        let mut items = Arc::new(vec![Arc::new(1)]);
        let old = Arc::clone(&items);
        assert!(!patch_where(&mut items, |v| *v == 9, |v| *v = 0));
        assert!(Arc::ptr_eq(&old, &items));
    }
}
