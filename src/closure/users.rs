use super::{Store, StoreBuilder};
use crate::api::{CancelToken, Inflight, MockApi};
use crate::container::{Container, SnapshotListener};
use crate::model::{SettingsPatch, StatusUpdate, User, UserSort};
use crate::slices::{AsyncPhase, Outcome, UserCommand, UsersState};
use crate::storage::{KvStorage, StorageError, USER_KEY};
use crate::subscription::Subscription;
use async_trait::async_trait;
use log::*;
use std::sync::Arc;

/// Persisted user directory with nested settings updates.
///
#[derive(Clone)]
pub struct UserStore {
    store: Store<UsersState>,
    api: MockApi,
    inflight: Inflight,
}

impl UserStore {
    pub async fn create(storage: Arc<dyn KvStorage>, api: MockApi) -> Result<Self, StorageError> {
        let store = StoreBuilder::new("users")
            .persist(storage, USER_KEY)
            .build()
            .await?;
        Ok(UserStore {
            store,
            api,
            inflight: Inflight::new(),
        })
    }

    pub fn store(&self) -> &Store<UsersState> {
        &self.store
    }

    pub fn users(&self) -> Arc<Vec<Arc<User>>> {
        self.store.read(|s| Arc::clone(&s.items))
    }

    pub fn filtered_users(&self) -> Vec<Arc<User>> {
        self.store.read(UsersState::filtered)
    }

    pub fn user_count(&self) -> usize {
        self.store.read(UsersState::count)
    }

    pub fn active_user_count(&self) -> usize {
        self.store.read(UsersState::active_count)
    }

    pub fn selected_user(&self) -> Option<Arc<User>> {
        self.store.read(|s| s.selected_user().cloned())
    }

    pub fn loading(&self) -> bool {
        self.store.read(|s| s.load.loading())
    }

    pub fn error(&self) -> Option<String> {
        self.store.read(|s| s.load.error.clone())
    }

    pub async fn add_user(&self, name: &str, email: &str) {
        self.apply(UserCommand::Add(User::new(name, email))).await
    }

    pub async fn delete_user(&self, id: &str) {
        self.apply(UserCommand::Remove { id: id.to_string() }).await
    }

    pub async fn toggle_user_status(&self, id: &str) {
        self.apply(UserCommand::toggle_status(id)).await
    }

    /// Patch one user's settings in place. Only that user and its settings
    /// are copied.
    ///
    pub async fn update_user_settings(&self, id: &str, patch: SettingsPatch) {
        self.apply(UserCommand::UpdateSettings {
            id: id.to_string(),
            patch,
        })
        .await
    }

    pub async fn select_user(&self, id: Option<&str>) {
        self.apply(UserCommand::Select(id.map(str::to_string))).await
    }

    pub async fn set_search_query(&self, query: &str) {
        self.apply(UserCommand::SetSearch(query.to_string())).await
    }

    pub async fn set_sort_by(&self, sort: UserSort) {
        self.apply(UserCommand::SetSort(sort)).await
    }

    pub async fn clear_error(&self) {
        self.apply(UserCommand::ClearError).await
    }

    /// Replace the directory with the backend's users.
    ///
    pub async fn fetch_users(&self, cancel: &CancelToken) -> Outcome<Vec<User>> {
        info!("Fetching users...");
        let api = self.api.clone();
        self.store
            .request(
                &self.inflight,
                "users/fetch".to_string(),
                cancel,
                |state, phase: AsyncPhase<Vec<User>>| {
                    if let Some(users) = state.load.resolve(phase) {
                        state.replace(users);
                    }
                },
                move |token| async move { api.fetch_users(&token).await },
            )
            .await
    }

    /// Set a user's active flag once the backend confirms it.
    ///
    pub async fn update_user_async(
        &self,
        user_id: &str,
        is_active: bool,
        cancel: &CancelToken,
    ) -> Outcome<StatusUpdate> {
        info!("Updating status of user {}...", user_id);
        let api = self.api.clone();
        let user_id = user_id.to_string();
        self.store
            .request(
                &self.inflight,
                format!("users/updateStatus/{}", user_id),
                cancel,
                |state, phase: AsyncPhase<StatusUpdate>| {
                    if let Some(update) = state.load.resolve(phase) {
                        state.apply_status(update);
                    }
                },
                move |token| async move { api.update_user_status(&user_id, is_active, &token).await },
            )
            .await
    }

    pub fn cancel_all(&self) {
        self.inflight.cancel_all();
    }

    async fn apply(&self, command: UserCommand) {
        self.store.commit(move |s| s.apply(command)).await
    }
}

#[async_trait]
impl Container for UserStore {
    type Snapshot = UsersState;
    type Command = UserCommand;

    fn snapshot(&self) -> UsersState {
        self.store.get()
    }

    async fn dispatch(&self, command: UserCommand) {
        self.apply(command).await
    }

    fn subscribe(&self, listener: SnapshotListener<UsersState>) -> Subscription {
        self.store.subscribe(move |next, _| listener(next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Credentials, Endpoint, Latency};
    use crate::model::Theme;
    use crate::storage::MemoryStorage;
    use std::time::Duration;

    async fn user_store() -> anyhow::Result<(UserStore, MockApi, Arc<MemoryStorage>)> {
        let api = MockApi::new(Latency::none(), Credentials::default());
        let storage = Arc::new(MemoryStorage::new());
        let store = UserStore::create(storage.clone(), api.clone()).await?;
        Ok((store, api, storage))
    }

    #[tokio::test]
    async fn nested_settings_update_shares_untouched_users() -> anyhow::Result<()> {
        let (users, _, _) = user_store().await?;
        users.fetch_users(&CancelToken::new()).await;
        let before = users.users();
        let snapshot = users.store().get();

        users
            .update_user_settings(
                "3",
                SettingsPatch {
                    theme: Some(Theme::Dark),
                    ..SettingsPatch::default()
                },
            )
            .await;
        let after = users.users();

        let changed = after.iter().find(|u| u.id == "3").unwrap();
        assert_eq!(changed.settings.theme, Theme::Dark);
        assert_eq!(changed.settings.language, "en");
        for (old, new) in before.iter().zip(after.iter()) {
            if old.id != "3" {
                assert!(Arc::ptr_eq(old, new));
            }
        }
        assert_eq!(
            snapshot.find("3").unwrap().settings.theme,
            Theme::System,
            "earlier snapshot must not see the change"
        );
        Ok(())
    }

    #[tokio::test]
    async fn settings_patch_without_change_keeps_list() -> anyhow::Result<()> {
        let (users, _, _) = user_store().await?;
        users.add_user("Ann", "ann@example.com").await;
        let id = users.users()[0].id.clone();
        let before = users.users();
        users
            .update_user_settings(
                &id,
                SettingsPatch {
                    notifications: Some(true),
                    ..SettingsPatch::default()
                },
            )
            .await;
        assert!(Arc::ptr_eq(&before, &users.users()));
        Ok(())
    }

    #[tokio::test]
    async fn search_sort_and_counts() -> anyhow::Result<()> {
        let (users, _, _) = user_store().await?;
        users.fetch_users(&CancelToken::new()).await;
        assert_eq!(users.user_count(), 4);

        assert_eq!(users.active_user_count(), 2);
        users.toggle_user_status("1").await;
        assert_eq!(users.active_user_count(), 1);

        users.set_sort_by(UserSort::Status).await;
        let last = users.filtered_users().last().cloned().unwrap();
        assert_eq!(last.id, "1");

        users.set_search_query("SMITH").await;
        let found: Vec<String> = users.filtered_users().iter().map(|u| u.name.clone()).collect();
        assert_eq!(found, vec!["Jane Smith"]);
        Ok(())
    }

    #[tokio::test]
    async fn selection_follows_deletion() -> anyhow::Result<()> {
        let (users, _, _) = user_store().await?;
        users.fetch_users(&CancelToken::new()).await;
        users.select_user(Some("3")).await;
        assert_eq!(users.selected_user().unwrap().id, "3");
        users.delete_user("3").await;
        assert!(users.selected_user().is_none());
        assert_eq!(users.user_count(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn directory_is_rehydrated() -> anyhow::Result<()> {
        let (users, api, storage) = user_store().await?;
        users.add_user("Ann", "ann@example.com").await;
        users.set_sort_by(UserSort::Email).await;

        let again = UserStore::create(storage, api).await?;
        assert_eq!(again.user_count(), 1);
        assert_eq!(again.store().get().sort, UserSort::Name);
        Ok(())
    }

    #[tokio::test]
    async fn update_user_async_patches_status() -> anyhow::Result<()> {
        let (users, api, _) = user_store().await?;
        let cancel = CancelToken::new();
        users.fetch_users(&cancel).await;
        let outcome = users.update_user_async("4", true, &cancel).await;
        assert!(outcome.is_fulfilled());
        assert!(users.users().iter().find(|u| u.id == "4").unwrap().is_active);

        api.fail(Endpoint::UpdateUser, true);
        users.update_user_async("4", false, &cancel).await;
        assert!(users.users().iter().find(|u| u.id == "4").unwrap().is_active);
        assert_eq!(users.error().as_deref(), Some("Failed to update user"));
        Ok(())
    }

    #[tokio::test]
    async fn update_user_async_for_missing_user_keeps_list() -> anyhow::Result<()> {
        let (users, _, _) = user_store().await?;
        let cancel = CancelToken::new();
        users.fetch_users(&cancel).await;
        let before = users.users();
        let outcome = users.update_user_async("missing", false, &cancel).await;
        assert!(outcome.is_fulfilled());
        assert!(Arc::ptr_eq(&before, &users.users()));
        assert!(users.error().is_none());
        assert!(!users.loading());
        Ok(())
    }

    #[tokio::test]
    async fn refetch_supersedes_stale_request() -> anyhow::Result<()> {
        let api = MockApi::new(
            Latency {
                fetch_users: 50,
                ..Latency::none()
            },
            Credentials::default(),
        );
        let users = UserStore::create(Arc::new(MemoryStorage::new()), api).await?;
        let stale = {
            let users = users.clone();
            tokio::spawn(async move { users.fetch_users(&CancelToken::new()).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        let fresh = users.fetch_users(&CancelToken::new()).await;
        assert_eq!(stale.await?, Outcome::Cancelled);
        assert!(fresh.is_fulfilled());
        assert!(!users.loading());
        assert_eq!(users.user_count(), 4);
        Ok(())
    }
}
