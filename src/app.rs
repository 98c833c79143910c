use crate::api::{CancelToken, MockApi};
use crate::closure::{CounterStore, TodoStore, UserStore};
use crate::config::Config;
use crate::container::Container;
use crate::dispatch::{Store, Thunks};
use crate::error::{AppError, AppResult};
use crate::logger::{self, StoreLogger};
use crate::model::{Priority, SettingsPatch, Theme, TodoFilter};
use crate::slices::{CounterCommand, CounterState, TodoCommand, TodosState, UsersState};
use crate::storage::{FileStorage, KvStorage};
use crate::subscription::Subscription;
use crate::utils::validation::{require_non_empty, validate_user};
use anyhow::Result;
use log::*;
use serde::Serialize;
use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};

const RECENT_LOG_LINES: usize = 8;

/// Which container family the walkthrough drives.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Family {
    Dispatch,
    Closure,
    Both,
}

impl Family {
    fn dispatch(&self) -> bool {
        matches!(self, Family::Dispatch | Family::Both)
    }

    fn closure(&self) -> bool {
        matches!(self, Family::Closure | Family::Both)
    }
}

impl FromStr for Family {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "dispatch" => Ok(Family::Dispatch),
            "closure" => Ok(Family::Closure),
            "both" => Ok(Family::Both),
            other => Err(AppError::Other(format!("Unknown store family '{}'", other))),
        }
    }
}

/// Every container the application uses, wired to one backend and one
/// storage.
///
pub struct AppContext {
    pub api: MockApi,
    pub storage: Arc<dyn KvStorage>,
    pub store: Store,
    pub thunks: Thunks,
    pub counter: CounterStore,
    pub todos: TodoStore,
    pub users: UserStore,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl AppContext {
    /// Build the dispatch store and the closure stores, rehydrating the
    /// closure stores from `storage`.
    ///
    pub async fn new(config: &Config, storage: Arc<dyn KvStorage>) -> AppResult<Self> {
        let api = MockApi::new(config.latency.clone(), config.demo_credentials.clone());
        let store = Store::new();
        let thunks = Thunks::new(store.clone(), api.clone(), Arc::clone(&storage));
        let counter = CounterStore::create(Arc::clone(&storage)).await?;
        let todos = TodoStore::create(Arc::clone(&storage), api.clone()).await?;
        let users = UserStore::create(Arc::clone(&storage), api.clone()).await?;
        Ok(AppContext {
            api,
            storage,
            store,
            thunks,
            counter,
            todos,
            users,
            subscriptions: Mutex::new(vec![]),
        })
    }

    /// Hold `subscription` until shutdown.
    ///
    pub fn keep(&self, subscription: Subscription) {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(subscription);
    }

    /// Cancel in-flight requests and drop every subscription.
    ///
    pub fn shutdown(&self) {
        info!("Shutting down stores...");
        self.thunks.cancel_all();
        self.todos.cancel_all();
        self.users.cancel_all();
        let subscriptions: Vec<Subscription> = self
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for subscription in subscriptions {
            subscription.unsubscribe();
        }
        self.store.teardown();
        self.counter.store().destroy();
        self.todos.store().destroy();
        self.users.store().destroy();
    }
}

/// Snapshot of the closure stores, printed after the walkthrough.
///
#[derive(Serialize)]
struct ClosureSnapshot {
    counter: CounterState,
    todos: TodosState,
    users: UsersState,
}

/// Drives the containers through a scripted session and prints the result.
///
pub struct App;

impl App {
    /// Start a new session according to the given configuration. Returns the
    /// result of the walkthrough.
    ///
    pub async fn start(config: Config, family: Family, verbose: bool) -> Result<()> {
        let level = if verbose {
            LevelFilter::Debug
        } else {
            config.level_filter()?
        };
        let recent = Arc::new(Mutex::new(VecDeque::with_capacity(RECENT_LOG_LINES)));
        let logger = StoreLogger::new(level);
        let sink = Arc::clone(&recent);
        logger.set_log_callback(Box::new(move |line| {
            let mut lines = sink.lock().unwrap_or_else(PoisonError::into_inner);
            if lines.len() == RECENT_LOG_LINES {
                lines.pop_front();
            }
            lines.push_back(line);
        }));
        logger::init(logger)?;

        info!("Starting application...");
        let storage_dir = config.storage_path()?;
        debug!("Persisting state under {}.", storage_dir.display());
        let context = AppContext::new(&config, Arc::new(FileStorage::new(storage_dir))).await?;

        if family.dispatch() {
            App::run_dispatch(&context, &config).await?;
        }
        if family.closure() {
            App::run_closure(&context).await?;
        }
        context.shutdown();

        println!("# recent log");
        for line in recent.lock().unwrap_or_else(PoisonError::into_inner).iter() {
            println!("# {}", line);
        }
        info!("Exiting application...");
        Ok(())
    }

    /// Walk through the action-dispatch store.
    ///
    async fn run_dispatch(context: &AppContext, config: &Config) -> Result<()> {
        info!("Running the action-dispatch walkthrough...");
        let cancel = CancelToken::new();
        let thunks = &context.thunks;
        context.keep(context.store.subscribe(|next, previous| {
            if next.counter.value != previous.counter.value {
                debug!("Counter moved to {}.", next.counter.value);
            }
        }));

        let counter = context.store.counter();
        counter.dispatch(CounterCommand::Increment).await;
        counter.dispatch(CounterCommand::AddAmount(5)).await;

        if !thunks.check_stored_session(&cancel).await.is_fulfilled()
            || !context.store.select(|s| s.auth.is_authenticated)
        {
            let credentials = &config.demo_credentials;
            thunks
                .login(&credentials.email, &credentials.password, &cancel)
                .await;
        }

        thunks.fetch_todos(&cancel).await;
        let text = require_non_empty("Text", "Try the dispatch store")?;
        context.store.todos().dispatch(TodoCommand::add(text)).await;
        thunks
            .add_todo_async("Read the reducer", Priority::High, &cancel)
            .await;

        thunks.fetch_users(&cancel).await;
        thunks.update_user_status("2", true, &cancel).await;

        println!("# action-dispatch store");
        println!("{}", serde_yaml::to_string(&context.store.state())?);
        Ok(())
    }

    /// Walk through the closure stores.
    ///
    async fn run_closure(context: &AppContext) -> Result<()> {
        info!("Running the closure store walkthrough...");
        let cancel = CancelToken::new();
        context.keep(context.todos.subscribe_todos(|todos| {
            debug!("Todo list now holds {} items.", todos.len());
        }));

        context.counter.increment().await;
        context.counter.add_amount(5).await;

        context.todos.fetch_todos(&cancel).await;
        let text = require_non_empty("Text", "Try the closure stores")?;
        context.todos.add_todo(text).await;
        if let Some(first) = context.todos.todos().first() {
            context.todos.toggle_todo(&first.id).await;
        }
        context.todos.set_filter(TodoFilter::Active).await;

        context.users.fetch_users(&cancel).await;
        let (name, email) = validate_user("Dana White", "dana@example.com")?;
        context.users.add_user(name, email).await;
        context
            .users
            .update_user_settings(
                "1",
                SettingsPatch {
                    theme: Some(Theme::Dark),
                    ..SettingsPatch::default()
                },
            )
            .await;
        context.users.update_user_async("2", true, &cancel).await;

        let snapshot = ClosureSnapshot {
            counter: context.counter.snapshot(),
            todos: context.todos.snapshot(),
            users: context.users.snapshot(),
        };
        println!("# closure stores");
        println!("{}", serde_yaml::to_string(&snapshot)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Latency;
    use crate::storage::MemoryStorage;

    async fn context() -> anyhow::Result<AppContext> {
        let mut config = Config::new();
        config.latency = Latency::none();
        Ok(AppContext::new(&config, Arc::new(MemoryStorage::new())).await?)
    }

    #[test]
    fn test_family_from_str() {
        assert_eq!("closure".parse::<Family>().unwrap(), Family::Closure);
        assert!("both".parse::<Family>().unwrap().dispatch());
        assert!("redux".parse::<Family>().is_err());
    }

    #[tokio::test]
    async fn test_walkthroughs_leave_consistent_state() -> anyhow::Result<()> {
        let context = context().await?;
        App::run_dispatch(&context, &Config::new()).await?;
        App::run_closure(&context).await?;

        let state = context.store.state();
        assert!(state.auth.is_authenticated);
        assert_eq!(state.counter.value, 6);
        assert_eq!(state.todos.items.len(), 4);
        assert!(state.users.find("2").unwrap().is_active);

        assert_eq!(context.counter.value(), 6);
        assert_eq!(context.users.user_count(), 5);
        assert_eq!(context.users.users()[0].settings.theme, Theme::Dark);
        Ok(())
    }

    #[tokio::test]
    async fn test_shutdown_drops_subscriptions() -> anyhow::Result<()> {
        let context = context().await?;
        context.keep(context.store.subscribe(|_, _| {}));
        context.keep(context.todos.subscribe_todos(|_| {}));
        assert_eq!(context.store.subscriber_count(), 1);
        context.shutdown();
        assert_eq!(context.store.subscriber_count(), 0);
        assert_eq!(context.todos.store().subscriber_count(), 0);
        Ok(())
    }
}
