use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::errors::{PublishError, StoreError};
use crate::domain::events::OutboundEvent;
use crate::domain::game::{CoinSlot, Game, GameId, GameState};
use crate::domain::notifications::{DashboardSignal, OperatorEvent};
use crate::domain::ports::{Clock, EventPublisher, GameStore, Notifier, UserStore};
use crate::domain::user::{User, UserState};
use crate::interface_adapters::store::{InMemoryGameStore, InMemoryUserStore};

// Shared fixed time source for deterministic use-case tests.
pub(crate) struct FixedClock(pub(crate) u64);

impl Clock for FixedClock {
    fn now_epoch_millis(&self) -> u64 {
        self.0
    }
}

#[derive(Clone, Default)]
pub(crate) struct FailureFlags {
    pub current: bool,
    pub update_state: bool,
    pub update_duration: bool,
    pub by_game: bool,
    // Statistics updates fail for this display name only.
    pub statistics_for: Option<String>,
}

// In-memory game store with switchable failures.
#[derive(Clone)]
pub(crate) struct RecordingGames {
    store: InMemoryGameStore,
    failures: FailureFlags,
}

impl RecordingGames {
    pub(crate) fn new() -> Self {
        Self {
            store: InMemoryGameStore::new(),
            failures: FailureFlags::default(),
        }
    }

    pub(crate) fn with_failures(mut self, failures: FailureFlags) -> Self {
        self.failures = failures;
        self
    }

    pub(crate) fn insert_test_game(&self, game: Game) {
        self.store.seed(Some(game));
    }

    pub(crate) fn get_test_game(&self) -> Option<Game> {
        self.store.peek()
    }
}

#[async_trait]
impl GameStore for RecordingGames {
    async fn create_if_absent(&self, game: Game) -> Result<Option<GameId>, StoreError> {
        self.store.create_if_absent(game).await
    }

    async fn current(&self) -> Result<Option<Game>, StoreError> {
        if self.failures.current {
            return Err(StoreError::Backend("current failed".to_string()));
        }
        self.store.current().await
    }

    async fn update_state(&self, id: &GameId, state: GameState) -> Result<Game, StoreError> {
        if self.failures.update_state {
            return Err(StoreError::Backend("update_state failed".to_string()));
        }
        self.store.update_state(id, state).await
    }

    async fn update_duration(&self, id: &GameId, duration: f64) -> Result<Game, StoreError> {
        if self.failures.update_duration {
            return Err(StoreError::Backend("update_duration failed".to_string()));
        }
        self.store.update_duration(id, duration).await
    }

    async fn update_coins(
        &self,
        id: &GameId,
        slot: CoinSlot,
        coins: u32,
    ) -> Result<Game, StoreError> {
        self.store.update_coins(id, slot, coins).await
    }

    async fn remove(&self, id: &GameId) -> Result<bool, StoreError> {
        self.store.remove(id).await
    }
}

// In-memory user registry with switchable failures.
#[derive(Clone)]
pub(crate) struct RecordingUsers {
    store: InMemoryUserStore,
    failures: FailureFlags,
}

impl RecordingUsers {
    pub(crate) fn new(users: Vec<User>) -> Self {
        Self {
            store: InMemoryUserStore::with_users(users),
            failures: FailureFlags::default(),
        }
    }

    pub(crate) fn with_failures(mut self, failures: FailureFlags) -> Self {
        self.failures = failures;
        self
    }

    pub(crate) fn get_test_user(&self, display_name: &str) -> Option<User> {
        self.snapshot()
            .into_iter()
            .find(|u| u.display_name == display_name)
    }

    pub(crate) fn snapshot(&self) -> Vec<User> {
        self.store.peek()
    }
}

#[async_trait]
impl UserStore for RecordingUsers {
    async fn all(&self) -> Result<Vec<User>, StoreError> {
        self.store.all().await
    }

    async fn active(&self) -> Result<Vec<User>, StoreError> {
        self.store.active().await
    }

    async fn by_game(&self, game_id: &GameId) -> Result<Vec<User>, StoreError> {
        if self.failures.by_game {
            return Err(StoreError::Backend("by_game failed".to_string()));
        }
        self.store.by_game(game_id).await
    }

    async fn set_game(&self, user_id: &str, game_id: Option<&GameId>) -> Result<(), StoreError> {
        self.store.set_game(user_id, game_id).await
    }

    async fn update_statistics(&self, user: &User) -> Result<(), StoreError> {
        if self.failures.statistics_for.as_deref() == Some(user.display_name.as_str()) {
            return Err(StoreError::Backend("update_statistics failed".to_string()));
        }
        self.store.update_statistics(user).await
    }

    async fn set_state(&self, user_id: &str, state: UserState) -> Result<(), StoreError> {
        self.store.set_state(user_id, state).await
    }

    async fn set_position(&self, user_id: &str, position: Option<u8>) -> Result<(), StoreError> {
        self.store.set_position(user_id, position).await
    }

    async fn set_all_waiting(&self) -> Result<u64, StoreError> {
        self.store.set_all_waiting().await
    }

    async fn insert(&self, user: User) -> Result<(), StoreError> {
        self.store.insert(user).await
    }

    async fn remove_computer(&self) -> Result<Option<User>, StoreError> {
        self.store.remove_computer().await
    }
}

#[derive(Clone, Default)]
pub(crate) struct RecordingPublisher {
    published: Arc<Mutex<Vec<OutboundEvent>>>,
    fail: bool,
}

impl RecordingPublisher {
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub(crate) fn published(&self) -> Vec<OutboundEvent> {
        self.published.lock().expect("publisher mutex poisoned").clone()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, events: &[OutboundEvent]) -> Result<(), PublishError> {
        if self.fail {
            return Err(PublishError::Connection("bus unreachable".to_string()));
        }
        self.published
            .lock()
            .expect("publisher mutex poisoned")
            .extend_from_slice(events);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub(crate) struct RecordingNotifier {
    operator: Arc<Mutex<Vec<OperatorEvent>>>,
    dashboard: Arc<Mutex<Vec<DashboardSignal>>>,
}

impl RecordingNotifier {
    pub(crate) fn operator_events(&self) -> Vec<OperatorEvent> {
        self.operator.lock().expect("notifier mutex poisoned").clone()
    }

    pub(crate) fn dashboard_signals(&self) -> Vec<DashboardSignal> {
        self.dashboard.lock().expect("notifier mutex poisoned").clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify_operator(&self, event: OperatorEvent) {
        self.operator
            .lock()
            .expect("notifier mutex poisoned")
            .push(event);
    }

    async fn notify_dashboard(&self, signal: DashboardSignal) {
        self.dashboard
            .lock()
            .expect("notifier mutex poisoned")
            .push(signal);
    }
}

// Active human user requesting the given slot.
pub(crate) fn active_user(name: &str, position: u8) -> User {
    User {
        position: Some(position),
        state: UserState::Active,
        ..User::new(name)
    }
}
