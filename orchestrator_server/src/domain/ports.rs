use async_trait::async_trait;

use crate::domain::errors::{PublishError, StoreError};
use crate::domain::events::OutboundEvent;
use crate::domain::game::{CoinSlot, Game, GameId, GameState};
use crate::domain::notifications::{DashboardSignal, OperatorEvent};
use crate::domain::user::{User, UserState};

// Port for the single game record.
#[async_trait]
pub trait GameStore: Send + Sync {
    /// Stores `game` only when no game exists. Returns `None` when one already does.
    async fn create_if_absent(&self, game: Game) -> Result<Option<GameId>, StoreError>;
    async fn current(&self) -> Result<Option<Game>, StoreError>;
    async fn update_state(&self, id: &GameId, state: GameState) -> Result<Game, StoreError>;
    async fn update_duration(&self, id: &GameId, duration: f64) -> Result<Game, StoreError>;
    async fn update_coins(&self, id: &GameId, slot: CoinSlot, coins: u32)
    -> Result<Game, StoreError>;
    async fn remove(&self, id: &GameId) -> Result<bool, StoreError>;
}

// Port for the subset of the user registry the orchestrator touches.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn all(&self) -> Result<Vec<User>, StoreError>;
    async fn active(&self) -> Result<Vec<User>, StoreError>;
    async fn by_game(&self, game_id: &GameId) -> Result<Vec<User>, StoreError>;
    async fn set_game(&self, user_id: &str, game_id: Option<&GameId>) -> Result<(), StoreError>;
    async fn update_statistics(&self, user: &User) -> Result<(), StoreError>;
    async fn set_state(&self, user_id: &str, state: UserState) -> Result<(), StoreError>;
    async fn set_position(&self, user_id: &str, position: Option<u8>) -> Result<(), StoreError>;
    /// Moves every human user to waiting. Returns how many records matched.
    async fn set_all_waiting(&self) -> Result<u64, StoreError>;
    async fn insert(&self, user: User) -> Result<(), StoreError>;
    /// Deletes every computer player record and returns one of them, if any existed.
    async fn remove_computer(&self) -> Result<Option<User>, StoreError>;
}

// Port for writing events back onto the shared bus.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, events: &[OutboundEvent]) -> Result<(), PublishError>;
}

// Port for pushing notifications to connected UIs. Waits while queues are full.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_operator(&self, event: OperatorEvent);
    async fn notify_dashboard(&self, signal: DashboardSignal);
}

// Port for retrieving the current time.
pub trait Clock: Send + Sync {
    fn now_epoch_millis(&self) -> u64;
}
