use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::errors::StoreError;
use crate::domain::game::{CoinSlot, Game, GameId, GameState};
use crate::domain::ports::{GameStore, UserStore};
use crate::domain::user::{User, UserState};

// In-memory game store; check-and-insert runs under one lock.
#[derive(Clone, Default)]
pub struct InMemoryGameStore {
    game: Arc<Mutex<Option<Game>>>,
}

impl InMemoryGameStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Synchronous fixture access; only valid while no store call is in flight.
    #[cfg(test)]
    pub(crate) fn seed(&self, game: Option<Game>) {
        *self.game.try_lock().expect("game store busy") = game;
    }

    #[cfg(test)]
    pub(crate) fn peek(&self) -> Option<Game> {
        self.game.try_lock().expect("game store busy").clone()
    }

    async fn mutate(
        &self,
        id: &GameId,
        apply: impl FnOnce(&mut Game) + Send,
    ) -> Result<Game, StoreError> {
        let mut game = self.game.lock().await;
        match game.as_mut() {
            Some(current) if current.id == *id => {
                apply(current);
                Ok(current.clone())
            }
            _ => Err(StoreError::GameNotFound(id.clone())),
        }
    }
}

#[async_trait]
impl GameStore for InMemoryGameStore {
    async fn create_if_absent(&self, game: Game) -> Result<Option<GameId>, StoreError> {
        let mut current = self.game.lock().await;
        if current.is_some() {
            return Ok(None);
        }
        let id = game.id.clone();
        *current = Some(game);
        Ok(Some(id))
    }

    async fn current(&self) -> Result<Option<Game>, StoreError> {
        Ok(self.game.lock().await.clone())
    }

    async fn update_state(&self, id: &GameId, state: GameState) -> Result<Game, StoreError> {
        self.mutate(id, |game| game.state = state).await
    }

    async fn update_duration(&self, id: &GameId, duration: f64) -> Result<Game, StoreError> {
        self.mutate(id, |game| game.duration = Some(duration)).await
    }

    async fn update_coins(
        &self,
        id: &GameId,
        slot: CoinSlot,
        coins: u32,
    ) -> Result<Game, StoreError> {
        self.mutate(id, |game| {
            if let Some(player) = game.slot_mut(slot) {
                player.coins = coins;
            }
        })
        .await
    }

    async fn remove(&self, id: &GameId) -> Result<bool, StoreError> {
        let mut current = self.game.lock().await;
        if current.as_ref().is_some_and(|game| game.id == *id) {
            *current = None;
            return Ok(true);
        }
        Ok(false)
    }
}

// In-memory user registry; keeps insertion order for stable rankings.
#[derive(Clone, Default)]
pub struct InMemoryUserStore {
    users: Arc<Mutex<Vec<User>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: Vec<User>) -> Self {
        Self {
            users: Arc::new(Mutex::new(users)),
        }
    }

    #[cfg(test)]
    pub(crate) fn peek(&self) -> Vec<User> {
        self.users.try_lock().expect("user store busy").clone()
    }

    async fn update_user(
        &self,
        user_id: &str,
        apply: impl FnOnce(&mut User) + Send,
    ) -> Result<(), StoreError> {
        let mut users = self.users.lock().await;
        let user = users
            .iter_mut()
            .find(|user| user.id == user_id)
            .ok_or_else(|| StoreError::UserNotFound(user_id.to_string()))?;
        apply(user);
        Ok(())
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn all(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.users.lock().await.clone())
    }

    async fn active(&self) -> Result<Vec<User>, StoreError> {
        let users = self.users.lock().await;
        Ok(users
            .iter()
            .filter(|user| user.state == UserState::Active)
            .cloned()
            .collect())
    }

    async fn by_game(&self, game_id: &GameId) -> Result<Vec<User>, StoreError> {
        let users = self.users.lock().await;
        Ok(users
            .iter()
            .filter(|user| user.game_id.as_ref() == Some(game_id))
            .cloned()
            .collect())
    }

    async fn set_game(&self, user_id: &str, game_id: Option<&GameId>) -> Result<(), StoreError> {
        let game_id = game_id.cloned();
        self.update_user(user_id, |user| user.game_id = game_id)
            .await
    }

    async fn update_statistics(&self, user: &User) -> Result<(), StoreError> {
        let (played, won, best) = (user.played_games, user.games_won, user.best_duration);
        self.update_user(&user.id, |stored| {
            stored.played_games = played;
            stored.games_won = won;
            stored.best_duration = best;
        })
        .await
    }

    async fn set_state(&self, user_id: &str, state: UserState) -> Result<(), StoreError> {
        self.update_user(user_id, |user| user.state = state).await
    }

    async fn set_position(&self, user_id: &str, position: Option<u8>) -> Result<(), StoreError> {
        self.update_user(user_id, |user| user.position = position)
            .await
    }

    async fn set_all_waiting(&self) -> Result<u64, StoreError> {
        let mut users = self.users.lock().await;
        let mut matched = 0;
        for user in users.iter_mut().filter(|user| !user.is_computer) {
            user.state = UserState::Waiting;
            matched += 1;
        }
        Ok(matched)
    }

    async fn insert(&self, user: User) -> Result<(), StoreError> {
        self.users.lock().await.push(user);
        Ok(())
    }

    async fn remove_computer(&self) -> Result<Option<User>, StoreError> {
        let mut users = self.users.lock().await;
        let removed = users.iter().find(|user| user.is_computer).cloned();
        users.retain(|user| !user.is_computer);
        Ok(removed)
    }
}
