// Game aggregate workflows over the game and user stores.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::errors::StoreError;
use crate::domain::game::{Game, GameId, GameState};
use crate::domain::notifications::DashboardSignal;
use crate::domain::ports::{GameStore, UserStore};
use crate::domain::ranking::{Ranking, compute_ranking};
use crate::domain::user::User;

// Active human users needed before a round can be announced.
pub const MIN_ACTIVE_PLAYERS: usize = 3;

#[derive(Debug, Error)]
pub enum AnnounceError {
    #[error("a game already exists")]
    AlreadyExists,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of applying a coin drop to the current game.
#[derive(Debug, Clone, PartialEq)]
pub enum CoinUpdate {
    /// Negative value; nothing was written.
    Rejected,
    /// No slot carries the reported name; nothing was written.
    Unmatched,
    /// The slot already holds the reported value; nothing was written.
    Unchanged,
    Updated(Game),
}

#[derive(Clone)]
pub struct GameService {
    games: Arc<dyn GameStore>,
    users: Arc<dyn UserStore>,
    ranking_limit: usize,
}

impl GameService {
    pub fn new(games: Arc<dyn GameStore>, users: Arc<dyn UserStore>, ranking_limit: usize) -> Self {
        Self {
            games,
            users,
            ranking_limit,
        }
    }

    /// Announces a game for every active user and links the roster to it.
    pub async fn announce(&self) -> Result<Game, AnnounceError> {
        let roster = self.users.active().await?;
        let game = Game::announce(GameId::generate(), &roster);

        let Some(id) = self.games.create_if_absent(game.clone()).await? else {
            return Err(AnnounceError::AlreadyExists);
        };

        for user in &roster {
            if let Err(err) = self.users.set_game(&user.id, Some(&id)).await {
                warn!(game_id = %id, user = %user.display_name, error = %err, "failed to link user to game");
            }
        }

        info!(game_id = %id, roster = roster.len(), "game announced");
        Ok(game)
    }

    pub async fn current_game(&self) -> Result<Option<Game>, StoreError> {
        self.games.current().await
    }

    pub async fn update_state(&self, id: &GameId, state: GameState) -> Result<Game, StoreError> {
        self.games.update_state(id, state).await
    }

    pub async fn update_duration(&self, id: &GameId, duration: f64) -> Result<Game, StoreError> {
        self.games.update_duration(id, duration).await
    }

    /// Sets the coins of the slot whose player name matches `player`.
    pub async fn update_coins(
        &self,
        game: &Game,
        player: &str,
        coins: i64,
    ) -> Result<CoinUpdate, StoreError> {
        if coins < 0 {
            return Ok(CoinUpdate::Rejected);
        }
        let coins = u32::try_from(coins).unwrap_or(u32::MAX);

        let Some(slot) = game.find_slot(player) else {
            return Ok(CoinUpdate::Unmatched);
        };
        if game.coins(slot) == coins {
            return Ok(CoinUpdate::Unchanged);
        }
        let updated = self.games.update_coins(&game.id, slot, coins).await?;
        Ok(CoinUpdate::Updated(updated))
    }

    /// Severs the roster's association first, then deletes the game record.
    pub async fn remove_game(&self, id: &GameId) -> Result<bool, StoreError> {
        let roster = self.users.by_game(id).await?;
        for user in &roster {
            self.users.set_game(&user.id, None).await?;
        }

        let removed = self.games.remove(id).await?;
        if removed {
            info!(game_id = %id, "game removed");
        }
        Ok(removed)
    }

    /// Applies a finished round to every rostered user. Returns how many were updated.
    ///
    /// A failure for one user is logged and the remaining users are still processed.
    pub async fn record_statistics(
        &self,
        id: &GameId,
        duration: f64,
        winner: &str,
    ) -> Result<usize, StoreError> {
        let roster = self.users.by_game(id).await?;
        let mut updated = 0;
        for mut user in roster {
            user.record_result(duration, winner);
            match self.users.update_statistics(&user).await {
                Ok(()) => updated += 1,
                Err(err) => {
                    warn!(game_id = %id, user = %user.display_name, error = %err, "failed to update statistics");
                }
            }
        }
        Ok(updated)
    }

    pub async fn ranking(&self) -> Result<Vec<Ranking>, StoreError> {
        let users = self.users.all().await?;
        Ok(compute_ranking(&users, self.ranking_limit))
    }

    /// Ranking for a dashboard push; a store failure degrades to an empty list.
    pub async fn ranking_or_empty(&self) -> Vec<Ranking> {
        self.ranking().await.unwrap_or_else(|err| {
            warn!(error = %err, "failed to compute ranking");
            Vec::new()
        })
    }

    pub async fn dashboard_signal(&self) -> Result<DashboardSignal, StoreError> {
        let game = self.games.current().await?;
        let ranking = self.ranking().await?;
        Ok(DashboardSignal::new(game, ranking))
    }

    /// Recreates the computer player's user record with fresh statistics.
    ///
    /// Only records flagged as computer are replaced. A link to a running game survives.
    pub async fn ensure_computer_player(&self) -> Result<(), StoreError> {
        let previous = self.users.remove_computer().await?;
        let replaced = previous.is_some();
        let computer = User {
            game_id: previous.and_then(|user| user.game_id),
            ..User::computer()
        };
        self.users.insert(computer).await?;
        debug!(replaced, "computer player registered");
        Ok(())
    }

    pub async fn start_button_enabled(&self) -> Result<bool, StoreError> {
        if self.games.current().await?.is_some() {
            return Ok(false);
        }
        let humans = self
            .users
            .active()
            .await?
            .iter()
            .filter(|user| !user.is_computer)
            .count();
        Ok(humans >= MIN_ACTIVE_PLAYERS)
    }
}
