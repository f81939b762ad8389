// Registered user record as far as game orchestration is concerned.

use crate::domain::game::{COMPUTER_PLAYER_NAME, GameId, names_match};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserState {
    Active,
    Waiting,
}

impl UserState {
    pub fn as_str(self) -> &'static str {
        match self {
            UserState::Active => "active",
            UserState::Waiting => "waiting",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(UserState::Active),
            "waiting" => Some(UserState::Waiting),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub display_name: String,
    // Game the user is currently rostered for.
    pub game_id: Option<GameId>,
    // Requested human slot (1-3).
    pub position: Option<u8>,
    pub state: UserState,
    pub played_games: u32,
    pub games_won: u32,
    // Fastest finished round in seconds, unset until the first game is done.
    pub best_duration: Option<f64>,
    pub is_computer: bool,
}

impl User {
    /// Creates a waiting user without statistics.
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            display_name: display_name.into(),
            game_id: None,
            position: None,
            state: UserState::Waiting,
            played_games: 0,
            games_won: 0,
            best_duration: None,
            is_computer: false,
        }
    }

    /// The computer-controlled player is always active so it joins every roster.
    pub fn computer() -> Self {
        Self {
            state: UserState::Active,
            is_computer: true,
            ..Self::new(COMPUTER_PLAYER_NAME)
        }
    }

    /// Applies the outcome of a finished round to the user's statistics.
    pub fn record_result(&mut self, duration: f64, winner: &str) {
        let improved = self.best_duration.is_none_or(|best| duration < best);
        if improved {
            self.best_duration = Some(duration);
        }
        if names_match(&self.display_name, winner) {
            self.games_won += 1;
        }
        self.played_games += 1;
    }
}
