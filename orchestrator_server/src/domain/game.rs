// Game aggregate: lifecycle state, roster slots and coin bookkeeping.

use crate::domain::user::User;
use serde::{Deserialize, Serialize};
use std::fmt;

// Fixed display name of the computer-controlled player.
pub const COMPUTER_PLAYER_NAME: &str = "Louki";
// Coins every occupied slot starts a round with.
pub const STARTING_COINS: u32 = 3;

/// Opaque identifier assigned when a game is announced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(String);

impl GameId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for GameId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle states of a round. `Finished` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameState {
    Announced,
    Ready,
    Active,
    Finished,
}

impl GameState {
    pub const ALL: [GameState; 4] = [
        GameState::Announced,
        GameState::Ready,
        GameState::Active,
        GameState::Finished,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            GameState::Announced => "announced",
            GameState::Ready => "ready",
            GameState::Active => "active",
            GameState::Finished => "finished",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|state| state.as_str() == value)
    }

    // Spectators only see a game once the device has confirmed the players.
    pub fn is_public(self) -> bool {
        matches!(self, GameState::Active | GameState::Finished)
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Device events that can move a game through its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    PlayersCanBeReceived,
    PlayersConfirm,
    GameDone,
    CoinDrop,
}

impl Trigger {
    pub const ALL: [Trigger; 4] = [
        Trigger::PlayersCanBeReceived,
        Trigger::PlayersConfirm,
        Trigger::GameDone,
        Trigger::CoinDrop,
    ];

    /// The only state in which the trigger is legal.
    pub fn required_state(self) -> GameState {
        match self {
            Trigger::PlayersCanBeReceived => GameState::Announced,
            Trigger::PlayersConfirm => GameState::Ready,
            Trigger::GameDone | Trigger::CoinDrop => GameState::Active,
        }
    }

    /// State after the trigger was applied; `None` when the state does not change.
    pub fn target_state(self) -> Option<GameState> {
        match self {
            Trigger::PlayersCanBeReceived => Some(GameState::Ready),
            Trigger::PlayersConfirm => Some(GameState::Active),
            Trigger::GameDone => Some(GameState::Finished),
            Trigger::CoinDrop => None,
        }
    }

    pub fn accepts(self, state: GameState) -> bool {
        self.required_state() == state
    }
}

/// Addressable coin counters of a game, used for point updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoinSlot {
    Player1,
    Player2,
    Player3,
    Computer,
}

impl CoinSlot {
    pub const HUMAN: [CoinSlot; 3] = [CoinSlot::Player1, CoinSlot::Player2, CoinSlot::Player3];

    pub fn from_position(position: u8) -> Option<Self> {
        match position {
            1 => Some(CoinSlot::Player1),
            2 => Some(CoinSlot::Player2),
            3 => Some(CoinSlot::Player3),
            _ => None,
        }
    }

    fn human_index(self) -> Option<usize> {
        match self {
            CoinSlot::Player1 => Some(0),
            CoinSlot::Player2 => Some(1),
            CoinSlot::Player3 => Some(2),
            CoinSlot::Computer => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerSlot {
    pub name: String,
    pub coins: u32,
}

impl PlayerSlot {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            coins: STARTING_COINS,
        }
    }
}

/// Coin counters of all four slots; empty human slots count as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CoinSnapshot {
    pub computer: u32,
    pub player1: u32,
    pub player2: u32,
    pub player3: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Game {
    pub id: GameId,
    pub state: GameState,
    // Elapsed seconds of the round, unset until the device reports GAME_DONE.
    pub duration: Option<f64>,
    pub players: [Option<PlayerSlot>; 3],
    pub computer: PlayerSlot,
}

impl Game {
    /// Builds a freshly announced game, seating each user at their requested position.
    ///
    /// Users without a position 1-3 (the computer player, unassigned users) get no human slot.
    /// When two users request the same position the later one wins.
    pub fn announce(id: GameId, roster: &[User]) -> Self {
        let mut players: [Option<PlayerSlot>; 3] = [None, None, None];
        for user in roster {
            let index = user
                .position
                .and_then(CoinSlot::from_position)
                .and_then(CoinSlot::human_index);
            if let Some(index) = index {
                players[index] = Some(PlayerSlot::new(user.display_name.clone()));
            }
        }

        Self {
            id,
            state: GameState::Announced,
            duration: None,
            players,
            computer: PlayerSlot::new(COMPUTER_PLAYER_NAME),
        }
    }

    pub fn slot(&self, slot: CoinSlot) -> Option<&PlayerSlot> {
        match slot.human_index() {
            Some(index) => self.players[index].as_ref(),
            None => Some(&self.computer),
        }
    }

    pub fn slot_mut(&mut self, slot: CoinSlot) -> Option<&mut PlayerSlot> {
        match slot.human_index() {
            Some(index) => self.players[index].as_mut(),
            None => Some(&mut self.computer),
        }
    }

    pub fn coins(&self, slot: CoinSlot) -> u32 {
        self.slot(slot).map(|player| player.coins).unwrap_or(0)
    }

    pub fn coin_snapshot(&self) -> CoinSnapshot {
        CoinSnapshot {
            computer: self.coins(CoinSlot::Computer),
            player1: self.coins(CoinSlot::Player1),
            player2: self.coins(CoinSlot::Player2),
            player3: self.coins(CoinSlot::Player3),
        }
    }

    /// Human display names in slot order; empty slots yield an empty name.
    pub fn human_names(&self) -> Vec<String> {
        self.players
            .iter()
            .map(|slot| slot.as_ref().map(|p| p.name.clone()).unwrap_or_default())
            .collect()
    }

    /// Finds the slot whose player name matches case-insensitively.
    ///
    /// Human slots are checked before the computer slot.
    pub fn find_slot(&self, player_name: &str) -> Option<CoinSlot> {
        CoinSlot::HUMAN
            .into_iter()
            .chain(std::iter::once(CoinSlot::Computer))
            .find(|slot| {
                self.slot(*slot)
                    .is_some_and(|player| names_match(&player.name, player_name))
            })
    }
}

/// Case-insensitive display name comparison used for coin drops and winners.
pub fn names_match(left: &str, right: &str) -> bool {
    left.to_lowercase() == right.to_lowercase()
}
