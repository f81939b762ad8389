// Notification payloads for the operator panel and the spectator dashboard.

use crate::domain::game::{CoinSnapshot, Game, GameState};
use crate::domain::ranking::Ranking;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorEventKind {
    StateAnnounced,
    StateReady,
    StateActive,
    StateFinished,
    SideChangePrompt,
    EnableStartButton,
    DisableStartButton,
}

// Operator notification emitted for each game state. Checked at startup by
// `validate_state_notifications`.
const STATE_NOTIFICATIONS: [(GameState, OperatorEventKind); 4] = [
    (GameState::Announced, OperatorEventKind::StateAnnounced),
    (GameState::Ready, OperatorEventKind::StateReady),
    (GameState::Active, OperatorEventKind::StateActive),
    (GameState::Finished, OperatorEventKind::StateFinished),
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MappingError {
    #[error("game state {0} has no operator notification")]
    Missing(GameState),
    #[error("game state {0} maps to more than one operator notification")]
    Duplicate(GameState),
}

/// Ensures every game state maps to exactly one operator notification.
pub fn validate_state_notifications() -> Result<(), MappingError> {
    for state in GameState::ALL {
        match STATE_NOTIFICATIONS.iter().filter(|(s, _)| *s == state).count() {
            0 => return Err(MappingError::Missing(state)),
            1 => {}
            _ => return Err(MappingError::Duplicate(state)),
        }
    }
    Ok(())
}

pub fn operator_kind_for(state: GameState) -> Option<OperatorEventKind> {
    STATE_NOTIFICATIONS
        .iter()
        .find(|(s, _)| *s == state)
        .map(|(_, kind)| *kind)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorEvent {
    pub kind: OperatorEventKind,
    pub coins: Option<CoinSnapshot>,
}

impl OperatorEvent {
    /// Mirrors the game's current state and coin counters.
    pub fn for_game(game: &Game) -> Option<Self> {
        operator_kind_for(game.state).map(|kind| Self {
            kind,
            coins: Some(game.coin_snapshot()),
        })
    }

    pub fn side_change_prompt() -> Self {
        Self {
            kind: OperatorEventKind::SideChangePrompt,
            coins: None,
        }
    }

    pub fn start_button(enabled: bool) -> Self {
        let kind = if enabled {
            OperatorEventKind::EnableStartButton
        } else {
            OperatorEventKind::DisableStartButton
        };
        Self { kind, coins: None }
    }
}

/// Snapshot pushed to the public dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSignal {
    // Hidden while the game is announced or waiting for the device.
    pub game: Option<Game>,
    pub ranking: Vec<Ranking>,
}

impl DashboardSignal {
    pub fn new(game: Option<Game>, ranking: Vec<Ranking>) -> Self {
        Self {
            game: game.filter(|game| game.state.is_public()),
            ranking,
        }
    }

    pub fn without_game(ranking: Vec<Ranking>) -> Self {
        Self {
            game: None,
            ranking,
        }
    }
}
