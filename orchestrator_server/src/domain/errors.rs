use crate::domain::game::GameId;
use thiserror::Error;

// Failures reported by the game and user store adapters.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("game {0} not found")]
    GameNotFound(GameId),
    #[error("user {0} not found")]
    UserNotFound(String),
    #[error("store backend failure: {0}")]
    Backend(String),
}

// Failures while handing outbound events to the bus.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PublishError {
    #[error("failed to encode outbound event: {0}")]
    Encode(String),
    #[error("bus connection failed: {0}")]
    Connection(String),
    #[error("bus write failed: {0}")]
    Write(String),
}
