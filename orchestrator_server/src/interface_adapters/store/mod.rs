// Store adapters for the game and user ports.

pub mod memory;
pub mod postgres;

pub use memory::{InMemoryGameStore, InMemoryUserStore};
pub use postgres::{PostgresGameStore, PostgresUserStore};
