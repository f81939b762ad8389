// Domain layer: game lifecycle types and rules.

pub mod errors;
pub mod events;
pub mod game;
pub mod notifications;
pub mod ports;
pub mod ranking;
pub mod user;

pub use errors::{PublishError, StoreError};
pub use events::{EventClass, EventKind, InboundEvent, OutboundEvent};
pub use game::{CoinSlot, CoinSnapshot, Game, GameId, GameState, PlayerSlot, Trigger};
pub use notifications::{DashboardSignal, OperatorEvent, OperatorEventKind};
pub use ports::{Clock, EventPublisher, GameStore, Notifier, UserStore};
pub use ranking::{Ranking, compute_ranking};
pub use user::{User, UserState};
