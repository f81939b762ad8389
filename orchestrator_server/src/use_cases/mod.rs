// Use cases layer: application workflows for the orchestrator.

pub mod games;
pub mod roster;
pub mod start_button;
pub mod state_machine;
pub mod technical;

#[cfg(test)]
pub(crate) mod test_support;

pub use games::{AnnounceError, CoinUpdate, GameService};
pub use roster::{PositionAssignment, RosterError, RosterService};
pub use start_button::refresh_start_button;
pub use state_machine::{GameStateMachine, Outcome, Rejection, TransitionError, run_game_events};
pub use technical::{TechnicalEventHandler, run_technical_events};
