use std::sync::Arc;

use crate::interface_adapters::fanout::UiNotifier;
use crate::use_cases::{GameService, RosterService, TechnicalEventHandler};

#[derive(Clone)]
pub struct AppState {
    // Game aggregate shared with the event consumers.
    pub games: GameService,
    // Operator roster edits: availability and requested slots.
    pub roster: RosterService,
    // Connection registries for the operator panel and the dashboard.
    pub notifier: Arc<UiNotifier>,
    // Publishes operator side change confirmations.
    pub technical: TechnicalEventHandler,
}
