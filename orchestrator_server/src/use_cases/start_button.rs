use tracing::{debug, warn};

use crate::domain::notifications::OperatorEvent;
use crate::domain::ports::Notifier;
use crate::use_cases::games::GameService;

// Re-evaluates the operator's start button and pushes its new state.
pub async fn refresh_start_button(games: &GameService, notifier: &dyn Notifier) -> Option<bool> {
    match games.start_button_enabled().await {
        Ok(enabled) => {
            debug!(enabled, "start button refreshed");
            notifier
                .notify_operator(OperatorEvent::start_button(enabled))
                .await;
            Some(enabled)
        }
        Err(err) => {
            warn!(error = %err, "failed to evaluate start button");
            None
        }
    }
}
