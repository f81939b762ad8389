// Device-side events that never touch the game record.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::domain::errors::PublishError;
use crate::domain::events::{InboundEvent, OutboundEvent};
use crate::domain::notifications::OperatorEvent;
use crate::domain::ports::{EventPublisher, Notifier};
use crate::use_cases::state_machine::{Outcome, Rejection};

#[derive(Clone)]
pub struct TechnicalEventHandler {
    pub publisher: Arc<dyn EventPublisher>,
    pub notifier: Arc<dyn Notifier>,
}

impl TechnicalEventHandler {
    pub async fn handle(&self, event: InboundEvent) -> Outcome {
        match event {
            InboundEvent::PleaseChangeSide => {
                self.notifier
                    .notify_operator(OperatorEvent::side_change_prompt())
                    .await;
                Outcome::Processed
            }
            // Our own confirmation comes back on the shared topic.
            InboundEvent::ConfirmedChangeSide => Outcome::Processed,
            other => Outcome::NotProcessed(Rejection::UnexpectedEvent(other.kind())),
        }
    }

    /// Tells the device that the operator confirmed the side change.
    pub async fn confirm_side_change(&self) -> Result<(), PublishError> {
        self.publisher
            .publish(&[OutboundEvent::ConfirmedChangeSide])
            .await?;
        info!("side change confirmed");
        Ok(())
    }
}

pub async fn run_technical_events(
    mut events_rx: mpsc::Receiver<InboundEvent>,
    handler: TechnicalEventHandler,
) {
    while let Some(event) = events_rx.recv().await {
        let kind = event.kind().discriminant();
        match handler.handle(event).await {
            Outcome::Processed => debug!(event = kind, "technical event processed"),
            Outcome::NotProcessed(reason) => {
                warn!(event = kind, ?reason, "technical event not processed");
            }
        }
    }

    info!("technical event channel closed; consumer exiting");
}
