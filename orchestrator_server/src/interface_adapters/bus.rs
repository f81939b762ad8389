// Redis pub/sub adapter for the shared device event topic.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use redis::AsyncCommands;
use redis::aio::PubSub;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::domain::errors::PublishError;
use crate::domain::events::{EventClass, InboundEvent, OutboundEvent};
use crate::domain::ports::EventPublisher;
use crate::interface_adapters::protocol::{decode_bus_message, encode_bus_message};

/// Internal channels the subscription routes decoded events onto.
#[derive(Clone)]
pub struct BusChannels {
    pub game_tx: mpsc::Sender<InboundEvent>,
    pub technical_tx: mpsc::Sender<InboundEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    Routed(EventClass),
    Dropped,
    // The consumer behind the channel is gone.
    Closed,
}

/// Decodes one raw payload and forwards it to the matching consumer.
///
/// Waits while the target channel is full.
pub async fn route_message(raw: &str, channels: &BusChannels) -> RouteOutcome {
    let decoded = match decode_bus_message(raw) {
        Ok(decoded) => decoded,
        Err(err) => {
            warn!(error = %err, bytes = raw.len(), "dropping bus message");
            return RouteOutcome::Dropped;
        }
    };

    debug!(
        event = decoded.event.kind().discriminant(),
        sender = %decoded.sender,
        "bus message received"
    );
    let target = match decoded.class {
        EventClass::Game => &channels.game_tx,
        EventClass::Technical => &channels.technical_tx,
    };
    match target.send(decoded.event).await {
        Ok(()) => RouteOutcome::Routed(decoded.class),
        Err(_) => RouteOutcome::Closed,
    }
}

#[derive(Debug, Error)]
pub enum BusError {
    #[error("invalid bus url: {0}")]
    InvalidUrl(#[source] redis::RedisError),
    #[error("failed to subscribe to bus topic: {0}")]
    Subscribe(#[source] redis::RedisError),
}

#[derive(Clone)]
pub struct RedisBus {
    client: redis::Client,
    topic: String,
    publish_timeout: Duration,
}

impl RedisBus {
    pub fn new(
        redis_url: &str,
        topic: impl Into<String>,
        publish_timeout: Duration,
    ) -> Result<Self, BusError> {
        let client = redis::Client::open(redis_url).map_err(BusError::InvalidUrl)?;
        Ok(Self {
            client,
            topic: topic.into(),
            publish_timeout,
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Opens the single long-lived subscription on the topic.
    pub async fn subscribe(&self) -> Result<PubSub, BusError> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(BusError::Subscribe)?;
        pubsub
            .subscribe(&self.topic)
            .await
            .map_err(BusError::Subscribe)?;
        info!(topic = %self.topic, "bus subscription established");
        Ok(pubsub)
    }
}

#[async_trait]
impl EventPublisher for RedisBus {
    async fn publish(&self, events: &[OutboundEvent]) -> Result<(), PublishError> {
        let payloads = events
            .iter()
            .map(encode_bus_message)
            .collect::<Result<Vec<String>, _>>()
            .map_err(|e| PublishError::Encode(e.to_string()))?;

        // Short-lived connection per publish; dropped when this call returns.
        let mut conn = timeout(
            self.publish_timeout,
            self.client.get_multiplexed_async_connection(),
        )
        .await
        .map_err(|_| PublishError::Connection("timed out".to_string()))?
        .map_err(|e| PublishError::Connection(e.to_string()))?;

        for payload in payloads {
            timeout(
                self.publish_timeout,
                conn.publish::<_, _, ()>(&self.topic, payload),
            )
            .await
            .map_err(|_| PublishError::Write("timed out".to_string()))?
            .map_err(|e| PublishError::Write(e.to_string()))?;
        }

        debug!(topic = %self.topic, count = events.len(), "published bus events");
        Ok(())
    }
}

/// Reads the subscription in delivery order until shutdown is signalled.
///
/// The message being routed when shutdown arrives is finished first. Dropping `channels`
/// on return closes both consumer channels so they drain and exit.
pub async fn run_subscription(
    pubsub: PubSub,
    channels: BusChannels,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut messages = pubsub.into_on_message();

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    info!("bus subscription shutting down");
                    break;
                }
            }
            msg = messages.next() => {
                let Some(msg) = msg else {
                    warn!("bus subscription stream ended");
                    break;
                };
                let payload = match msg.get_payload::<String>() {
                    Ok(payload) => payload,
                    Err(err) => {
                        warn!(error = %err, "dropping non-utf8 bus payload");
                        continue;
                    }
                };
                if route_message(&payload, &channels).await == RouteOutcome::Closed {
                    warn!("event consumer closed; stopping bus subscription");
                    break;
                }
            }
        }
    }
}
