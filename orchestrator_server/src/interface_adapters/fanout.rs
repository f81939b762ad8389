// Per-connection queue registry for both UI channels.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use axum::extract::ws::Utf8Bytes;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, error};

use crate::domain::notifications::{DashboardSignal, OperatorEvent};
use crate::domain::ports::Notifier;
use crate::interface_adapters::protocol::{DashboardMessageDto, render_operator_event};

/// A registered connection's receiving end.
pub struct Subscription<T> {
    pub id: u64,
    pub rx: mpsc::Receiver<T>,
}

/// Delivers every message to every registered connection queue.
///
/// Queues are bounded; a full queue makes `broadcast` wait. Closed queues are dropped.
pub struct Broadcaster<T> {
    queues: RwLock<HashMap<u64, mpsc::Sender<T>>>,
    next_id: AtomicU64,
    capacity: usize,
}

impl<T: Clone> Broadcaster<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            queues: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            capacity,
        }
    }

    pub async fn subscribe(&self) -> Subscription<T> {
        let (tx, rx) = mpsc::channel(self.capacity);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.queues.write().await.insert(id, tx);
        Subscription { id, rx }
    }

    pub async fn unsubscribe(&self, id: u64) {
        self.queues.write().await.remove(&id);
    }

    pub async fn broadcast(&self, message: T) {
        // Clone the senders so no lock is held while waiting on a full queue.
        let queues: Vec<(u64, mpsc::Sender<T>)> = self
            .queues
            .read()
            .await
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect();

        let mut closed = Vec::new();
        for (id, tx) in queues {
            if tx.send(message.clone()).await.is_err() {
                closed.push(id);
            }
        }

        if !closed.is_empty() {
            let mut guard = self.queues.write().await;
            for id in closed {
                debug!(conn_id = id, "dropping closed ui queue");
                guard.remove(&id);
            }
        }
    }

    pub async fn connection_count(&self) -> usize {
        self.queues.read().await.len()
    }
}

/// Notifier that renders each notification once and fans the bytes out.
pub struct UiNotifier {
    pub operator: Broadcaster<Utf8Bytes>,
    pub dashboard: Broadcaster<Utf8Bytes>,
}

impl UiNotifier {
    pub fn new(operator_capacity: usize, dashboard_capacity: usize) -> Self {
        Self {
            operator: Broadcaster::new(operator_capacity),
            dashboard: Broadcaster::new(dashboard_capacity),
        }
    }
}

/// Serializes a dashboard signal for the wire.
pub fn dashboard_bytes(signal: &DashboardSignal) -> Result<Utf8Bytes, serde_json::Error> {
    serde_json::to_string(&DashboardMessageDto::from(signal)).map(Utf8Bytes::from)
}

#[async_trait]
impl Notifier for UiNotifier {
    async fn notify_operator(&self, event: OperatorEvent) {
        let html = render_operator_event(&event);
        self.operator.broadcast(Utf8Bytes::from(html)).await;
    }

    async fn notify_dashboard(&self, signal: DashboardSignal) {
        match dashboard_bytes(&signal) {
            Ok(bytes) => self.dashboard.broadcast(bytes).await,
            Err(e) => error!(error = ?e, "failed to serialize dashboard signal"),
        }
    }
}
