// WebSocket endpoints for the operator panel and the spectator dashboard.

use crate::interface_adapters::fanout::{Broadcaster, Subscription, dashboard_bytes};
use crate::interface_adapters::state::AppState;

use axum::{
    extract::{
        State,
        ws::{Message, Utf8Bytes, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{Instrument, debug, info, info_span, warn};

pub async fn operator_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| serve_operator(socket, state))
}

pub async fn dashboard_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| serve_dashboard(socket, state))
}

async fn serve_operator(socket: WebSocket, state: Arc<AppState>) {
    let subscription = state.notifier.operator.subscribe().await;
    let span = info_span!("conn", conn_id = subscription.id, channel = "operator");
    run_connection(socket, subscription, None, &state.notifier.operator)
        .instrument(span)
        .await;
}

async fn serve_dashboard(socket: WebSocket, state: Arc<AppState>) {
    // Register first so no update between the snapshot and the first broadcast is lost.
    let subscription = state.notifier.dashboard.subscribe().await;
    let span = info_span!("conn", conn_id = subscription.id, channel = "dashboard");

    let initial = match state.games.dashboard_signal().await {
        Ok(signal) => dashboard_bytes(&signal)
            .inspect_err(|e| warn!(error = ?e, "failed to serialize initial dashboard signal"))
            .ok(),
        Err(err) => {
            warn!(error = %err, "failed to load initial dashboard signal");
            None
        }
    };

    run_connection(socket, subscription, initial, &state.notifier.dashboard)
        .instrument(span)
        .await;
}

/// Drives one UI connection: a write loop draining its queue and a read loop that only
/// watches for the peer going away. Whichever ends first stops the other.
async fn run_connection(
    socket: WebSocket,
    subscription: Subscription<Utf8Bytes>,
    initial: Option<Utf8Bytes>,
    broadcaster: &Broadcaster<Utf8Bytes>,
) {
    let Subscription { id, mut rx } = subscription;
    let (mut sender, mut receiver) = socket.split();
    info!("ui client connected");

    let mut write_loop = tokio::spawn(
        async move {
            let mut msgs_out: u64 = 0;
            if let Some(bytes) = initial {
                if sender.send(Message::Text(bytes)).await.is_err() {
                    return msgs_out;
                }
                msgs_out += 1;
            }
            while let Some(bytes) = rx.recv().await {
                if let Err(err) = sender.send(Message::Text(bytes)).await {
                    debug!(error = %err, "ui send failed");
                    break;
                }
                msgs_out += 1;
            }
            let _ = sender.close().await;
            msgs_out
        }
        .in_current_span(),
    );

    let mut read_loop = tokio::spawn(
        async move {
            while let Some(incoming) = receiver.next().await {
                match incoming {
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(err) => {
                        debug!(error = %err, "ui recv error");
                        break;
                    }
                }
            }
        }
        .in_current_span(),
    );

    tokio::select! {
        sent = &mut write_loop => {
            read_loop.abort();
            debug!(msgs_out = sent.unwrap_or_default(), "write loop finished");
        }
        _ = &mut read_loop => {
            write_loop.abort();
        }
    }

    broadcaster.unsubscribe(id).await;
    info!("ui client disconnected");
}
