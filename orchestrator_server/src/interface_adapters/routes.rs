use crate::interface_adapters::http::{
    confirm_side_change_handler, create_game_handler, health_handler, list_users_handler,
    remove_game_handler, set_all_waiting_handler, shuffle_positions_handler,
    update_positions_handler, update_states_handler,
};
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::ws::{dashboard_ws_handler, operator_ws_handler};
use axum::{
    Router,
    routing::{delete, get, post, put},
};
use std::sync::Arc;

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(operator_ws_handler))
        .route("/ws/game", get(dashboard_ws_handler))
        .route("/games", post(create_game_handler))
        .route("/games/{game_id}", delete(remove_game_handler))
        .route("/confirm", post(confirm_side_change_handler))
        .route("/users", get(list_users_handler))
        .route("/users/state", put(update_states_handler))
        .route("/users/wait", put(set_all_waiting_handler))
        .route("/users/position", put(update_positions_handler))
        .route("/users/position/shuffle", put(shuffle_positions_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}
