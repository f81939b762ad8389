// Operator HTTP actions and shared JSON error payloads.

use crate::domain::errors::StoreError;
use crate::domain::game::GameId;
use crate::domain::notifications::DashboardSignal;
use crate::domain::ports::Notifier;
use crate::domain::user::{User, UserState};
use crate::interface_adapters::protocol::render_side_change_cleared;
use crate::interface_adapters::state::AppState;
use crate::use_cases::{AnnounceError, PositionAssignment, RosterError, refresh_start_button};

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse},
};
use std::sync::Arc;
use tracing::{error, warn};

#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    // Human-readable error string for consistent JSON error responses.
    pub error: String,
}

#[derive(Debug, serde::Serialize)]
struct CreateGameResponse {
    game_id: String,
}

#[derive(Debug, serde::Serialize)]
struct UserView {
    id: String,
    display_name: String,
    state: UserState,
    position: Option<u8>,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            display_name: user.display_name,
            state: user.state,
            position: user.position,
        }
    }
}

#[derive(Debug, serde::Serialize)]
struct UsersResponse {
    users: Vec<UserView>,
}

#[derive(Debug, serde::Deserialize)]
pub struct StateChanges {
    users: Vec<StateChange>,
}

#[derive(Debug, serde::Deserialize)]
struct StateChange {
    id: String,
    state: UserState,
}

#[derive(Debug, serde::Deserialize)]
pub struct PositionChanges {
    users: Vec<PositionChange>,
}

#[derive(Debug, serde::Deserialize)]
struct PositionChange {
    id: String,
    position: Option<u8>,
}

#[derive(Debug, serde::Serialize)]
struct AssignmentView {
    id: String,
    display_name: String,
    position: u8,
}

impl From<PositionAssignment> for AssignmentView {
    fn from(assignment: PositionAssignment) -> Self {
        Self {
            id: assignment.user_id,
            display_name: assignment.display_name,
            position: assignment.position,
        }
    }
}

#[derive(Debug, serde::Serialize)]
struct ShuffleResponse {
    assignments: Vec<AssignmentView>,
}

#[derive(Debug, serde::Serialize)]
struct HealthResponse {
    status: &'static str,
}

fn error_response(status: StatusCode, message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

pub async fn create_game_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.games.announce().await {
        Ok(game) => {
            refresh_start_button(&state.games, state.notifier.as_ref()).await;
            (
                StatusCode::CREATED,
                Json(CreateGameResponse {
                    game_id: game.id.to_string(),
                }),
            )
                .into_response()
        }
        Err(AnnounceError::AlreadyExists) => {
            error_response(StatusCode::CONFLICT, "game already exists").into_response()
        }
        Err(AnnounceError::Store(err)) => {
            error!(error = %err, "failed to announce game");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to announce game")
                .into_response()
        }
    }
}

pub async fn remove_game_handler(
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<String>,
) -> impl IntoResponse {
    let game_id = GameId::from(game_id);
    match state.games.remove_game(&game_id).await {
        Ok(true) => {
            let ranking = state.games.ranking_or_empty().await;
            state
                .notifier
                .notify_dashboard(DashboardSignal::without_game(ranking))
                .await;
            refresh_start_button(&state.games, state.notifier.as_ref()).await;
            StatusCode::NO_CONTENT.into_response()
        }
        Ok(false) => error_response(StatusCode::NOT_FOUND, "game not found").into_response(),
        Err(err) => {
            error!(game_id = %game_id, error = %err, "failed to remove game");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to remove game")
                .into_response()
        }
    }
}

pub async fn confirm_side_change_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.technical.confirm_side_change().await {
        // The operator page swaps the prompt out with this snippet.
        Ok(()) => Html(render_side_change_cleared()).into_response(),
        Err(err) => {
            warn!(error = %err, "failed to publish side change confirmation");
            error_response(StatusCode::BAD_GATEWAY, "failed to reach the device").into_response()
        }
    }
}

fn roster_error_response(err: RosterError) -> axum::response::Response {
    match err {
        RosterError::InvalidPosition(position) => error_response(
            StatusCode::BAD_REQUEST,
            &format!("position {position} is outside 1-3"),
        )
        .into_response(),
        RosterError::Store(StoreError::UserNotFound(id)) => {
            error_response(StatusCode::NOT_FOUND, &format!("user {id} not found")).into_response()
        }
        RosterError::Store(err) => {
            error!(error = %err, "failed to update roster");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to update roster")
                .into_response()
        }
    }
}

pub async fn list_users_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.roster.list().await {
        Ok(users) => Json(UsersResponse {
            users: users.into_iter().map(UserView::from).collect(),
        })
        .into_response(),
        Err(err) => {
            error!(error = %err, "failed to list users");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to list users")
                .into_response()
        }
    }
}

pub async fn update_states_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<StateChanges>,
) -> impl IntoResponse {
    let changes: Vec<(String, UserState)> = body
        .users
        .into_iter()
        .map(|change| (change.id, change.state))
        .collect();
    // Earlier entries stay applied when a later one fails.
    let result = state.roster.update_states(&changes).await;
    refresh_start_button(&state.games, state.notifier.as_ref()).await;
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => roster_error_response(err),
    }
}

pub async fn set_all_waiting_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.roster.set_all_waiting().await {
        Ok(_) => {
            refresh_start_button(&state.games, state.notifier.as_ref()).await;
            StatusCode::NO_CONTENT.into_response()
        }
        Err(err) => roster_error_response(RosterError::Store(err)),
    }
}

pub async fn update_positions_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PositionChanges>,
) -> impl IntoResponse {
    let changes: Vec<(String, Option<u8>)> = body
        .users
        .into_iter()
        .map(|change| (change.id, change.position))
        .collect();
    match state.roster.update_positions(&changes).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => roster_error_response(err),
    }
}

pub async fn shuffle_positions_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.roster.shuffle_positions().await {
        Ok(assignments) => Json(ShuffleResponse {
            assignments: assignments.into_iter().map(AssignmentView::from).collect(),
        })
        .into_response(),
        Err(err) => roster_error_response(RosterError::Store(err)),
    }
}

pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}
