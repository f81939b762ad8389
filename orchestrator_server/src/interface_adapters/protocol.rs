// Wire protocol DTOs for the event bus and both UI channels.

use crate::domain::events::{EventClass, EventKind, InboundEvent, OutboundEvent};
use crate::domain::game::Game;
use crate::domain::notifications::{DashboardSignal, OperatorEvent, OperatorEventKind};
use crate::domain::ranking::Ranking;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Wire value for an unset duration.
const UNSET_DURATION: i64 = -1;

/// Minimal envelope every bus message carries.
#[derive(Debug, Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    sender: String,
}

#[derive(Debug, Deserialize)]
struct GameDonePayload {
    duration: f64,
    winning_player: WinningPlayer,
}

#[derive(Debug, Deserialize)]
struct WinningPlayer {
    name: String,
}

#[derive(Debug, Deserialize)]
struct CoinDropPayload {
    name: String,
    coins: i64,
}

/// Decoded bus message ready for routing.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedMessage {
    pub class: EventClass,
    pub sender: String,
    pub event: InboundEvent,
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("message is not a valid event envelope: {0}")]
    Envelope(serde_json::Error),
    #[error("unknown event discriminant {0:?}")]
    UnknownEvent(String),
    #[error("invalid {event} payload: {source}")]
    Payload {
        event: &'static str,
        source: serde_json::Error,
    },
    #[error("invalid {event} payload: {reason}")]
    InvalidField {
        event: &'static str,
        reason: &'static str,
    },
}

/// Decodes a raw bus payload far enough to classify and route it.
pub fn decode_bus_message(raw: &str) -> Result<DecodedMessage, DecodeError> {
    let envelope: Envelope = serde_json::from_str(raw).map_err(DecodeError::Envelope)?;
    let kind = EventKind::from_discriminant(&envelope.event)
        .ok_or_else(|| DecodeError::UnknownEvent(envelope.event.clone()))?;

    let payload_error = |source| DecodeError::Payload {
        event: kind.discriminant(),
        source,
    };
    let event = match kind {
        EventKind::PlayersCanBeReceived => InboundEvent::PlayersCanBeReceived,
        EventKind::PlayersReady => InboundEvent::PlayersReady,
        EventKind::PlayersConfirm => InboundEvent::PlayersConfirm,
        EventKind::GameDone => {
            let payload: GameDonePayload = serde_json::from_str(raw).map_err(payload_error)?;
            if !payload.duration.is_finite() || payload.duration < 0.0 {
                return Err(DecodeError::InvalidField {
                    event: kind.discriminant(),
                    reason: "duration must be a non-negative number of seconds",
                });
            }
            InboundEvent::GameDone {
                duration: payload.duration,
                winner: payload.winning_player.name,
            }
        }
        EventKind::CoinDrop => {
            let payload: CoinDropPayload = serde_json::from_str(raw).map_err(payload_error)?;
            InboundEvent::CoinDrop {
                player: payload.name,
                coins: payload.coins,
            }
        }
        EventKind::PleaseChangeSide => InboundEvent::PleaseChangeSide,
        EventKind::ConfirmedChangeSide => InboundEvent::ConfirmedChangeSide,
    };

    Ok(DecodedMessage {
        class: kind.class(),
        sender: envelope.sender,
        event,
    })
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum OutboundMessage<'a> {
    PlayersReady {
        event: &'static str,
        players: Vec<PlayerDisplayName<'a>>,
        timestamp: &'a str,
    },
    Bare {
        event: &'static str,
    },
}

#[derive(Debug, Serialize)]
struct PlayerDisplayName<'a> {
    display_name: &'a str,
}

pub fn encode_bus_message(event: &OutboundEvent) -> Result<String, serde_json::Error> {
    let discriminant = event.kind().discriminant();
    let message = match event {
        OutboundEvent::PlayersReady { players, timestamp } => OutboundMessage::PlayersReady {
            event: discriminant,
            players: players
                .iter()
                .map(|name| PlayerDisplayName { display_name: name })
                .collect(),
            timestamp,
        },
        OutboundEvent::ConfirmedChangeSide => OutboundMessage::Bare {
            event: discriminant,
        },
    };
    serde_json::to_string(&message)
}

/// Dashboard push payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMessageDto {
    pub dashboard_game: Option<DashboardGameDto>,
    pub dashboard_ranking: Vec<DashboardRankingDto>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardGameDto {
    pub doc_id: String,
    pub duration: i64,
    pub ki_name: String,
    pub ki_coins: u32,
    pub player1: String,
    pub player1_coins: u32,
    pub player2: String,
    pub player2_coins: u32,
    pub player3: String,
    pub player3_coins: u32,
    pub state: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardRankingDto {
    pub rank: u32,
    pub display_name: String,
    pub games_won: u32,
    pub best_duration: i64,
}

fn whole_seconds(duration: Option<f64>) -> i64 {
    duration.map_or(UNSET_DURATION, |seconds| seconds.trunc() as i64)
}

impl From<&Game> for DashboardGameDto {
    fn from(game: &Game) -> Self {
        let coins = game.coin_snapshot();
        let mut names = game.human_names().into_iter();
        let mut next_name = || names.next().unwrap_or_default();
        Self {
            doc_id: game.id.to_string(),
            duration: whole_seconds(game.duration),
            ki_name: game.computer.name.clone(),
            ki_coins: coins.computer,
            player1: next_name(),
            player1_coins: coins.player1,
            player2: next_name(),
            player2_coins: coins.player2,
            player3: next_name(),
            player3_coins: coins.player3,
            state: game.state.as_str().to_string(),
        }
    }
}

impl From<&Ranking> for DashboardRankingDto {
    fn from(ranking: &Ranking) -> Self {
        Self {
            rank: ranking.rank,
            display_name: ranking.display_name.clone(),
            games_won: ranking.games_won,
            best_duration: whole_seconds(ranking.best_duration),
        }
    }
}

impl From<&DashboardSignal> for DashboardMessageDto {
    fn from(signal: &DashboardSignal) -> Self {
        Self {
            dashboard_game: signal.game.as_ref().map(DashboardGameDto::from),
            dashboard_ranking: signal.ranking.iter().map(DashboardRankingDto::from).collect(),
        }
    }
}

/// Renders an operator event as htmx out-of-band swaps for the control panel.
pub fn render_operator_event(event: &OperatorEvent) -> String {
    match event.kind {
        OperatorEventKind::StateAnnounced => state_snippet("announced", "announced"),
        OperatorEventKind::StateReady => state_snippet("ready", "!!!! ready !!!!"),
        OperatorEventKind::StateActive => {
            let mut html = state_snippet("active", "!!!! active !!!!");
            let coins = event.coins.unwrap_or_default();
            for (target, value) in [
                ("ki-coins", coins.computer),
                ("player1-coins", coins.player1),
                ("player2-coins", coins.player2),
                ("player3-coins", coins.player3),
            ] {
                html.push_str(&format!(
                    "<div hx-swap-oob=\"replace:#{target}\"><p>{value}</p></div>"
                ));
            }
            html
        }
        OperatorEventKind::StateFinished => state_snippet("finished", "!!!! finished !!!!"),
        OperatorEventKind::SideChangePrompt => concat!(
            "<div hx-swap-oob=\"replace:#confirm-change-side\">",
            "<button class=\"btn btn-secondary\" hx-post=\"/confirm\">Confirm side change</button>",
            "</div>"
        )
        .to_string(),
        OperatorEventKind::EnableStartButton => start_button_snippet(""),
        OperatorEventKind::DisableStartButton => start_button_snippet(" disabled"),
    }
}

/// Snippet that removes the side change prompt once confirmed.
pub fn render_side_change_cleared() -> &'static str {
    "<div hx-swap-oob=\"replace:#confirm-change-side\"></div>"
}

fn state_snippet(class: &str, label: &str) -> String {
    format!("<div hx-swap-oob=\"replace:#game-state\"><p class=\"state-{class}\">{label}</p></div>")
}

fn start_button_snippet(disabled: &str) -> String {
    format!(
        "<div hx-swap-oob=\"replace:#start-game\">\
         <button class=\"btn btn-primary\" hx-post=\"/games\"{disabled}>Start game</button>\
         </div>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::game::{CoinSnapshot, GameId, GameState};
    use crate::domain::user::{User, UserState};
    use serde_json::{Value, json};

    #[test]
    fn decodes_game_done_with_winner() {
        let raw = r#"{"event":"GAME_DONE","sender":"device","duration":87.4,"winning_player":{"name":"Tobi"}}"#;

        let decoded = decode_bus_message(raw).expect("decode");

        assert_eq!(decoded.class, EventClass::Game);
        assert_eq!(decoded.sender, "device");
        assert_eq!(
            decoded.event,
            InboundEvent::GameDone {
                duration: 87.4,
                winner: "Tobi".to_string(),
            }
        );
    }

    #[test]
    fn rejects_game_done_with_negative_duration() {
        let raw = r#"{"event":"GAME_DONE","duration":-5.0,"winning_player":{"name":"Tobi"}}"#;

        let err = decode_bus_message(raw).expect_err("negative duration");

        assert!(matches!(
            err,
            DecodeError::InvalidField {
                event: "GAME_DONE",
                ..
            }
        ));
    }

    #[test]
    fn keeps_negative_coins_for_validation() {
        let raw = r#"{"event":"COIN_DROP","sender":"device","name":"anna","coins":-2}"#;

        let decoded = decode_bus_message(raw).expect("decode");

        assert_eq!(
            decoded.event,
            InboundEvent::CoinDrop {
                player: "anna".to_string(),
                coins: -2,
            }
        );
    }

    #[test]
    fn classifies_side_change_as_technical() {
        let decoded = decode_bus_message(r#"{"event":"PLZ_CHANGE_SIDE"}"#).expect("decode");

        assert_eq!(decoded.class, EventClass::Technical);
        assert_eq!(decoded.sender, "");
    }

    #[test]
    fn rejects_unknown_and_malformed_messages() {
        assert!(matches!(
            decode_bus_message(r#"{"event":"RESET_GAME","sender":"device"}"#),
            Err(DecodeError::UnknownEvent(name)) if name == "RESET_GAME"
        ));
        assert!(matches!(
            decode_bus_message("not json"),
            Err(DecodeError::Envelope(_))
        ));
        assert!(matches!(
            decode_bus_message(r#"{"event":"COIN_DROP","name":"anna"}"#),
            Err(DecodeError::Payload { event: "COIN_DROP", .. })
        ));
    }

    #[test]
    fn encodes_players_ready_with_display_names() {
        let event = OutboundEvent::PlayersReady {
            players: vec!["anna".to_string(), String::new(), "carla".to_string()],
            timestamp: "1700000000000".to_string(),
        };

        let encoded: Value =
            serde_json::from_str(&encode_bus_message(&event).expect("encode")).expect("json");

        assert_eq!(
            encoded,
            json!({
                "event": "PLAYERS_READY",
                "players": [
                    {"display_name": "anna"},
                    {"display_name": ""},
                    {"display_name": "carla"}
                ],
                "timestamp": "1700000000000"
            })
        );
    }

    #[test]
    fn encodes_confirmation_as_bare_event() {
        let encoded = encode_bus_message(&OutboundEvent::ConfirmedChangeSide).expect("encode");

        assert_eq!(encoded, r#"{"event":"CONFIRMED_CHANGE_SIDE"}"#);
    }

    #[test]
    fn dashboard_message_uses_camel_case_and_whole_seconds() {
        let roster = vec![User {
            position: Some(2),
            state: UserState::Active,
            ..User::new("bert")
        }];
        let mut game = Game::announce(GameId::from("game-1".to_string()), &roster);
        game.state = GameState::Finished;
        game.duration = Some(65.9);
        let signal = DashboardSignal::new(
            Some(game),
            vec![Ranking {
                rank: 1,
                display_name: "bert".to_string(),
                games_won: 2,
                best_duration: None,
            }],
        );

        let value = serde_json::to_value(DashboardMessageDto::from(&signal)).expect("json");

        assert_eq!(value["dashboardGame"]["docId"], "game-1");
        assert_eq!(value["dashboardGame"]["duration"], 65);
        assert_eq!(value["dashboardGame"]["kiName"], "Louki");
        assert_eq!(value["dashboardGame"]["player1"], "");
        assert_eq!(value["dashboardGame"]["player2Coins"], 3);
        assert_eq!(value["dashboardGame"]["state"], "finished");
        assert_eq!(value["dashboardRanking"][0]["bestDuration"], -1);
        assert_eq!(value["dashboardRanking"][0]["gamesWon"], 2);
    }

    #[test]
    fn hidden_game_serializes_as_null() {
        let value =
            serde_json::to_value(DashboardMessageDto::from(&DashboardSignal::without_game(vec![])))
                .expect("json");

        assert_eq!(value, json!({"dashboardGame": null, "dashboardRanking": []}));
    }

    #[test]
    fn active_snippet_carries_all_coin_counters() {
        let event = OperatorEvent {
            kind: OperatorEventKind::StateActive,
            coins: Some(CoinSnapshot {
                computer: 4,
                player1: 1,
                player2: 2,
                player3: 0,
            }),
        };

        let html = render_operator_event(&event);

        assert!(html.contains("class=\"state-active\""));
        assert!(html.contains("replace:#ki-coins\"><p>4</p>"));
        assert!(html.contains("replace:#player2-coins\"><p>2</p>"));
        assert!(html.contains("replace:#player3-coins\"><p>0</p>"));
    }

    #[test]
    fn start_button_snippet_toggles_disabled() {
        let enabled = render_operator_event(&OperatorEvent::start_button(true));
        let disabled = render_operator_event(&OperatorEvent::start_button(false));

        assert!(enabled.contains("replace:#start-game"));
        assert!(!enabled.contains("disabled"));
        assert!(disabled.contains(" disabled>"));
    }
}
