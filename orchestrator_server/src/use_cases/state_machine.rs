// Game lifecycle state machine driven by device events from the bus.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::domain::errors::{PublishError, StoreError};
use crate::domain::events::{EventKind, InboundEvent, OutboundEvent};
use crate::domain::game::{Game, GameState, Trigger};
use crate::domain::notifications::{DashboardSignal, OperatorEvent};
use crate::domain::ports::{Clock, EventPublisher, Notifier};
use crate::use_cases::games::{CoinUpdate, GameService};

/// Why an event left the game untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    NoCurrentGame,
    StateMismatch {
        expected: GameState,
        actual: GameState,
    },
    NegativeCoins(i64),
    UnexpectedEvent(EventKind),
    Store(StoreError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Processed,
    NotProcessed(Rejection),
}

#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("failed to publish outbound event: {0}")]
    Publish(#[from] PublishError),
}

#[derive(Clone)]
pub struct GameStateMachine {
    pub games: GameService,
    pub publisher: Arc<dyn EventPublisher>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
}

impl GameStateMachine {
    /// Validates `event` against the stored game and applies its transition.
    pub async fn handle(&self, event: InboundEvent) -> Result<Outcome, TransitionError> {
        let Some(trigger) = trigger_for(&event) else {
            return Ok(Outcome::NotProcessed(Rejection::UnexpectedEvent(
                event.kind(),
            )));
        };

        let game = match self.games.current_game().await {
            Ok(Some(game)) => game,
            Ok(None) => return Ok(Outcome::NotProcessed(Rejection::NoCurrentGame)),
            Err(err) => return Ok(Outcome::NotProcessed(Rejection::Store(err))),
        };

        if !trigger.accepts(game.state) {
            return Ok(Outcome::NotProcessed(Rejection::StateMismatch {
                expected: trigger.required_state(),
                actual: game.state,
            }));
        }

        match event {
            InboundEvent::PlayersCanBeReceived => self.players_can_be_received(game).await,
            InboundEvent::PlayersConfirm => self.players_confirm(game).await,
            InboundEvent::GameDone { duration, winner } => {
                self.game_done(game, duration, &winner).await
            }
            InboundEvent::CoinDrop { player, coins } => self.coin_drop(game, &player, coins).await,
            other => Ok(Outcome::NotProcessed(Rejection::UnexpectedEvent(
                other.kind(),
            ))),
        }
    }

    async fn players_can_be_received(&self, game: Game) -> Result<Outcome, TransitionError> {
        let game = match self.games.update_state(&game.id, GameState::Ready).await {
            Ok(game) => game,
            Err(err) => return Ok(Outcome::NotProcessed(Rejection::Store(err))),
        };

        let ready = OutboundEvent::PlayersReady {
            players: game.human_names(),
            timestamp: self.clock.now_epoch_millis().to_string(),
        };
        self.publisher.publish(&[ready]).await?;

        self.notify_operator(&game).await;
        Ok(Outcome::Processed)
    }

    async fn players_confirm(&self, game: Game) -> Result<Outcome, TransitionError> {
        let game = match self.games.update_state(&game.id, GameState::Active).await {
            Ok(game) => game,
            Err(err) => return Ok(Outcome::NotProcessed(Rejection::Store(err))),
        };

        self.notify_dashboard(game.clone()).await;
        self.notify_operator(&game).await;
        Ok(Outcome::Processed)
    }

    async fn game_done(
        &self,
        game: Game,
        duration: f64,
        winner: &str,
    ) -> Result<Outcome, TransitionError> {
        let mut game = match self.games.update_state(&game.id, GameState::Finished).await {
            Ok(game) => game,
            Err(err) => return Ok(Outcome::NotProcessed(Rejection::Store(err))),
        };

        match self.games.update_duration(&game.id, duration).await {
            Ok(updated) => game = updated,
            Err(err) => warn!(game_id = %game.id, error = %err, "failed to persist duration"),
        }

        match self.games.record_statistics(&game.id, duration, winner).await {
            Ok(updated) => debug!(game_id = %game.id, updated, "statistics recorded"),
            Err(err) => warn!(game_id = %game.id, error = %err, "failed to load roster for statistics"),
        }

        info!(game_id = %game.id, duration, winner, "game finished");
        self.notify_dashboard(game.clone()).await;
        self.notify_operator(&game).await;
        Ok(Outcome::Processed)
    }

    async fn coin_drop(
        &self,
        game: Game,
        player: &str,
        coins: i64,
    ) -> Result<Outcome, TransitionError> {
        match self.games.update_coins(&game, player, coins).await {
            Ok(CoinUpdate::Rejected) => Ok(Outcome::NotProcessed(Rejection::NegativeCoins(coins))),
            Ok(CoinUpdate::Unmatched) => {
                debug!(game_id = %game.id, player, "coin drop for unknown player ignored");
                Ok(Outcome::Processed)
            }
            Ok(CoinUpdate::Unchanged) => {
                debug!(game_id = %game.id, player, coins, "coin count unchanged");
                Ok(Outcome::Processed)
            }
            Ok(CoinUpdate::Updated(game)) => {
                self.notify_dashboard(game.clone()).await;
                self.notify_operator(&game).await;
                Ok(Outcome::Processed)
            }
            Err(err) => Ok(Outcome::NotProcessed(Rejection::Store(err))),
        }
    }

    async fn notify_operator(&self, game: &Game) {
        if let Some(event) = OperatorEvent::for_game(game) {
            self.notifier.notify_operator(event).await;
        }
    }

    async fn notify_dashboard(&self, game: Game) {
        let ranking = self.games.ranking_or_empty().await;
        self.notifier
            .notify_dashboard(DashboardSignal::new(Some(game), ranking))
            .await;
    }
}

fn trigger_for(event: &InboundEvent) -> Option<Trigger> {
    match event {
        InboundEvent::PlayersCanBeReceived => Some(Trigger::PlayersCanBeReceived),
        InboundEvent::PlayersConfirm => Some(Trigger::PlayersConfirm),
        InboundEvent::GameDone { .. } => Some(Trigger::GameDone),
        InboundEvent::CoinDrop { .. } => Some(Trigger::CoinDrop),
        InboundEvent::PlayersReady
        | InboundEvent::PleaseChangeSide
        | InboundEvent::ConfirmedChangeSide => None,
    }
}

/// Consumes game events one at a time until the channel closes.
///
/// Returns an error when publishing fails; the caller is expected to stop the process.
pub async fn run_game_events(
    mut events_rx: mpsc::Receiver<InboundEvent>,
    machine: GameStateMachine,
) -> Result<(), TransitionError> {
    while let Some(event) = events_rx.recv().await {
        let kind = event.kind().discriminant();
        match machine.handle(event).await {
            Ok(Outcome::Processed) => debug!(event = kind, "event processed"),
            Ok(Outcome::NotProcessed(reason)) => {
                warn!(event = kind, ?reason, "event not processed");
            }
            Err(err) => {
                error!(event = kind, error = %err, "game event consumer stopping");
                return Err(err);
            }
        }
    }

    info!("game event channel closed; consumer exiting");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::game::CoinSlot;
    use crate::domain::notifications::OperatorEventKind;
    use crate::domain::ranking::DEFAULT_RANKING_LIMIT;
    use crate::domain::user::User;
    use crate::use_cases::test_support::{
        FailureFlags, FixedClock, RecordingGames, RecordingNotifier, RecordingPublisher,
        RecordingUsers, active_user,
    };

    struct Harness {
        games: RecordingGames,
        users: RecordingUsers,
        publisher: RecordingPublisher,
        notifier: RecordingNotifier,
        machine: GameStateMachine,
    }

    fn harness_with(
        games: RecordingGames,
        users: RecordingUsers,
        publisher: RecordingPublisher,
    ) -> Harness {
        let notifier = RecordingNotifier::default();
        let machine = GameStateMachine {
            games: GameService::new(
                Arc::new(games.clone()),
                Arc::new(users.clone()),
                DEFAULT_RANKING_LIMIT,
            ),
            publisher: Arc::new(publisher.clone()),
            notifier: Arc::new(notifier.clone()),
            clock: Arc::new(FixedClock(1_700_000_000_123)),
        };
        Harness {
            games,
            users,
            publisher,
            notifier,
            machine,
        }
    }

    fn harness() -> Harness {
        harness_with(
            RecordingGames::new(),
            RecordingUsers::new(vec![
                active_user("anna", 1),
                active_user("bert", 2),
                active_user("tobi", 3),
                User::computer(),
            ]),
            RecordingPublisher::default(),
        )
    }

    async fn announced(harness: &Harness) -> Game {
        harness.machine.games.announce().await.expect("announce")
    }

    fn set_state(harness: &Harness, state: GameState) -> Game {
        let mut game = harness.games.get_test_game().expect("game exists");
        game.state = state;
        harness.games.insert_test_game(game.clone());
        game
    }

    fn lifecycle_events() -> Vec<InboundEvent> {
        vec![
            InboundEvent::PlayersCanBeReceived,
            InboundEvent::PlayersConfirm,
            InboundEvent::GameDone {
                duration: 42.0,
                winner: "anna".to_string(),
            },
            InboundEvent::CoinDrop {
                player: "anna".to_string(),
                coins: 1,
            },
        ]
    }

    #[tokio::test]
    async fn events_in_the_wrong_state_leave_the_game_unchanged() {
        for state in GameState::ALL {
            for event in lifecycle_events() {
                let trigger = trigger_for(&event).expect("lifecycle event");
                if trigger.accepts(state) {
                    continue;
                }
                let harness = harness();
                announced(&harness).await;
                let before = set_state(&harness, state);

                let outcome = harness.machine.handle(event).await.expect("no publish error");

                assert_eq!(
                    outcome,
                    Outcome::NotProcessed(Rejection::StateMismatch {
                        expected: trigger.required_state(),
                        actual: state,
                    })
                );
                assert_eq!(harness.games.get_test_game(), Some(before));
                assert!(harness.publisher.published().is_empty());
                assert!(harness.notifier.operator_events().is_empty());
            }
        }
    }

    #[tokio::test]
    async fn players_can_be_received_publishes_the_roster_once() {
        let harness = harness();
        announced(&harness).await;

        let outcome = harness
            .machine
            .handle(InboundEvent::PlayersCanBeReceived)
            .await
            .expect("publish");

        assert_eq!(outcome, Outcome::Processed);
        assert_eq!(
            harness.games.get_test_game().map(|g| g.state),
            Some(GameState::Ready)
        );
        assert_eq!(
            harness.publisher.published(),
            vec![OutboundEvent::PlayersReady {
                players: vec!["anna".to_string(), "bert".to_string(), "tobi".to_string()],
                timestamp: "1700000000123".to_string(),
            }]
        );
        let kinds: Vec<OperatorEventKind> = harness
            .notifier
            .operator_events()
            .into_iter()
            .map(|e| e.kind)
            .collect();
        assert_eq!(kinds, vec![OperatorEventKind::StateReady]);
    }

    #[tokio::test]
    async fn publish_failure_is_reported_to_the_consumer() {
        let harness = harness_with(
            RecordingGames::new(),
            RecordingUsers::new(vec![active_user("anna", 1)]),
            RecordingPublisher::failing(),
        );
        announced(&harness).await;

        let result = harness.machine.handle(InboundEvent::PlayersCanBeReceived).await;

        assert!(matches!(result, Err(TransitionError::Publish(_))));
    }

    #[tokio::test]
    async fn players_confirm_activates_and_pushes_one_dashboard_signal() {
        let harness = harness();
        announced(&harness).await;
        set_state(&harness, GameState::Ready);

        let outcome = harness
            .machine
            .handle(InboundEvent::PlayersConfirm)
            .await
            .expect("no publish");

        assert_eq!(outcome, Outcome::Processed);
        let signals = harness.notifier.dashboard_signals();
        assert_eq!(signals.len(), 1);
        let shown = signals[0].game.as_ref().expect("active game is public");
        assert_eq!(shown.state, GameState::Active);
    }

    #[tokio::test]
    async fn coin_drop_updates_the_matching_slot() {
        let harness = harness();
        announced(&harness).await;
        set_state(&harness, GameState::Active);

        let outcome = harness
            .machine
            .handle(InboundEvent::CoinDrop {
                player: "TOBI".to_string(),
                coins: 5,
            })
            .await
            .expect("no publish");

        assert_eq!(outcome, Outcome::Processed);
        let game = harness.games.get_test_game().expect("game");
        assert_eq!(game.coins(CoinSlot::Player3), 5);
        let operator = harness.notifier.operator_events();
        assert_eq!(operator.len(), 1);
        assert_eq!(operator[0].coins.map(|c| c.player3), Some(5));
    }

    #[tokio::test]
    async fn negative_coin_drop_is_not_processed() {
        let harness = harness();
        announced(&harness).await;
        let before = set_state(&harness, GameState::Active);

        let outcome = harness
            .machine
            .handle(InboundEvent::CoinDrop {
                player: "anna".to_string(),
                coins: -3,
            })
            .await
            .expect("no publish");

        assert_eq!(outcome, Outcome::NotProcessed(Rejection::NegativeCoins(-3)));
        assert_eq!(harness.games.get_test_game(), Some(before));
    }

    #[tokio::test]
    async fn unmatched_coin_drop_is_processed_without_changes() {
        let harness = harness();
        announced(&harness).await;
        let before = set_state(&harness, GameState::Active);

        let outcome = harness
            .machine
            .handle(InboundEvent::CoinDrop {
                player: "stranger".to_string(),
                coins: 9,
            })
            .await
            .expect("no publish");

        assert_eq!(outcome, Outcome::Processed);
        assert_eq!(harness.games.get_test_game(), Some(before));
        assert!(harness.notifier.operator_events().is_empty());
    }

    #[tokio::test]
    async fn repeated_coin_count_sends_no_notifications() {
        let harness = harness();
        announced(&harness).await;
        let before = set_state(&harness, GameState::Active);

        let outcome = harness
            .machine
            .handle(InboundEvent::CoinDrop {
                player: "anna".to_string(),
                coins: i64::from(before.coins(CoinSlot::Player1)),
            })
            .await
            .expect("no publish");

        assert_eq!(outcome, Outcome::Processed);
        assert_eq!(harness.games.get_test_game(), Some(before));
        assert!(harness.notifier.operator_events().is_empty());
        assert!(harness.notifier.dashboard_signals().is_empty());
    }

    #[tokio::test]
    async fn game_done_finishes_and_updates_every_rostered_user() {
        let harness = harness();
        announced(&harness).await;
        set_state(&harness, GameState::Active);

        let outcome = harness
            .machine
            .handle(InboundEvent::GameDone {
                duration: 73.25,
                winner: "ANNA".to_string(),
            })
            .await
            .expect("no publish");

        assert_eq!(outcome, Outcome::Processed);
        let game = harness.games.get_test_game().expect("game");
        assert_eq!(game.state, GameState::Finished);
        assert_eq!(game.duration, Some(73.25));
        for user in harness.users.snapshot() {
            assert_eq!(user.played_games, 1, "{}", user.display_name);
            let expected_wins = u32::from(user.display_name == "anna");
            assert_eq!(user.games_won, expected_wins, "{}", user.display_name);
        }
        let signal = harness.notifier.dashboard_signals().pop().expect("signal");
        assert_eq!(signal.ranking.first().map(|r| r.display_name.as_str()), Some("anna"));
    }

    #[tokio::test]
    async fn game_done_survives_a_duration_write_failure() {
        let harness = harness_with(
            RecordingGames::new().with_failures(FailureFlags {
                update_duration: true,
                ..FailureFlags::default()
            }),
            RecordingUsers::new(vec![active_user("anna", 1)]),
            RecordingPublisher::default(),
        );
        announced(&harness).await;
        set_state(&harness, GameState::Active);

        let outcome = harness
            .machine
            .handle(InboundEvent::GameDone {
                duration: 10.0,
                winner: "anna".to_string(),
            })
            .await
            .expect("no publish");

        assert_eq!(outcome, Outcome::Processed);
        let anna = harness.users.get_test_user("anna").expect("anna");
        assert_eq!(anna.games_won, 1);
    }

    #[tokio::test]
    async fn lifecycle_events_without_a_game_are_not_processed() {
        let harness = harness();

        for event in lifecycle_events() {
            let outcome = harness.machine.handle(event).await.expect("no publish");
            assert_eq!(outcome, Outcome::NotProcessed(Rejection::NoCurrentGame));
        }
        assert!(harness.publisher.published().is_empty());
    }

    #[tokio::test]
    async fn echoed_players_ready_is_not_processed() {
        let harness = harness();
        announced(&harness).await;

        let outcome = harness
            .machine
            .handle(InboundEvent::PlayersReady)
            .await
            .expect("no publish");

        assert_eq!(
            outcome,
            Outcome::NotProcessed(Rejection::UnexpectedEvent(EventKind::PlayersReady))
        );
    }

    #[tokio::test]
    async fn store_failure_before_the_transition_has_no_effect() {
        let harness = harness_with(
            RecordingGames::new().with_failures(FailureFlags {
                update_state: true,
                ..FailureFlags::default()
            }),
            RecordingUsers::new(vec![active_user("anna", 1)]),
            RecordingPublisher::default(),
        );
        announced(&harness).await;

        let outcome = harness
            .machine
            .handle(InboundEvent::PlayersCanBeReceived)
            .await
            .expect("no publish");

        assert!(matches!(outcome, Outcome::NotProcessed(Rejection::Store(_))));
        assert!(harness.publisher.published().is_empty());
    }

    #[tokio::test]
    async fn consumer_stops_on_publish_failure() {
        let harness = harness_with(
            RecordingGames::new(),
            RecordingUsers::new(vec![active_user("anna", 1)]),
            RecordingPublisher::failing(),
        );
        announced(&harness).await;
        let (events_tx, events_rx) = mpsc::channel(4);
        events_tx
            .send(InboundEvent::PlayersCanBeReceived)
            .await
            .expect("send");

        let result = run_game_events(events_rx, harness.machine.clone()).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn consumer_exits_cleanly_when_the_channel_closes() {
        let harness = harness();
        let (events_tx, events_rx) = mpsc::channel(4);
        events_tx
            .send(InboundEvent::PlayersConfirm)
            .await
            .expect("send");
        drop(events_tx);

        let result = run_game_events(events_rx, harness.machine.clone()).await;

        assert!(result.is_ok());
    }
}
