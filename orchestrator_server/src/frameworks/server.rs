// Framework bootstrap for the orchestrator runtime.

use crate::domain::errors::StoreError;
use crate::domain::notifications::{MappingError, validate_state_notifications};
use crate::domain::ports::{EventPublisher, GameStore, UserStore};
use crate::frameworks::{config, db};
use crate::interface_adapters::bus::{BusChannels, BusError, RedisBus, run_subscription};
use crate::interface_adapters::clock::SystemClock;
use crate::interface_adapters::fanout::UiNotifier;
use crate::interface_adapters::routes::app;
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::store::{
    InMemoryGameStore, InMemoryUserStore, PostgresGameStore, PostgresUserStore,
};
use crate::use_cases::{
    GameService, GameStateMachine, RosterService, TechnicalEventHandler, TransitionError,
    refresh_start_button, run_game_events, run_technical_events,
};

use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid operator notification mapping: {0}")]
    Mapping(#[from] MappingError),
    #[error(transparent)]
    Bus(#[from] BusError),
    #[error("failed to connect to database: {0}")]
    Database(#[source] sqlx::Error),
    #[error("failed to run migrations: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("failed to register computer player: {0}")]
    Store(#[from] StoreError),
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
    #[error("game event consumer failed: {0}")]
    GameConsumer(#[from] TransitionError),
}

/// Storage and bus implementations the orchestrator runs against.
pub struct Backends {
    pub games: Arc<dyn GameStore>,
    pub users: Arc<dyn UserStore>,
    pub publisher: Arc<dyn EventPublisher>,
    pub ranking_limit: usize,
}

/// A started orchestrator: shared HTTP state, the senders feeding both consumers,
/// and the consumer tasks themselves.
pub struct Orchestrator {
    pub state: Arc<AppState>,
    pub channels: BusChannels,
    pub game_consumer: JoinHandle<Result<(), TransitionError>>,
    pub technical_consumer: JoinHandle<()>,
}

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

/// Validates static tables, registers the computer player, spawns both event consumers
/// and pushes the initial start button state.
///
/// A failed publish in the game consumer flips `shutdown_tx`.
pub async fn start(
    backends: Backends,
    shutdown_tx: Arc<watch::Sender<bool>>,
) -> Result<Orchestrator, StartupError> {
    validate_state_notifications()?;

    let notifier = Arc::new(UiNotifier::new(
        config::OPERATOR_QUEUE_CAPACITY,
        config::DASHBOARD_QUEUE_CAPACITY,
    ));
    let roster = RosterService::new(backends.users.clone());
    let games = GameService::new(backends.games, backends.users, backends.ranking_limit);
    games.ensure_computer_player().await?;

    let machine = GameStateMachine {
        games: games.clone(),
        publisher: backends.publisher.clone(),
        notifier: notifier.clone(),
        clock: Arc::new(SystemClock),
    };
    let technical = TechnicalEventHandler {
        publisher: backends.publisher,
        notifier: notifier.clone(),
    };

    let (game_tx, game_rx) = mpsc::channel(config::EVENT_CHANNEL_CAPACITY);
    let (technical_tx, technical_rx) = mpsc::channel(config::EVENT_CHANNEL_CAPACITY);

    let game_consumer = tokio::spawn(async move {
        let result = run_game_events(game_rx, machine).await;
        if result.is_err() {
            let _ = shutdown_tx.send(true);
        }
        result
    });
    let technical_consumer = tokio::spawn(run_technical_events(technical_rx, technical.clone()));

    refresh_start_button(&games, notifier.as_ref()).await;

    Ok(Orchestrator {
        state: Arc::new(AppState {
            games,
            roster,
            notifier,
            technical,
        }),
        channels: BusChannels {
            game_tx,
            technical_tx,
        },
        game_consumer,
        technical_consumer,
    })
}

/// Serves the HTTP/WS surface on `listener` until the process exits.
///
/// The event consumers run but nothing feeds them; used by the integration tests.
pub async fn run(listener: TcpListener, backends: Backends) -> Result<(), ServerError> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);
    // Holding the senders keeps both consumers alive while serving.
    let Orchestrator {
        state,
        channels: _channels,
        ..
    } = start(backends, shutdown_tx).await?;

    serve(listener, state, wait_for_stop(shutdown_rx)).await
}

pub async fn run_with_config() -> Result<(), ServerError> {
    init_runtime();

    let topic = config::event_topic();
    let bus = RedisBus::new(&config::redis_url(), topic.clone(), config::bus_publish_timeout())
        .map_err(StartupError::from)?;
    // Without the subscription the device is unreachable.
    let pubsub = bus.subscribe().await.map_err(StartupError::from)?;
    debug!(
        topic = %topic,
        publish_timeout_ms = config::bus_publish_timeout().as_millis(),
        "bus configured"
    );

    let (games, users) = build_stores().await?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);

    let orchestrator = start(
        Backends {
            games,
            users,
            publisher: Arc::new(bus),
            ranking_limit: config::ranking_limit(),
        },
        shutdown_tx.clone(),
    )
    .await?;
    let Orchestrator {
        state,
        channels,
        game_consumer,
        technical_consumer,
    } = orchestrator;

    // The subscription owns the only senders; its exit lets both consumers drain.
    let subscription = tokio::spawn(run_subscription(pubsub, channels, shutdown_rx.clone()));

    let address = SocketAddr::from(([0, 0, 0, 0], config::http_port()));
    let listener = TcpListener::bind(address)
        .await
        .map_err(|source| StartupError::Bind { address, source })
        .inspect_err(|e| error!(error = %e, "failed to bind"))?;

    let served = serve(listener, state, shutdown_signal(shutdown_rx)).await;

    let _ = shutdown_tx.send(true);
    if let Err(err) = subscription.await {
        warn!(error = %err, "bus subscription task failed");
    }
    if let Err(err) = technical_consumer.await {
        warn!(error = %err, "technical event consumer task failed");
    }
    let consumed = match game_consumer.await {
        Ok(result) => result,
        Err(err) => {
            warn!(error = %err, "game event consumer task failed");
            Ok(())
        }
    };
    info!("orchestrator stopped");

    served?;
    consumed?;
    Ok(())
}

async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ServerError> {
    let address = listener.local_addr().map_err(ServerError::Serve)?;
    let app = app(state);

    info!(%address, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(ServerError::Serve)
        .inspect_err(|e| error!(error = %e, "server error"))
}

async fn build_stores() -> Result<(Arc<dyn GameStore>, Arc<dyn UserStore>), StartupError> {
    let Some(database_url) = config::database_url() else {
        info!("DATABASE_URL not set; using in-memory stores");
        return Ok((
            Arc::new(InMemoryGameStore::new()),
            Arc::new(InMemoryUserStore::new()),
        ));
    };

    let settings = db::DbSettings {
        url: database_url,
        max_connections: config::database_max_connections(),
        acquire_timeout: config::database_acquire_timeout(),
    };
    let pool = db::connect_pool(&settings)
        .await
        .map_err(StartupError::Database)?;
    db::run_migrations(&pool).await?;
    info!("postgres stores ready");

    Ok((
        Arc::new(PostgresGameStore { db: pool.clone() }),
        Arc::new(PostgresUserStore { db: pool }),
    ))
}

// Resolves once a stop has been requested or the sender is gone.
async fn wait_for_stop(mut shutdown_rx: watch::Receiver<bool>) {
    let _ = shutdown_rx.wait_for(|stop| *stop).await;
}

async fn shutdown_signal(shutdown_rx: watch::Receiver<bool>) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => match result {
            Ok(()) => info!("ctrl-c received; shutting down"),
            Err(err) => {
                warn!(error = %err, "failed to listen for ctrl-c");
                wait_for_stop(shutdown_rx.clone()).await;
            }
        },
        _ = wait_for_stop(shutdown_rx.clone()) => info!("shutdown requested"),
    }
}
