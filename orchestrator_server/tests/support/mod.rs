// Shared bootstrapping for integration tests: one orchestrator per test binary.
use async_trait::async_trait;
use orchestrator_server::Backends;
use orchestrator_server::domain::{EventPublisher, OutboundEvent, PublishError, User, UserState};
use orchestrator_server::interface_adapters::store::{InMemoryGameStore, InMemoryUserStore};
use std::{
    // `Arc` shares data between threads; `OnceLock` writes a value only once.
    sync::{Arc, OnceLock},
    // Sleep durations are used in readiness polling loops.
    time::Duration,
};

// Base URL of the shared server, published once it has bound a port.
static SERVER_URL: OnceLock<String> = OnceLock::new();
// One-time guard that ensures the server bootstrap path runs only once.
static SERVER_READY: OnceLock<()> = OnceLock::new();

// Publisher that accepts everything; the tests run without a bus.
struct DiscardingPublisher;

#[async_trait]
impl EventPublisher for DiscardingPublisher {
    async fn publish(&self, _events: &[OutboundEvent]) -> Result<(), PublishError> {
        Ok(())
    }
}

fn seeded_player(name: &str, position: u8) -> User {
    User {
        position: Some(position),
        state: UserState::Active,
        ..User::new(name)
    }
}

fn test_backends() -> Backends {
    let users = InMemoryUserStore::with_users(vec![
        seeded_player("anna", 1),
        seeded_player("bert", 2),
        seeded_player("carla", 3),
    ]);
    Backends {
        games: Arc::new(InMemoryGameStore::new()),
        users: Arc::new(users),
        publisher: Arc::new(DiscardingPublisher),
        ranking_limit: 30,
    }
}

// Ensure the test server is running and return the shared base URL.
pub fn ensure_server() -> &'static str {
    SERVER_READY.get_or_init(|| {
        // Local one-time slot where the server thread publishes its selected URL.
        let published_url = Arc::new(OnceLock::<String>::new());
        let published_url_thread = Arc::clone(&published_url);
        // An OS thread keeps the server alive across individual `#[tokio::test]` runtimes.
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("test runtime");
            runtime.block_on(async move {
                // Ephemeral port avoids collisions with a locally running orchestrator.
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind ephemeral test port");
                let addr = listener.local_addr().expect("get local addr");
                let _ = published_url_thread.set(format!("http://{}", addr));
                orchestrator_server::run(listener, test_backends())
                    .await
                    .expect("server failed");
            });
        });
        wait_for_server_url_and_readiness(published_url);
    });

    SERVER_URL
        .get()
        .expect("server url should be initialized")
        .as_str()
}

// WebSocket URL for `path` on the shared server.
pub fn ws_url(path: &str) -> String {
    let base = ensure_server();
    format!("{}{}", base.replacen("http://", "ws://", 1), path)
}

// Wait for URL publication and then for the server socket to accept TCP connections.
fn wait_for_server_url_and_readiness(published_url: Arc<OnceLock<String>>) {
    let base_url = loop {
        if let Some(url) = published_url.get() {
            break url.clone();
        }
        std::thread::sleep(Duration::from_millis(10));
    };

    let _ = SERVER_URL.set(base_url.clone());

    let addr = base_url
        .strip_prefix("http://")
        .expect("base url should use http://");

    for _ in 0..100 {
        if std::net::TcpStream::connect(addr).is_ok() {
            return;
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    panic!("server did not become ready in time");
}
