// Bus event kinds and their routing class.

/// Which internal consumer handles an event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventClass {
    Game,
    Technical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    PlayersCanBeReceived,
    PlayersReady,
    PlayersConfirm,
    GameDone,
    CoinDrop,
    PleaseChangeSide,
    ConfirmedChangeSide,
}

// Single registry of every discriminant on the topic. Adding a kind is one row here.
// PLAYERS_READY is our own outbound event; the shared topic echoes it back.
const EVENT_KINDS: [(&str, EventKind, EventClass); 7] = [
    ("PLAYERS_CAN_BE_RECEIVED", EventKind::PlayersCanBeReceived, EventClass::Game),
    ("PLAYERS_READY", EventKind::PlayersReady, EventClass::Game),
    ("PLAYERS_CONFIRM", EventKind::PlayersConfirm, EventClass::Game),
    ("GAME_DONE", EventKind::GameDone, EventClass::Game),
    ("COIN_DROP", EventKind::CoinDrop, EventClass::Game),
    ("PLZ_CHANGE_SIDE", EventKind::PleaseChangeSide, EventClass::Technical),
    ("CONFIRMED_CHANGE_SIDE", EventKind::ConfirmedChangeSide, EventClass::Technical),
];

impl EventKind {
    pub fn from_discriminant(value: &str) -> Option<Self> {
        EVENT_KINDS
            .iter()
            .find(|(discriminant, _, _)| *discriminant == value)
            .map(|(_, kind, _)| *kind)
    }

    pub fn discriminant(self) -> &'static str {
        EVENT_KINDS
            .iter()
            .find(|(_, kind, _)| *kind == self)
            .map(|(discriminant, _, _)| *discriminant)
            .unwrap_or("UNKNOWN")
    }

    pub fn class(self) -> EventClass {
        EVENT_KINDS
            .iter()
            .find(|(_, kind, _)| *kind == self)
            .map(|(_, _, class)| *class)
            .unwrap_or(EventClass::Technical)
    }
}

/// Fully decoded inbound bus message.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    PlayersCanBeReceived,
    PlayersReady,
    PlayersConfirm,
    GameDone { duration: f64, winner: String },
    // Coins stay signed so negative values reach validation instead of failing decode.
    CoinDrop { player: String, coins: i64 },
    PleaseChangeSide,
    ConfirmedChangeSide,
}

impl InboundEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            InboundEvent::PlayersCanBeReceived => EventKind::PlayersCanBeReceived,
            InboundEvent::PlayersReady => EventKind::PlayersReady,
            InboundEvent::PlayersConfirm => EventKind::PlayersConfirm,
            InboundEvent::GameDone { .. } => EventKind::GameDone,
            InboundEvent::CoinDrop { .. } => EventKind::CoinDrop,
            InboundEvent::PleaseChangeSide => EventKind::PleaseChangeSide,
            InboundEvent::ConfirmedChangeSide => EventKind::ConfirmedChangeSide,
        }
    }
}

/// Messages the orchestrator publishes to the device.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundEvent {
    PlayersReady {
        players: Vec<String>,
        timestamp: String,
    },
    ConfirmedChangeSide,
}

impl OutboundEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            OutboundEvent::PlayersReady { .. } => EventKind::PlayersReady,
            OutboundEvent::ConfirmedChangeSide => EventKind::ConfirmedChangeSide,
        }
    }
}
