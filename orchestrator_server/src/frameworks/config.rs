use std::{env, str::FromStr, time::Duration};

// Runtime/server settings read from the environment.

pub fn http_port() -> u16 {
    parse_setting(env::var("ORCHESTRATOR_PORT").ok(), 5000, |_| true)
}

pub fn redis_url() -> String {
    env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
}

pub fn event_topic() -> String {
    env::var("LOUIE_EVENT_TOPIC").unwrap_or_else(|_| "LOUIE_EVENT".to_string())
}

// Unset or empty selects the in-memory stores.
pub fn database_url() -> Option<String> {
    env::var("DATABASE_URL")
        .ok()
        .filter(|value| !value.trim().is_empty())
}

pub fn database_max_connections() -> u32 {
    parse_setting(env::var("DATABASE_MAX_CONNECTIONS").ok(), 5, |max| *max > 0)
}

pub fn database_acquire_timeout() -> Duration {
    let millis = parse_setting(env::var("DATABASE_ACQUIRE_TIMEOUT_MS").ok(), 5_000, |ms| {
        *ms > 0
    });
    Duration::from_millis(millis)
}

pub fn ranking_limit() -> usize {
    parse_setting(
        env::var("RANKING_LIMIT").ok(),
        crate::domain::ranking::DEFAULT_RANKING_LIMIT,
        |limit| *limit > 0,
    )
}

pub fn bus_publish_timeout() -> Duration {
    let millis = parse_setting(env::var("BUS_PUBLISH_TIMEOUT_MS").ok(), 10_000, |_| true);
    Duration::from_millis(millis)
}

// Missing, unparsable or rejected values fall back to `default`.
fn parse_setting<T: FromStr>(raw: Option<String>, default: T, accept: impl Fn(&T) -> bool) -> T {
    raw.and_then(|value| value.trim().parse::<T>().ok())
        .filter(|value| accept(value))
        .unwrap_or(default)
}

pub const EVENT_CHANNEL_CAPACITY: usize = 256;
pub const OPERATOR_QUEUE_CAPACITY: usize = 10;
pub const DASHBOARD_QUEUE_CAPACITY: usize = 100;
