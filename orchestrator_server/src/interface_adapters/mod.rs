// Interface adapters: bus, stores, UI fan-out and the HTTP/WS surface.

pub mod bus;
pub mod clock;
pub mod fanout;
pub mod http;
pub mod protocol;
pub mod routes;
pub mod state;
pub mod store;
pub mod ws;
