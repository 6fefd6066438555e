//! Client side of the broker connection: a supervised WebSocket that carries
//! room events, plus the watchdog that replaces it when it dies.

pub mod connection;
pub mod error;
pub mod events;
mod sender;
pub mod transport;
mod watchdog;

#[cfg(test)]
mod mock;

pub use connection::{GatewayConnection, RetryPolicy};
pub use error::{GatewayError, TransportError};
pub use events::{Author, EventKind, OutboundEvent, Track};
