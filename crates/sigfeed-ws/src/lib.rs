//! Push channel for the signal feed.
//!
//! - `PushChannel`: transport-agnostic `subscribe(handler) -> Subscription`
//! - `PushBus`: in-process fan-out used by the transport and by tests
//! - `PushConnection`: WebSocket transport with reconnect backoff and heartbeat

pub mod bus;
pub mod connection;
pub mod error;
pub mod heartbeat;

pub use bus::{PushBus, PushChannel, PushHandler, Subscription};
pub use connection::{ConnectionConfig, ConnectionState, PushConnection};
pub use error::{WsError, WsResult};
