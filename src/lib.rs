//! TCP Relay
//!
//! Accepts TCP connections on one address and relays each of them, byte for byte,
//! to a fixed target address. When either side finishes, the other side is shut
//! down and both connections are closed. TCP keepalive can optionally be tuned
//! on both legs of every relay.

pub mod config;
pub mod listener;
pub mod proxy;
pub mod relay;
pub mod stream;

#[cfg(test)]
mod test_support;

// Re-export commonly used types and functions
pub use config::{Config, DEFAULT_KEEP_ALIVE_TIME, KeepAliveConfig, RelayConfig, load_config};
pub use listener::{RelayListener, serve};
pub use proxy::handle_connection;
pub use relay::{BUFFER_SIZE, Direction, RelayError, RelayOutcome, relay};
pub use stream::{KeepAlive, Leg, tune_keep_alive};
