use std::net::SocketAddr;
use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::config::RelayConfig;
use crate::relay::relay;
use crate::stream::{KeepAlive, Leg, tune_keep_alive};

/// Relays one accepted connection to the configured target.
///
/// Every failure is logged and contained here. If the target cannot be
/// reached the inbound connection is dropped without any bytes copied.
#[tracing::instrument(
    name = "relay",
    skip(inbound, client_addr, config),
    fields(client_addr = %client_addr, target_addr = %config.target)
)]
pub async fn handle_connection(inbound: TcpStream, client_addr: SocketAddr, config: &RelayConfig) {
    let outbound = match TcpStream::connect(&config.target).await {
        Ok(stream) => stream,
        Err(e) => {
            warn!(error = %e, "Failed to connect to target");
            return;
        }
    };

    tune_legs(&inbound, &outbound, config);

    let target_peer = outbound
        .peer_addr()
        .map_or_else(|_| config.target.clone(), |addr| addr.to_string());

    debug!(%target_peer, "Established connection");

    let outcome = relay(inbound, outbound).await;
    if let Some(ref e) = outcome.error {
        debug!(error = %e, "Relay ended with error");
    }

    debug!(
        %target_peer,
        bytes_sent = outcome.left_to_right,
        bytes_received = outcome.right_to_left,
        "Association lost"
    );
}

/// Applies the configured keepalive policy to both legs of a relay.
fn tune_legs<S: KeepAlive>(inbound: &S, outbound: &S, config: &RelayConfig) {
    if config.keep_alive {
        tune_keep_alive(inbound, Leg::Inbound, config.keep_alive_period);
        tune_keep_alive(outbound, Leg::Outbound, config.keep_alive_period);
    }
}
