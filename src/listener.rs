use anyhow::{Context, Result};
use std::{io, net::SocketAddr, sync::Arc, time::Duration};
use tokio::{net::TcpListener, time::sleep};
use tracing::{debug, info, warn};

use crate::config::RelayConfig;
use crate::proxy::handle_connection;

/// Pause after a failed accept so that persistent errors such as running out
/// of file descriptors do not spin the loop.
pub const ACCEPT_ERROR_DELAY: Duration = Duration::from_millis(100);

/// A bound listener relaying every accepted connection to one target.
///
/// There is no cap on concurrent connections and no idle timeout; each
/// accepted connection gets its own task until either peer closes it.
pub struct RelayListener {
    listener: TcpListener,
    config: Arc<RelayConfig>,
}

impl RelayListener {
    pub async fn bind(config: RelayConfig) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen)
            .await
            .with_context(|| format!("Failed to bind to address {}", config.listen))?;

        Ok(Self {
            listener,
            config: Arc::new(config),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("Failed to get bound listener local address")
    }

    /// Accepts connections until the process exits. Accept errors are logged
    /// and never end the loop.
    pub async fn run(self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, client_addr)) => {
                    debug!(client_addr = %client_addr, "Got connection");
                    let config = Arc::clone(&self.config);
                    tokio::spawn(async move {
                        handle_connection(stream, client_addr, &config).await;
                    });
                }
                Err(e) => accept_failed(&e).await,
            }
        }
    }
}

async fn accept_failed(error: &io::Error) {
    warn!(error = %error, "Failed to accept connection");
    sleep(ACCEPT_ERROR_DELAY).await;
}

/// Binds `config.listen` and relays connections to `config.target` forever.
///
/// Only a bind failure is returned.
pub async fn serve(config: RelayConfig) -> Result<()> {
    let listener = RelayListener::bind(config).await?;

    info!(
        listen_addr = %listener.local_addr()?,
        target_addr = %listener.config.target,
        keep_alive = listener.config.keep_alive,
        "TCP relay listening"
    );

    listener.run().await;
    Ok(())
}
