use socket2::{SockRef, TcpKeepalive};
use std::{fmt, io, time::Duration};
use tokio::net::TcpStream;
use tracing::warn;

/// Connections whose TCP keepalive probing can be tuned.
pub trait KeepAlive {
    fn set_keepalive(&self, enabled: bool) -> io::Result<()>;

    /// Sets both the idle time before the first probe and, where the platform
    /// supports it, the interval between probes.
    fn set_keepalive_period(&self, period: Duration) -> io::Result<()>;
}

impl KeepAlive for TcpStream {
    fn set_keepalive(&self, enabled: bool) -> io::Result<()> {
        SockRef::from(self).set_keepalive(enabled)
    }

    fn set_keepalive_period(&self, period: Duration) -> io::Result<()> {
        let params = TcpKeepalive::new().with_time(period);
        #[cfg(any(
            target_os = "android",
            target_os = "freebsd",
            target_os = "ios",
            target_os = "linux",
            target_os = "macos",
            target_os = "netbsd",
            target_os = "windows",
        ))]
        let params = params.with_interval(period);
        SockRef::from(self).set_tcp_keepalive(&params)
    }
}

/// Which side of a relay a connection belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Leg {
    Inbound,
    Outbound,
}

impl fmt::Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inbound => f.write_str("inbound"),
            Self::Outbound => f.write_str("outbound"),
        }
    }
}

/// Enables keepalive and sets its period, warning about whatever fails.
///
/// Both settings are always attempted; a failure never stops the relay.
pub fn tune_keep_alive<S: KeepAlive>(stream: &S, leg: Leg, period: Duration) {
    if let Err(e) = stream.set_keepalive(true) {
        warn!(%leg, error = %e, "Set keepalive failed");
    }
    if let Err(e) = stream.set_keepalive_period(period) {
        warn!(%leg, period_secs = period.as_secs(), error = %e, "Set keepalive period failed");
    }
}
