use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::{fs, path::Path, time::Duration};

/// Keepalive probe period used when none is configured.
pub const DEFAULT_KEEP_ALIVE_TIME: Duration = Duration::from_secs(25);

/// Settings as read from a config file or the command line. Every field is
/// optional so that sources can be layered before validation.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub listen: Option<String>,
    pub target: Option<String>,
    #[serde(default)]
    pub keep_alive: KeepAliveConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeepAliveConfig {
    pub enabled: Option<bool>,
    /// Probe period in seconds.
    pub time: Option<u64>,
}

/// Validated relay settings, fixed for the lifetime of a listener.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelayConfig {
    /// `host:port` to accept connections on.
    pub listen: String,
    /// `host:port` every accepted connection is relayed to.
    pub target: String,
    pub keep_alive: bool,
    pub keep_alive_period: Duration,
}

impl RelayConfig {
    #[must_use]
    pub fn new(listen: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            listen: listen.into(),
            target: target.into(),
            keep_alive: false,
            keep_alive_period: DEFAULT_KEEP_ALIVE_TIME,
        }
    }

    #[must_use]
    pub fn with_keep_alive(mut self, period: Duration) -> Self {
        self.keep_alive = true;
        self.keep_alive_period = period;
        self
    }
}

impl Config {
    /// Layers `overrides` on top of `self`; values set in `overrides` win.
    #[must_use]
    pub fn overlay(self, overrides: Self) -> Self {
        Self {
            listen: overrides.listen.or(self.listen),
            target: overrides.target.or(self.target),
            keep_alive: KeepAliveConfig {
                enabled: overrides.keep_alive.enabled.or(self.keep_alive.enabled),
                time: overrides.keep_alive.time.or(self.keep_alive.time),
            },
        }
    }

    pub fn into_relay_config(self) -> Result<RelayConfig> {
        let (Some(listen), Some(target)) = (non_empty(self.listen), non_empty(self.target)) else {
            bail!("no address mapping specified; specify --listen and --target");
        };

        Ok(RelayConfig {
            listen,
            target,
            keep_alive: self.keep_alive.enabled.unwrap_or(false),
            keep_alive_period: self
                .keep_alive
                .time
                .map_or(DEFAULT_KEEP_ALIVE_TIME, Duration::from_secs),
        })
    }
}

fn non_empty(address: Option<String>) -> Option<String> {
    address
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse {} as valid TOML", path.display()))
}
