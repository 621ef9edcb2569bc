use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tcp_relay::{Config, KeepAliveConfig, load_config, serve};
use tracing::{Level, info};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Listen on this addr:port; hostnames are allowed
    #[arg(short, long)]
    listen: Option<String>,

    /// Relay target addr:port
    #[arg(short, long)]
    target: Option<String>,

    /// Enable TCP keepalive probes on both legs
    #[arg(long)]
    keep_alive: bool,

    /// Keepalive probe period in seconds [default: 25]
    #[arg(long, value_name = "SECONDS")]
    keep_alive_time: Option<u64>,

    /// Enable debugging output
    #[arg(short, long)]
    verbose: bool,

    /// TOML config file; command-line flags take precedence
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl Cli {
    fn overrides(&self) -> Config {
        Config {
            listen: self.listen.clone(),
            target: self.target.clone(),
            keep_alive: KeepAliveConfig {
                enabled: self.keep_alive.then_some(true),
                time: self.keep_alive_time,
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .init();

    let file_config = match &cli.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };
    let config = file_config.overlay(cli.overrides()).into_relay_config()?;

    info!(
        listen_addr = %config.listen,
        target_addr = %config.target,
        "Configuration loaded"
    );

    serve(config).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::time::Duration;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_become_overrides() {
        let cli = Cli::parse_from([
            "tcp-relay",
            "-l",
            "[::1]:4000",
            "--target",
            "localhost:5000",
            "--keep-alive",
            "--keep-alive-time",
            "40",
        ]);

        let config = cli.overrides().into_relay_config().unwrap();
        assert_eq!(config.listen, "[::1]:4000");
        assert_eq!(config.target, "localhost:5000");
        assert!(config.keep_alive);
        assert_eq!(config.keep_alive_period, Duration::from_secs(40));
    }

    #[test]
    fn absent_flags_leave_file_values() {
        let cli = Cli::parse_from(["tcp-relay", "-v"]);
        let file = Config {
            listen: Some("127.0.0.1:1".to_string()),
            target: Some("127.0.0.1:2".to_string()),
            keep_alive: KeepAliveConfig {
                enabled: Some(true),
                time: Some(5),
            },
        };

        let config = file.overlay(cli.overrides()).into_relay_config().unwrap();
        assert!(cli.verbose);
        assert_eq!(config.listen, "127.0.0.1:1");
        assert!(config.keep_alive);
        assert_eq!(config.keep_alive_period, Duration::from_secs(5));
    }

    #[test]
    fn missing_addresses_are_rejected() {
        let cli = Cli::parse_from(["tcp-relay", "--listen", "127.0.0.1:1"]);
        assert!(cli.overrides().into_relay_config().is_err());
    }
}
