//! # expo
//!
//! Realtime dashboard server binary — wires up logging, metrics, and the
//! HTTP/WebSocket server, then runs until interrupted.

#![deny(unsafe_code)]

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use expo_server::config::ServerConfig;
use expo_server::server::ExpoServer;
use expo_server::websocket::metrics_cache::ZeroSnapshotSource;

/// Realtime restaurant operations dashboard server.
#[derive(Parser, Debug)]
#[command(name = "expo", about = "Realtime operations dashboard server")]
struct Cli {
    /// Host to bind.
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to bind (0 for auto-assign).
    #[arg(long, default_value = "8787")]
    port: u16,

    /// Idle seconds before a session sends a heartbeat probe.
    #[arg(long, default_value = "30")]
    idle_timeout_secs: u64,

    /// Freshness window for cached metrics snapshots, in seconds.
    #[arg(long, default_value = "5")]
    snapshot_ttl_secs: u64,

    /// Default log level (overridden by `RUST_LOG`).
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    fn server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.host.clone(),
            port: self.port,
            idle_timeout_secs: self.idle_timeout_secs,
            snapshot_ttl_secs: self.snapshot_ttl_secs,
            ..ServerConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    expo_core::logging::init_subscriber(&args.log_level);
    let metrics_handle = expo_server::metrics::install_recorder();

    // No aggregation backend is wired up yet; snapshots come back zeroed
    // and dashboards fill in from the event stream.
    let server = ExpoServer::new(args.server_config(), Arc::new(ZeroSnapshotSource))
        .with_metrics_handle(metrics_handle);

    let serve = server.serve();
    tokio::pin!(serve);
    tokio::select! {
        result = &mut serve => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
            server.shutdown().shutdown();
            serve.await?;
        }
    }

    tracing::info!("shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_default_host() {
        let cli = Cli::parse_from(["expo"]);
        assert_eq!(cli.host, "0.0.0.0");
    }

    #[test]
    fn cli_default_port() {
        let cli = Cli::parse_from(["expo"]);
        assert_eq!(cli.port, 8787);
    }

    #[test]
    fn cli_custom_bind() {
        let cli = Cli::parse_from(["expo", "--host", "127.0.0.1", "--port", "9000"]);
        assert_eq!(cli.host, "127.0.0.1");
        assert_eq!(cli.port, 9000);
    }

    #[test]
    fn cli_tunables_flow_into_config() {
        let cli = Cli::parse_from(["expo", "--idle-timeout-secs", "10", "--snapshot-ttl-secs", "2"]);
        let config = cli.server_config();
        assert_eq!(config.idle_timeout_secs, 10);
        assert_eq!(config.snapshot_ttl_secs, 2);
    }

    #[test]
    fn cli_default_log_level() {
        let cli = Cli::parse_from(["expo"]);
        assert_eq!(cli.log_level, "info");
    }
}
