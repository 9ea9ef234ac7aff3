//! Server configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::websocket::session::SessionSettings;

/// Configuration for the Expo realtime server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `0` for auto-assign).
    pub port: u16,
    /// Idle seconds before a session sends a heartbeat probe.
    pub idle_timeout_secs: u64,
    /// Per-connection send queue bound, in frames.
    pub send_queue_capacity: usize,
    /// Freshness window for cached metrics snapshots, in seconds.
    pub snapshot_ttl_secs: u64,
    /// Seconds to wait for sessions to drain on shutdown.
    pub shutdown_timeout_secs: u64,
}

impl ServerConfig {
    /// Session tunables derived from this config.
    #[must_use]
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            idle_timeout: Duration::from_secs(self.idle_timeout_secs),
            send_queue_capacity: self.send_queue_capacity,
        }
    }

    /// Snapshot cache TTL derived from this config.
    #[must_use]
    pub fn snapshot_ttl(&self) -> Duration {
        Duration::from_secs(self.snapshot_ttl_secs)
    }

    /// Shutdown drain window derived from this config.
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            idle_timeout_secs: 30,
            send_queue_capacity: 64,
            snapshot_ttl_secs: 5,
            shutdown_timeout_secs: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bind() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.host, "127.0.0.1");
        assert_eq!(cfg.port, 0);
    }

    #[test]
    fn default_idle_timeout() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.idle_timeout_secs, 30);
        assert_eq!(
            cfg.session_settings().idle_timeout,
            Duration::from_secs(30)
        );
    }

    #[test]
    fn default_snapshot_ttl() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.snapshot_ttl(), Duration::from_secs(5));
    }

    #[test]
    fn default_queue_capacity() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.send_queue_capacity, 64);
        assert_eq!(cfg.session_settings().send_queue_capacity, 64);
    }

    #[test]
    fn serde_roundtrip() {
        let cfg = ServerConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: ServerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.host, cfg.host);
        assert_eq!(back.port, cfg.port);
        assert_eq!(back.idle_timeout_secs, cfg.idle_timeout_secs);
        assert_eq!(back.send_queue_capacity, cfg.send_queue_capacity);
        assert_eq!(back.snapshot_ttl_secs, cfg.snapshot_ttl_secs);
        assert_eq!(back.shutdown_timeout_secs, cfg.shutdown_timeout_secs);
    }

    #[test]
    fn custom_values() {
        let cfg = ServerConfig {
            host: "0.0.0.0".into(),
            port: 8080,
            idle_timeout_secs: 10,
            send_queue_capacity: 8,
            snapshot_ttl_secs: 1,
            shutdown_timeout_secs: 5,
        };
        assert_eq!(cfg.session_settings().idle_timeout, Duration::from_secs(10));
        assert_eq!(cfg.session_settings().send_queue_capacity, 8);
        assert_eq!(cfg.shutdown_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn deserialize_from_json_string() {
        let json = r#"{"host":"10.0.0.1","port":3000,"idle_timeout_secs":15,"send_queue_capacity":32,"snapshot_ttl_secs":2,"shutdown_timeout_secs":10}"#;
        let cfg: ServerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.host, "10.0.0.1");
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.snapshot_ttl_secs, 2);
    }
}
