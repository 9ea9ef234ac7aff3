//! # expo-server
//!
//! Axum HTTP + `WebSocket` server for the realtime operations dashboard.
//!
//! - `WebSocket` gateway: one endpoint per channel (dashboard, kitchen
//!   display, table view), partitioned per tenant
//! - Connection registry with bounded per-connection send queues
//! - Typed event publisher for producers
//! - TTL-cached metrics snapshots served on connect
//! - Prometheus `/metrics`, `/health`, graceful shutdown via
//!   `tokio::signal` + `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod health;
pub mod metrics;
pub mod server;
pub mod shutdown;
pub mod websocket;
