//! WebSocket connection management, partitioned fan-out, snapshot cache,
//! and session lifecycle.

pub mod connection;
pub mod handler;
pub mod metrics_cache;
pub mod publisher;
pub mod registry;
pub mod session;
