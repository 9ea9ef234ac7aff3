//! # expo-core
//!
//! Foundation types for the Expo realtime operations backend.
//!
//! This crate provides the shared vocabulary the server crates depend on:
//!
//! - **Branded IDs**: [`ids::TenantId`], [`ids::ConnectionId`], [`ids::StationId`],
//!   [`ids::LocationId`] as newtypes
//! - **Channels**: [`channel::Channel`] — the functional connection categories
//! - **Events**: [`events::DomainEvent`] tagged union with typed payloads,
//!   [`events::EventFrame`] / [`events::ProtocolFrame`] wire frames,
//!   [`events::ClientFrame`] inbound messages
//! - **Snapshots**: [`snapshot::MetricsSnapshot`] served on connect
//! - **Errors**: [`errors::RealtimeError`] and [`errors::SnapshotError`] via `thiserror`
//! - **Logging**: [`logging::init_subscriber`] tracing setup
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by `expo-server` and the `expo` binary.

#![deny(unsafe_code)]

pub mod channel;
pub mod errors;
pub mod events;
pub mod ids;
pub mod logging;
pub mod snapshot;
