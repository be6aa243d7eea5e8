//! Topology reporting to the cluster control plane
//!
//! This module provides:
//! - The report RPC surface (zone list, policy, node identity, version)
//! - A gRPC client with optional TLS and per-call deadlines
//! - A certificate-file watcher driving connection renewal
//! - The long-lived scan/aggregate/report loop

mod client;
pub mod proto;
mod updater;
mod watch;

pub use client::{ReporterClient, ReporterConfig};
pub use updater::{StopHandle, TopologyUpdater, UpdaterConfig};
