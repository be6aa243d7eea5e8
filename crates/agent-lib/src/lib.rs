//! Agent library for NUMA-aware node topology reporting
//!
//! This crate provides the core functionality for:
//! - Host NUMA topology discovery (online nodes, CPU placement, distances)
//! - Scanning per-pod resource assignments from the kubelet
//! - Aggregating per-zone allocatable vs capacity figures
//! - Reporting the zone topology to the cluster control plane

pub mod models;
pub mod monitor;
pub mod podres;
pub mod policy;
pub mod reporter;
pub mod topology;

pub use models::{ResourceInfo, Zone, ZoneMap};
pub use monitor::{
    NodeResourcesAggregator, PodResourcesScanner, ResourcesAggregator, ResourcesScanner,
};
pub use reporter::{ReporterClient, ReporterConfig, StopHandle, TopologyUpdater, UpdaterConfig};
