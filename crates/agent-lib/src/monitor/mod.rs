//! Node resource monitoring
//!
//! This module scans the live per-pod resource assignments from the kubelet
//! and aggregates them, together with the static host topology inventory,
//! into per-zone allocatable/capacity figures.

mod aggregator;
mod scanner;

#[cfg(test)]
mod tests;

pub use aggregator::NodeResourcesAggregator;
pub use scanner::{
    ContainerCpuRequest, KubePodMetadata, PodCpuProfile, PodMetadataLookup, PodResourcesScanner,
    QosClass,
};

use crate::models::ZoneMap;
use std::time::Duration;
use thiserror::Error;

pub use async_trait::async_trait;

/// Per-call deadline for kubelet pod-resources queries.
pub const POD_RESOURCES_TIMEOUT: Duration = Duration::from_secs(10);

/// Name of the synthetic device class grouping raw CPU ids by zone.
pub const RESOURCE_CPU: &str = "cpu";

/// Unit ids of one resource assigned to a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceAssignment {
    pub name: String,
    pub data: Vec<String>,
}

/// Per-container resource assignments within a scanned pod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerResources {
    pub name: String,
    pub resources: Vec<ResourceAssignment>,
}

/// One pod's consumption record, produced fresh each scan cycle and
/// discarded after aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodResources {
    pub name: String,
    pub namespace: String,
    pub containers: Vec<ContainerResources>,
}

/// Cycle-local scan failures. The reporting loop logs these and skips the
/// cycle; they never terminate the agent.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("pod resources query failed: {0}")]
    PodResources(#[source] tonic::Status),

    #[error("pod resources query timed out after {0:?}")]
    Timeout(Duration),

    #[error("pod metadata lookup failed for {namespace}/{name}")]
    Metadata {
        namespace: String,
        name: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Capability to produce the current list of per-pod resource assignments.
#[async_trait]
pub trait ResourcesScanner: Send + Sync {
    async fn scan(&self) -> Result<Vec<PodResources>, ScanError>;
}

/// Capability to fold consumption records into the per-zone view.
///
/// `aggregate` is a pure function of its input plus the immutable inventory;
/// implementations must allocate per-call scratch state so concurrent calls
/// stay safe.
pub trait ResourcesAggregator: Send + Sync {
    fn aggregate(&self, pod_resources: &[PodResources]) -> ZoneMap;
}
