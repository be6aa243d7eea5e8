//! Report data model for node resource topology
//!
//! One `Zone` per online NUMA node, holding the per-resource
//! allocatable/capacity figures and the access costs to every other zone.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Zone type used at NUMA-node granularity.
pub const ZONE_TYPE_NODE: &str = "Node";

/// Canonical name of a NUMA zone from its node id.
pub fn zone_name(numa_id: usize) -> String {
    format!("node-{numa_id}")
}

/// Allocatable vs capacity figures for one resource in one zone,
/// rendered as decimal-string quantities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceInfo {
    pub allocatable: String,
    pub capacity: String,
}

/// One NUMA zone of the node topology report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    #[serde(rename = "type")]
    pub zone_type: String,
    pub resources: BTreeMap<String, ResourceInfo>,
    /// Access cost to every online zone, keyed by destination zone name.
    /// Self-cost is whatever the distance matrix reports for the diagonal.
    pub costs: BTreeMap<String, i64>,
}

/// The per-cycle aggregation output: zone name -> zone.
pub type ZoneMap = BTreeMap<String, Zone>;
