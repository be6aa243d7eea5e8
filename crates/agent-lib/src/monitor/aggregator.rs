//! Node resources aggregator
//!
//! Owns the static per-zone capacity inventory and the (resource, unit-id)
//! to zone reverse index, both computed once at startup, and folds each
//! cycle's consumption records into a per-zone allocatable/capacity view.

use super::{PodResources, ResourceAssignment, ResourcesAggregator, POD_RESOURCES_TIMEOUT,
    RESOURCE_CPU};
use crate::models::{zone_name, ResourceInfo, Zone, ZoneMap, ZONE_TYPE_NODE};
use crate::podres::{
    AllocatableResourcesRequest, AllocatableResourcesResponse, ContainerDevices, NumaNode,
    PodResourcesListerClient, TopologyInfo,
};
use crate::topology::{CpuTopology, Distances, NumaNodes};
use anyhow::Context;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tonic::transport::Channel;
use tracing::{debug, warn};

struct ResourceData {
    allocatable: i64,
    capacity: i64,
}

/// Production aggregator. Immutable after construction; `aggregate` uses
/// fresh per-call scratch maps so concurrent calls are safe.
pub struct NodeResourcesAggregator {
    per_numa_capacity: HashMap<usize, HashMap<String, i64>>,
    // mapping: resource name -> unit id -> NUMA node id
    resource_to_numa: HashMap<String, HashMap<String, usize>>,
    numa_nodes: NumaNodes,
    distances: Distances,
}

impl NodeResourcesAggregator {
    /// Discover the host topology under the sysfs mount root and query the
    /// kubelet once for the node's allocatable devices and CPUs.
    pub async fn new(sysfs_root: &Path, channel: Channel) -> anyhow::Result<Self> {
        let numa_nodes = NumaNodes::from_sysfs(sysfs_root)?;
        let cpus = CpuTopology::from_sysfs(sysfs_root, &numa_nodes)?;
        let distances = Distances::from_sysfs(sysfs_root, &numa_nodes)?;

        let mut client = PodResourcesListerClient::new(channel);
        let response = tokio::time::timeout(
            POD_RESOURCES_TIMEOUT,
            client.get_allocatable_resources(AllocatableResourcesRequest {}),
        )
        .await
        .context("allocatable resources query timed out")?
        .context("allocatable resources query failed")?
        .into_inner();

        Ok(Self::from_data(&cpus, numa_nodes, distances, &response))
    }

    /// Build from already-loaded topology data and allocatable resources.
    pub fn from_data(
        cpus: &CpuTopology,
        numa_nodes: NumaNodes,
        distances: Distances,
        available: &AllocatableResourcesResponse,
    ) -> Self {
        let devices = normalize_container_devices(available, cpus);
        Self {
            per_numa_capacity: make_node_capacity(&devices),
            resource_to_numa: make_resource_map(&devices),
            numa_nodes,
            distances,
        }
    }

    /// Debit one consumed unit per listed id from the owning zone.
    /// Assumes allocatable was initialized equal to capacity.
    fn update_allocatable(
        &self,
        per_numa: &mut HashMap<usize, HashMap<String, ResourceData>>,
        assignment: &ResourceAssignment,
    ) {
        for unit_id in &assignment.data {
            let Some(unit_map) = self.resource_to_numa.get(&assignment.name) else {
                warn!(resource = %assignment.name, "unknown resource");
                continue;
            };
            let Some(&node) = unit_map.get(unit_id) else {
                warn!(resource = %assignment.name, unit = %unit_id, "unknown resource unit");
                continue;
            };
            if let Some(data) = per_numa
                .get_mut(&node)
                .and_then(|resources| resources.get_mut(&assignment.name))
            {
                data.allocatable -= 1;
            }
        }
    }

    /// Cost row from one zone to every online zone, including itself.
    /// A failed lookup omits that destination and keeps the rest.
    fn zone_costs(&self, from: usize) -> BTreeMap<String, i64> {
        let mut costs = BTreeMap::new();
        for &to in &self.numa_nodes.online {
            match self.distances.between_nodes(from, to) {
                Ok(cost) => {
                    costs.insert(zone_name(to), cost);
                }
                Err(error) => {
                    warn!(from, to, %error, "cannot find cost between NUMA nodes");
                }
            }
        }
        costs
    }
}

impl ResourcesAggregator for NodeResourcesAggregator {
    fn aggregate(&self, pod_resources: &[PodResources]) -> ZoneMap {
        let mut per_numa: HashMap<usize, HashMap<String, ResourceData>> = HashMap::new();
        for (&node, node_resources) in &self.per_numa_capacity {
            let resources = per_numa.entry(node).or_default();
            for (name, &capacity) in node_resources {
                resources.insert(
                    name.clone(),
                    ResourceData {
                        allocatable: capacity,
                        capacity,
                    },
                );
            }
        }

        for pod in pod_resources {
            for container in &pod.containers {
                for assignment in &container.resources {
                    self.update_allocatable(&mut per_numa, assignment);
                }
            }
        }

        let mut zones = ZoneMap::new();
        for (&node, resource_list) in &per_numa {
            let mut resources = BTreeMap::new();
            for (name, data) in resource_list {
                resources.insert(
                    name.clone(),
                    ResourceInfo {
                        allocatable: data.allocatable.to_string(),
                        capacity: data.capacity.to_string(),
                    },
                );
            }
            zones.insert(
                zone_name(node),
                Zone {
                    zone_type: ZONE_TYPE_NODE.to_string(),
                    resources,
                    costs: self.zone_costs(node),
                },
            );
        }
        zones
    }
}

/// Normalize all compute resources to `ContainerDevices`. CPU ids are not
/// reported as devices by the kubelet, so a synthetic `cpu` device class is
/// appended per zone, grouping the allocatable CPU ids by owning node.
fn normalize_container_devices(
    available: &AllocatableResourcesResponse,
    cpus: &CpuTopology,
) -> Vec<ContainerDevices> {
    let mut devices = available.devices.clone();

    let mut cpus_per_numa: BTreeMap<usize, Vec<String>> = BTreeMap::new();
    for &cpu_id in &available.cpu_ids {
        match cpus.node_for_cpu(cpu_id as usize) {
            Some(node) => cpus_per_numa
                .entry(node)
                .or_default()
                .push(cpu_id.to_string()),
            None => warn!(cpu = cpu_id, "cannot find the NUMA node for CPU"),
        }
    }

    for (node, cpu_list) in cpus_per_numa {
        devices.push(ContainerDevices {
            resource_name: RESOURCE_CPU.to_string(),
            device_ids: cpu_list,
            topology: Some(TopologyInfo {
                nodes: vec![NumaNode { id: node as i64 }],
            }),
        });
    }

    devices
}

/// Per-zone capacity as (NUMA node id) -> resource -> amount. A device entry
/// tagged with multiple zones contributes its full unit count to each.
fn make_node_capacity(devices: &[ContainerDevices]) -> HashMap<usize, HashMap<String, i64>> {
    let mut per_numa_capacity: HashMap<usize, HashMap<String, i64>> = HashMap::new();
    for device in devices {
        for node in device.topology.iter().flat_map(|topology| &topology.nodes) {
            *per_numa_capacity
                .entry(node.id as usize)
                .or_default()
                .entry(device.resource_name.clone())
                .or_insert(0) += device.device_ids.len() as i64;
        }
    }
    per_numa_capacity
}

/// Reverse index (resource name) -> (unit id) -> (NUMA node id). A unit id
/// listed under more than one zone keeps the last write; the host is trusted
/// not to produce such data.
fn make_resource_map(devices: &[ContainerDevices]) -> HashMap<String, HashMap<String, usize>> {
    let mut resource_map: HashMap<String, HashMap<String, usize>> = HashMap::new();
    for device in devices {
        let unit_map = resource_map
            .entry(device.resource_name.clone())
            .or_default();
        for node in device.topology.iter().flat_map(|topology| &topology.nodes) {
            for unit_id in &device.device_ids {
                let previous = unit_map.insert(unit_id.clone(), node.id as usize);
                if let Some(previous) = previous.filter(|&previous| previous != node.id as usize) {
                    debug!(
                        resource = %device.resource_name,
                        unit = %unit_id,
                        previous,
                        "resource unit listed under more than one NUMA node"
                    );
                }
            }
        }
    }
    resource_map
}
