//! CPU id to NUMA node reverse lookup

use super::{parse_id_list, read_sysfs_file, NumaNodes, TopologyError};
use std::collections::HashMap;
use std::path::Path;

/// Maps each CPU id to the NUMA node that owns it.
#[derive(Debug, Clone, Default)]
pub struct CpuTopology {
    cpu_to_node: HashMap<usize, usize>,
}

impl CpuTopology {
    /// Build the lookup by reading `node<id>/cpulist` for every online node
    /// under the given sysfs mount root.
    pub fn from_sysfs(sysfs_root: &Path, nodes: &NumaNodes) -> Result<Self, TopologyError> {
        let mut cpu_to_node = HashMap::new();
        for &node in &nodes.online {
            let path = sysfs_root.join(format!("devices/system/node/node{node}/cpulist"));
            let data = read_sysfs_file(path)?;
            for cpu in parse_id_list("cpu", &data)? {
                cpu_to_node.insert(cpu, node);
            }
        }
        Ok(Self { cpu_to_node })
    }

    /// Build from an explicit cpu -> node mapping, for tests and alternate
    /// backends.
    pub fn from_map(cpu_to_node: HashMap<usize, usize>) -> Self {
        Self { cpu_to_node }
    }

    pub fn node_for_cpu(&self, cpu: usize) -> Option<usize> {
        self.cpu_to_node.get(&cpu).copied()
    }
}
