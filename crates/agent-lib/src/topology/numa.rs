//! Online NUMA node enumeration

use super::{parse_id_list, read_sysfs_file, TopologyError};
use std::path::Path;

/// The set of online NUMA nodes, in ascending id order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumaNodes {
    pub online: Vec<usize>,
}

impl NumaNodes {
    /// Read the online node set from `devices/system/node/online` under the
    /// given sysfs mount root.
    pub fn from_sysfs(sysfs_root: &Path) -> Result<Self, TopologyError> {
        let data = read_sysfs_file(sysfs_root.join("devices/system/node/online"))?;
        let mut online = parse_id_list("node", &data)?;
        online.sort_unstable();
        Ok(Self { online })
    }

    /// Build from an explicit node list, for tests and alternate backends.
    pub fn from_online(mut online: Vec<usize>) -> Self {
        online.sort_unstable();
        Self { online }
    }

    pub fn is_online(&self, node: usize) -> bool {
        self.online.binary_search(&node).is_ok()
    }

    pub fn len(&self) -> usize {
        self.online.len()
    }

    pub fn is_empty(&self) -> bool {
        self.online.is_empty()
    }
}
