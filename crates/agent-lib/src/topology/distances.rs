//! NUMA node distance matrix

use super::{read_sysfs_file, NumaNodes, TopologyError};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Dense NUMA-to-NUMA access-cost matrix, indexed by node id.
///
/// Built once at startup from host-reported distances and read-only
/// thereafter. Symmetric by construction, not enforced.
#[derive(Debug, Clone, Default)]
pub struct Distances {
    online_nodes: HashSet<usize>,
    by_node: Vec<Vec<i64>>,
}

impl Distances {
    /// The access cost between two online nodes. Self-distance is whatever
    /// the host reports for the diagonal.
    pub fn between_nodes(&self, from: usize, to: usize) -> Result<i64, TopologyError> {
        if !self.online_nodes.contains(&from) {
            return Err(TopologyError::UnknownNode(from));
        }
        if !self.online_nodes.contains(&to) {
            return Err(TopologyError::UnknownNode(to));
        }
        self.by_node
            .get(from)
            .and_then(|row| row.get(to))
            .copied()
            .ok_or(TopologyError::UnknownNode(from.max(to)))
    }

    /// Read per-node `distance` files under the given sysfs mount root.
    ///
    /// Every online node must provide a distance line whose token count
    /// equals the online-node count; any malformed line fails the whole
    /// construction.
    pub fn from_sysfs(sysfs_root: &Path, nodes: &NumaNodes) -> Result<Self, TopologyError> {
        let mut data = BTreeMap::new();
        for &node in &nodes.online {
            let path = sysfs_root.join(format!("devices/system/node/node{node}/distance"));
            data.insert(node, read_sysfs_file(path)?);
        }
        Self::from_data(&data)
    }

    /// Build from an in-memory mapping of node id to distance line, e.g.
    /// `{0: "10 20", 1: "20 10"}`. For tests and alternate backends.
    pub fn from_data<S: AsRef<str>>(data: &BTreeMap<usize, S>) -> Result<Self, TopologyError> {
        let num_nodes = data.len();
        let max_id = data.keys().next_back().copied().unwrap_or(0);
        let mut dist = Self {
            online_nodes: HashSet::new(),
            by_node: vec![Vec::new(); max_id + 1],
        };
        for (&node, line) in data {
            dist.online_nodes.insert(node);
            dist.by_node[node] = node_distances_from_line(num_nodes, line.as_ref())?;
        }
        Ok(dist)
    }
}

fn node_distances_from_line(num_nodes: usize, line: &str) -> Result<Vec<i64>, TopologyError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() != num_nodes {
        return Err(TopologyError::TokenCountMismatch {
            found: tokens.len(),
            expected: num_nodes,
        });
    }
    tokens
        .into_iter()
        .map(|token| {
            token.parse().map_err(|_| TopologyError::InvalidToken {
                what: "distance",
                token: token.to_string(),
            })
        })
        .collect()
}
