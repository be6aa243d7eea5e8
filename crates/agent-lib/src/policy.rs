//! Topology-manager policy naming
//!
//! Canonical policy names carried in the topology report, derived from the
//! kubelet's resource-alignment policy and scope settings.

use std::fmt;

/// The NUMA-alignment policy advertised with every report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopologyManagerPolicy {
    SingleNumaNodeContainerLevel,
    SingleNumaNodePodLevel,
    Restricted,
    BestEffort,
    None,
}

impl TopologyManagerPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SingleNumaNodeContainerLevel => "SingleNUMANodeContainerLevel",
            Self::SingleNumaNodePodLevel => "SingleNUMANodePodLevel",
            Self::Restricted => "Restricted",
            Self::BestEffort => "BestEffort",
            Self::None => "None",
        }
    }
}

impl fmt::Display for TopologyManagerPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map the kubelet policy and scope strings to the canonical policy name.
/// Scope only matters for single-numa-node; container scope is the kubelet
/// default. Unknown policies map to `None`.
pub fn detect_topology_policy(policy: &str, scope: &str) -> TopologyManagerPolicy {
    match (policy, scope) {
        ("single-numa-node", "pod") => TopologyManagerPolicy::SingleNumaNodePodLevel,
        ("single-numa-node", _) => TopologyManagerPolicy::SingleNumaNodeContainerLevel,
        ("restricted", _) => TopologyManagerPolicy::Restricted,
        ("best-effort", _) => TopologyManagerPolicy::BestEffort,
        _ => TopologyManagerPolicy::None,
    }
}
