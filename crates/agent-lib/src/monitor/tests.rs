//! Aggregation and scanning tests over a fixed two-zone fake topology:
//! zone 0 owns 12 CPUs and 4 fake.io/net units, zone 1 owns 12 CPUs,
//! 2 fake.io/net units and 1 fake.io/gpu unit; distances 10/20.

use super::scanner::{
    container_assignments, has_exclusive_cpus, parse_cpu_millis, pod_resources_record,
    ContainerCpuRequest, PodCpuProfile, QosClass,
};
use super::*;
use crate::models::zone_name;
use crate::podres;
use crate::topology::{CpuTopology, Distances, NumaNodes};
use std::collections::{BTreeMap, HashMap};

fn device(resource: &str, ids: &[&str], node: usize) -> podres::ContainerDevices {
    podres::ContainerDevices {
        resource_name: resource.to_string(),
        device_ids: ids.iter().map(|id| id.to_string()).collect(),
        topology: Some(podres::TopologyInfo {
            nodes: vec![podres::NumaNode { id: node as i64 }],
        }),
    }
}

fn fake_aggregator() -> NodeResourcesAggregator {
    let mut cpu_to_node = HashMap::new();
    for cpu in 0..12 {
        cpu_to_node.insert(cpu, 0);
    }
    for cpu in 12..24 {
        cpu_to_node.insert(cpu, 1);
    }
    let cpus = CpuTopology::from_map(cpu_to_node);

    let nodes = NumaNodes::from_online(vec![0, 1]);
    let distances =
        Distances::from_data(&BTreeMap::from([(0, "10 20"), (1, "20 10")])).unwrap();

    let available = podres::AllocatableResourcesResponse {
        devices: vec![
            device("fake.io/net", &["netAAA-0"], 0),
            device("fake.io/net", &["netAAA-1"], 0),
            device("fake.io/net", &["netAAA-2"], 0),
            device("fake.io/net", &["netAAA-3"], 0),
            device("fake.io/net", &["netBBB-0"], 1),
            device("fake.io/net", &["netBBB-1"], 1),
            device("fake.io/gpu", &["gpuAAA"], 1),
        ],
        cpu_ids: (0..24).collect(),
    };

    NodeResourcesAggregator::from_data(&cpus, nodes, distances, &available)
}

fn resource_figures<'a>(
    zones: &'a crate::models::ZoneMap,
    zone: &str,
    resource: &str,
) -> (&'a str, &'a str) {
    let info = &zones[zone].resources[resource];
    (info.allocatable.as_str(), info.capacity.as_str())
}

fn consuming_pod(resources: Vec<ResourceAssignment>) -> PodResources {
    PodResources {
        name: "test-pod-0".to_string(),
        namespace: "default".to_string(),
        containers: vec![ContainerResources {
            name: "test-cnt-0".to_string(),
            resources,
        }],
    }
}

#[test]
fn test_aggregate_without_consumption() {
    let zones = fake_aggregator().aggregate(&[]);

    assert_eq!(zones.len(), 2);
    assert_eq!(zones["node-0"].zone_type, "Node");
    assert_eq!(zones["node-1"].zone_type, "Node");

    assert_eq!(resource_figures(&zones, "node-0", "cpu"), ("12", "12"));
    assert_eq!(
        resource_figures(&zones, "node-0", "fake.io/net"),
        ("4", "4")
    );
    assert!(!zones["node-0"].resources.contains_key("fake.io/gpu"));

    assert_eq!(resource_figures(&zones, "node-1", "cpu"), ("12", "12"));
    assert_eq!(
        resource_figures(&zones, "node-1", "fake.io/net"),
        ("2", "2")
    );
    assert_eq!(
        resource_figures(&zones, "node-1", "fake.io/gpu"),
        ("1", "1")
    );
}

#[test]
fn test_aggregate_cost_maps_complete_with_self() {
    let zones = fake_aggregator().aggregate(&[]);

    assert_eq!(
        zones["node-0"].costs,
        BTreeMap::from([(zone_name(0), 10), (zone_name(1), 20)])
    );
    assert_eq!(
        zones["node-1"].costs,
        BTreeMap::from([(zone_name(0), 20), (zone_name(1), 10)])
    );
}

#[test]
fn test_aggregate_with_consumption() {
    let aggregator = fake_aggregator();
    let pods = vec![consuming_pod(vec![
        ResourceAssignment {
            name: "cpu".to_string(),
            data: vec!["12".to_string(), "13".to_string()],
        },
        ResourceAssignment {
            name: "fake.io/net".to_string(),
            data: vec!["netBBB-0".to_string()],
        },
    ])];

    let zones = aggregator.aggregate(&pods);

    assert_eq!(resource_figures(&zones, "node-1", "cpu"), ("10", "12"));
    assert_eq!(
        resource_figures(&zones, "node-1", "fake.io/net"),
        ("1", "2")
    );
    assert_eq!(
        resource_figures(&zones, "node-1", "fake.io/gpu"),
        ("1", "1")
    );

    // Zone 0 is unaffected.
    assert_eq!(resource_figures(&zones, "node-0", "cpu"), ("12", "12"));
    assert_eq!(
        resource_figures(&zones, "node-0", "fake.io/net"),
        ("4", "4")
    );
}

#[test]
fn test_aggregate_is_idempotent() {
    let aggregator = fake_aggregator();
    let pods = vec![consuming_pod(vec![ResourceAssignment {
        name: "cpu".to_string(),
        data: vec!["0".to_string(), "1".to_string()],
    }])];

    assert_eq!(aggregator.aggregate(&pods), aggregator.aggregate(&pods));
    // A later empty-consumption call still reports full capacity: no scratch
    // state leaks across calls.
    assert_eq!(
        resource_figures(&aggregator.aggregate(&[]), "node-0", "cpu"),
        ("12", "12")
    );
}

#[test]
fn test_aggregate_counts_duplicate_units_twice() {
    let aggregator = fake_aggregator();
    let pods = vec![consuming_pod(vec![ResourceAssignment {
        name: "fake.io/net".to_string(),
        data: vec!["netAAA-0".to_string(), "netAAA-0".to_string()],
    }])];

    let zones = aggregator.aggregate(&pods);
    assert_eq!(
        resource_figures(&zones, "node-0", "fake.io/net"),
        ("2", "4")
    );
}

#[test]
fn test_aggregate_skips_unknown_resources_and_units() {
    let aggregator = fake_aggregator();
    let pods = vec![consuming_pod(vec![
        ResourceAssignment {
            name: "fake.io/bogus".to_string(),
            data: vec!["bogus-0".to_string()],
        },
        ResourceAssignment {
            name: "fake.io/net".to_string(),
            data: vec!["netZZZ-9".to_string(), "netAAA-0".to_string()],
        },
    ])];

    // The unknown resource and unit are skipped; the known unit still
    // debits, and the zone map stays complete.
    let zones = aggregator.aggregate(&pods);
    assert_eq!(zones.len(), 2);
    assert_eq!(
        resource_figures(&zones, "node-0", "fake.io/net"),
        ("3", "4")
    );
}

#[test]
fn test_consumed_matches_capacity_minus_allocatable() {
    let aggregator = fake_aggregator();
    let pods = vec![
        consuming_pod(vec![ResourceAssignment {
            name: "cpu".to_string(),
            data: vec!["0".to_string(), "12".to_string(), "13".to_string()],
        }]),
        consuming_pod(vec![ResourceAssignment {
            name: "fake.io/gpu".to_string(),
            data: vec!["gpuAAA".to_string()],
        }]),
    ];

    let zones = aggregator.aggregate(&pods);
    assert_eq!(resource_figures(&zones, "node-0", "cpu"), ("11", "12"));
    assert_eq!(resource_figures(&zones, "node-1", "cpu"), ("10", "12"));
    assert_eq!(
        resource_figures(&zones, "node-1", "fake.io/gpu"),
        ("0", "1")
    );
}

fn guaranteed_profile(requests: &[Option<i64>]) -> PodCpuProfile {
    PodCpuProfile {
        qos_class: Some(QosClass::Guaranteed),
        init_containers: vec![],
        containers: requests
            .iter()
            .enumerate()
            .map(|(i, &cpu_request_millis)| ContainerCpuRequest {
                name: format!("cnt-{i}"),
                cpu_request_millis,
            })
            .collect(),
    }
}

#[test]
fn test_has_exclusive_cpus_whole_cores() {
    assert!(has_exclusive_cpus(&guaranteed_profile(&[Some(2000)])));
    assert!(has_exclusive_cpus(&guaranteed_profile(&[
        Some(1000),
        Some(3000)
    ])));
}

#[test]
fn test_has_exclusive_cpus_rejects_fractional() {
    assert!(!has_exclusive_cpus(&guaranteed_profile(&[Some(1500)])));
    assert!(!has_exclusive_cpus(&guaranteed_profile(&[
        Some(1000),
        Some(500)
    ])));
}

#[test]
fn test_has_exclusive_cpus_requires_some_cpu_request() {
    // Containers without a CPU request are exempt from the whole-core check
    // but do not themselves make the pod eligible.
    assert!(!has_exclusive_cpus(&guaranteed_profile(&[None, None])));
    assert!(has_exclusive_cpus(&guaranteed_profile(&[None, Some(1000)])));
}

#[test]
fn test_has_exclusive_cpus_requires_guaranteed_qos() {
    let mut profile = guaranteed_profile(&[Some(2000)]);
    profile.qos_class = Some(QosClass::Burstable);
    assert!(!has_exclusive_cpus(&profile));
    profile.qos_class = None;
    assert!(!has_exclusive_cpus(&profile));
}

#[test]
fn test_has_exclusive_cpus_checks_init_containers() {
    let mut profile = guaranteed_profile(&[Some(2000)]);
    profile.init_containers = vec![ContainerCpuRequest {
        name: "init-0".to_string(),
        cpu_request_millis: Some(500),
    }];
    assert!(!has_exclusive_cpus(&profile));
}

#[test]
fn test_parse_cpu_millis() {
    assert_eq!(parse_cpu_millis("2").unwrap(), 2000);
    assert_eq!(parse_cpu_millis("0.5").unwrap(), 500);
    assert_eq!(parse_cpu_millis("1500m").unwrap(), 1500);
    assert_eq!(parse_cpu_millis(" 1 ").unwrap(), 1000);
    assert!(parse_cpu_millis("lots").is_err());
}

#[test]
fn test_container_assignments() {
    let container = podres::ContainerResources {
        name: "cnt".to_string(),
        devices: vec![device("fake.io/net", &["netAAA-0", "netAAA-1"], 0)],
        cpu_ids: vec![4, 5],
    };

    let assignments = container_assignments(&container);
    assert_eq!(
        assignments,
        vec![
            ResourceAssignment {
                name: "cpu".to_string(),
                data: vec!["4".to_string(), "5".to_string()],
            },
            ResourceAssignment {
                name: "fake.io/net".to_string(),
                data: vec!["netAAA-0".to_string(), "netAAA-1".to_string()],
            },
        ]
    );
}

#[test]
fn test_container_assignments_empty_without_cpus_or_devices() {
    let container = podres::ContainerResources {
        name: "cnt".to_string(),
        devices: vec![],
        cpu_ids: vec![],
    };
    assert!(container_assignments(&container).is_empty());
}

#[test]
fn test_pod_record_drops_empty_containers_and_pods() {
    let pod = podres::PodResources {
        name: "pod-0".to_string(),
        namespace: "default".to_string(),
        containers: vec![
            podres::ContainerResources {
                name: "empty".to_string(),
                devices: vec![],
                cpu_ids: vec![],
            },
            podres::ContainerResources {
                name: "busy".to_string(),
                devices: vec![],
                cpu_ids: vec![7],
            },
        ],
    };

    let record = pod_resources_record(pod).unwrap();
    assert_eq!(record.containers.len(), 1);
    assert_eq!(record.containers[0].name, "busy");

    let empty_pod = podres::PodResources {
        name: "pod-1".to_string(),
        namespace: "default".to_string(),
        containers: vec![podres::ContainerResources {
            name: "empty".to_string(),
            devices: vec![],
            cpu_ids: vec![],
        }],
    };
    assert!(pod_resources_record(empty_pod).is_none());
}

#[test]
fn test_capacity_ignores_cpus_without_known_node() {
    let cpus = CpuTopology::from_map(HashMap::from([(0, 0)]));
    let nodes = NumaNodes::from_online(vec![0]);
    let distances = Distances::from_data(&BTreeMap::from([(0, "10")])).unwrap();

    // CPU 99 has no owning node; it must be skipped, not misattributed.
    let available = podres::AllocatableResourcesResponse {
        devices: vec![],
        cpu_ids: vec![0, 99],
    };
    let aggregator = NodeResourcesAggregator::from_data(&cpus, nodes, distances, &available);

    let zones = aggregator.aggregate(&[]);
    assert_eq!(resource_figures(&zones, "node-0", "cpu"), ("1", "1"));
}

#[test]
fn test_multi_zone_device_contributes_to_each_zone() {
    let cpus = CpuTopology::from_map(HashMap::new());
    let nodes = NumaNodes::from_online(vec![0, 1]);
    let distances =
        Distances::from_data(&BTreeMap::from([(0, "10 20"), (1, "20 10")])).unwrap();

    let available = podres::AllocatableResourcesResponse {
        devices: vec![podres::ContainerDevices {
            resource_name: "fake.io/link".to_string(),
            device_ids: vec!["link-0".to_string(), "link-1".to_string()],
            topology: Some(podres::TopologyInfo {
                nodes: vec![podres::NumaNode { id: 0 }, podres::NumaNode { id: 1 }],
            }),
        }],
        cpu_ids: vec![],
    };
    let aggregator = NodeResourcesAggregator::from_data(&cpus, nodes, distances, &available);

    // Full unit count in each tagged zone, no splitting.
    let zones = aggregator.aggregate(&[]);
    assert_eq!(
        resource_figures(&zones, "node-0", "fake.io/link"),
        ("2", "2")
    );
    assert_eq!(
        resource_figures(&zones, "node-1", "fake.io/link"),
        ("2", "2")
    );
}
