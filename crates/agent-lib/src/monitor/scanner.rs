//! Pod resources scanner
//!
//! Queries the kubelet pod-resources API for the per-container CPU and
//! device assignments of running pods, keeping only watchable pods: pods in
//! the configured namespace (empty = all) that are guaranteed-QoS with
//! whole-core CPU requests.

use super::{
    ContainerResources, PodResources, ResourceAssignment, ResourcesScanner, ScanError,
    POD_RESOURCES_TIMEOUT, RESOURCE_CPU,
};
use crate::podres::{self, ListPodResourcesRequest, PodResourcesListerClient};
use anyhow::Context;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Container, Pod};
use kube::Api;
use std::sync::Arc;
use tonic::transport::Channel;
use tracing::{debug, info};

/// Kubernetes pod quality-of-service classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QosClass {
    Guaranteed,
    Burstable,
    BestEffort,
}

/// CPU request of one container, in millicores, if it declares one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerCpuRequest {
    pub name: String,
    pub cpu_request_millis: Option<i64>,
}

/// The slice of pod metadata the watchability filter needs: QoS class and
/// per-container CPU requests, init and app containers alike.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodCpuProfile {
    pub qos_class: Option<QosClass>,
    pub init_containers: Vec<ContainerCpuRequest>,
    pub containers: Vec<ContainerCpuRequest>,
}

/// Pod metadata query by namespace and name.
#[async_trait]
pub trait PodMetadataLookup: Send + Sync {
    async fn pod_cpu_profile(&self, namespace: &str, name: &str)
        -> anyhow::Result<PodCpuProfile>;
}

/// Production pod metadata lookup backed by the Kubernetes API.
pub struct KubePodMetadata {
    client: kube::Client,
}

impl KubePodMetadata {
    pub fn new(client: kube::Client) -> Self {
        Self { client }
    }

    /// Build a lookup from the ambient cluster configuration
    /// (in-cluster service account or local kubeconfig).
    pub async fn try_default() -> anyhow::Result<Self> {
        let client = kube::Client::try_default()
            .await
            .context("failed to build Kubernetes client")?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl PodMetadataLookup for KubePodMetadata {
    async fn pod_cpu_profile(
        &self,
        namespace: &str,
        name: &str,
    ) -> anyhow::Result<PodCpuProfile> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let pod = pods
            .get(name)
            .await
            .with_context(|| format!("fetching pod {namespace}/{name}"))?;

        let qos_class = pod
            .status
            .as_ref()
            .and_then(|status| status.qos_class.as_deref())
            .and_then(|qos| match qos {
                "Guaranteed" => Some(QosClass::Guaranteed),
                "Burstable" => Some(QosClass::Burstable),
                "BestEffort" => Some(QosClass::BestEffort),
                _ => None,
            });

        let spec = pod.spec.unwrap_or_default();
        let init_containers = spec
            .init_containers
            .unwrap_or_default()
            .iter()
            .map(container_cpu_request)
            .collect::<anyhow::Result<_>>()?;
        let containers = spec
            .containers
            .iter()
            .map(container_cpu_request)
            .collect::<anyhow::Result<_>>()?;

        Ok(PodCpuProfile {
            qos_class,
            init_containers,
            containers,
        })
    }
}

fn container_cpu_request(container: &Container) -> anyhow::Result<ContainerCpuRequest> {
    let request = container
        .resources
        .as_ref()
        .and_then(|resources| resources.requests.as_ref())
        .and_then(|requests| requests.get("cpu"));
    let cpu_request_millis = match request {
        Some(quantity) => Some(parse_cpu_millis(&quantity.0)?),
        None => None,
    };
    Ok(ContainerCpuRequest {
        name: container.name.clone(),
        cpu_request_millis,
    })
}

/// Parse a Kubernetes CPU quantity ("2", "0.5", "1500m") into millicores.
pub(crate) fn parse_cpu_millis(quantity: &str) -> anyhow::Result<i64> {
    let quantity = quantity.trim();
    if let Some(millis) = quantity.strip_suffix('m') {
        return millis
            .parse::<i64>()
            .with_context(|| format!("invalid CPU quantity {quantity:?}"));
    }
    let cores: f64 = quantity
        .parse()
        .with_context(|| format!("invalid CPU quantity {quantity:?}"))?;
    Ok((cores * 1000.0).round() as i64)
}

/// Guaranteed-QoS with exclusive CPUs: every init or app container that
/// requests CPU must request whole cores, and at least one must request CPU.
pub(crate) fn has_exclusive_cpus(profile: &PodCpuProfile) -> bool {
    if profile.qos_class != Some(QosClass::Guaranteed) {
        return false;
    }
    let mut total_millis = 0i64;
    for container in profile.init_containers.iter().chain(&profile.containers) {
        let Some(millis) = container.cpu_request_millis else {
            continue;
        };
        if millis % 1000 != 0 {
            return false;
        }
        total_millis += millis;
    }
    total_millis != 0
}

/// Flatten one container's kubelet-reported assignments into consumption
/// entries. CPU ids become a synthetic `cpu` entry when present; devices are
/// carried through under their resource class name.
pub(crate) fn container_assignments(
    container: &podres::ContainerResources,
) -> Vec<ResourceAssignment> {
    let mut resources = Vec::new();
    if !container.cpu_ids.is_empty() {
        resources.push(ResourceAssignment {
            name: RESOURCE_CPU.to_string(),
            data: container.cpu_ids.iter().map(|id| id.to_string()).collect(),
        });
    }
    for device in &container.devices {
        resources.push(ResourceAssignment {
            name: device.resource_name.clone(),
            data: device.device_ids.clone(),
        });
    }
    resources
}

/// Shape one kubelet-reported pod into a consumption record. Containers
/// with no assignments are dropped; a pod whose every container was dropped
/// yields no record.
pub(crate) fn pod_resources_record(pod: podres::PodResources) -> Option<PodResources> {
    let containers: Vec<ContainerResources> = pod
        .containers
        .iter()
        .filter_map(|container| {
            let resources = container_assignments(container);
            if resources.is_empty() {
                None
            } else {
                Some(ContainerResources {
                    name: container.name.clone(),
                    resources,
                })
            }
        })
        .collect();
    if containers.is_empty() {
        return None;
    }
    Some(PodResources {
        name: pod.name,
        namespace: pod.namespace,
        containers,
    })
}

/// Production scanner over the kubelet pod-resources API.
pub struct PodResourcesScanner {
    namespace: String,
    channel: Channel,
    metadata: Arc<dyn PodMetadataLookup>,
}

impl PodResourcesScanner {
    pub fn new(
        namespace: impl Into<String>,
        channel: Channel,
        metadata: Arc<dyn PodMetadataLookup>,
    ) -> Self {
        let namespace = namespace.into();
        if namespace.is_empty() {
            info!("watching all namespaces");
        } else {
            info!(namespace = %namespace, "watching namespace");
        }
        Self {
            namespace,
            channel,
            metadata,
        }
    }

    async fn is_watchable(&self, namespace: &str, name: &str) -> Result<bool, ScanError> {
        if !self.namespace.is_empty() && self.namespace != namespace {
            return Ok(false);
        }
        let profile = self
            .metadata
            .pod_cpu_profile(namespace, name)
            .await
            .map_err(|source| ScanError::Metadata {
                namespace: namespace.to_string(),
                name: name.to_string(),
                source,
            })?;
        Ok(has_exclusive_cpus(&profile))
    }
}

#[async_trait]
impl ResourcesScanner for PodResourcesScanner {
    async fn scan(&self) -> Result<Vec<PodResources>, ScanError> {
        let mut client = PodResourcesListerClient::new(self.channel.clone());
        let response = tokio::time::timeout(
            POD_RESOURCES_TIMEOUT,
            client.list(ListPodResourcesRequest {}),
        )
        .await
        .map_err(|_| ScanError::Timeout(POD_RESOURCES_TIMEOUT))?
        .map_err(ScanError::PodResources)?
        .into_inner();

        let mut pod_res_data = Vec::new();
        for pod in response.pod_resources {
            if !self.is_watchable(&pod.namespace, &pod.name).await? {
                debug!(pod = %pod.name, namespace = %pod.namespace, "skipping pod");
                continue;
            }

            if let Some(record) = pod_resources_record(pod) {
                pod_res_data.push(record);
            }
        }

        Ok(pod_res_data)
    }
}
