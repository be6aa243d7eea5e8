//! gRPC client for the topology master
//!
//! Owns the connection lifecycle: TLS material is loaded from PEM files
//! when a CA is configured, the channel is rebuilt on every connect, and
//! the report RPC carries a fixed per-call deadline. In no-publish mode the
//! connection is never established and reporting is a no-op success.

use super::proto::{self, NodeTopologyClient};
use crate::models::ZoneMap;
use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use std::time::Duration;
use tonic::transport::{Certificate, Channel, ClientTlsConfig, Identity};
use tracing::{info, warn};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REPORT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for the reporting client.
#[derive(Debug, Clone, Default)]
pub struct ReporterConfig {
    /// Topology master address, "host:port".
    pub server: String,
    /// Hostname expected from the server certificate, useful in testing.
    pub server_name_override: String,
    /// Root certificate for verifying the server. Unset means a plain
    /// connection.
    pub ca_file: Option<PathBuf>,
    /// Client certificate and key for mutual TLS.
    pub cert_file: Option<PathBuf>,
    pub key_file: Option<PathBuf>,
    /// Dry-run mode: never connect, treat reporting as a no-op success.
    pub no_publish: bool,
}

/// Client for advertising the node topology to the cluster control point.
pub struct ReporterClient {
    config: ReporterConfig,
    channel: Option<Channel>,
}

impl ReporterClient {
    pub fn new(config: ReporterConfig) -> Self {
        Self {
            config,
            channel: None,
        }
    }

    /// The TLS material files to watch for rotation, in path order.
    pub fn tls_paths(&self) -> Vec<PathBuf> {
        [&self.config.ca_file, &self.config.cert_file, &self.config.key_file]
            .into_iter()
            .flatten()
            .cloned()
            .collect()
    }

    pub fn is_connected(&self) -> bool {
        self.channel.is_some()
    }

    /// Establish the channel to the topology master. A no-op in no-publish
    /// mode, which leaves the channel unset.
    pub async fn connect(&mut self) -> Result<()> {
        if self.config.no_publish {
            return Ok(());
        }

        let tls_config = match &self.config.ca_file {
            Some(ca_file) => Some(self.load_tls_config(ca_file.clone()).await?),
            None => None,
        };

        let scheme = if tls_config.is_some() { "https" } else { "http" };
        let mut endpoint = Channel::from_shared(format!("{scheme}://{}", self.config.server))
            .with_context(|| format!("invalid server address: {}", self.config.server))?
            .connect_timeout(CONNECT_TIMEOUT);
        if let Some(tls_config) = tls_config {
            endpoint = endpoint.tls_config(tls_config)?;
        }

        let channel = endpoint
            .connect()
            .await
            .with_context(|| format!("failed to connect to {}", self.config.server))?;
        self.channel = Some(channel);

        info!(server = %self.config.server, "connected to topology master");
        Ok(())
    }

    /// Drop the channel; the next connect rebuilds it, picking up rotated
    /// certificates.
    pub fn disconnect(&mut self) {
        self.channel = None;
    }

    /// Load TLS configuration from the certificate files.
    async fn load_tls_config(&self, ca_file: PathBuf) -> Result<ClientTlsConfig> {
        let ca_cert = tokio::fs::read(&ca_file)
            .await
            .with_context(|| format!("failed to read CA certificate from {ca_file:?}"))?;
        let mut tls_config = ClientTlsConfig::new()
            .ca_certificate(Certificate::from_pem(ca_cert))
            .domain_name(self.domain_name());

        if let (Some(cert_file), Some(key_file)) = (&self.config.cert_file, &self.config.key_file)
        {
            let client_cert = tokio::fs::read(cert_file)
                .await
                .with_context(|| format!("failed to read client certificate from {cert_file:?}"))?;
            let client_key = tokio::fs::read(key_file)
                .await
                .with_context(|| format!("failed to read client key from {key_file:?}"))?;
            tls_config = tls_config.identity(Identity::from_pem(client_cert, client_key));
        }

        Ok(tls_config)
    }

    fn domain_name(&self) -> String {
        if !self.config.server_name_override.is_empty() {
            return self.config.server_name_override.clone();
        }
        self.config
            .server
            .rsplit_once(':')
            .map(|(host, _)| host)
            .unwrap_or(&self.config.server)
            .to_string()
    }

    /// Advertise the aggregated zones to the topology master, bounded by the
    /// report deadline. Succeeds without sending when not connected
    /// (no-publish mode).
    pub async fn advertise(
        &mut self,
        zones: &ZoneMap,
        tm_policy: &str,
        node_name: &str,
        agent_version: &str,
    ) -> Result<()> {
        let Some(channel) = self.channel.clone() else {
            return Ok(());
        };

        let mut request = tonic::Request::new(node_topology_request(
            zones,
            tm_policy,
            node_name,
            agent_version,
        ));
        request.set_timeout(REPORT_TIMEOUT);

        let mut client = NodeTopologyClient::new(channel);
        match client.update_node_topology(request).await {
            Ok(_) => Ok(()),
            Err(status) => {
                warn!(error = %status, "failed to set node topology");
                Err(anyhow!("failed to advertise node topology: {status}"))
            }
        }
    }
}

/// Flatten the zone map into the wire request.
fn node_topology_request(
    zones: &ZoneMap,
    tm_policy: &str,
    node_name: &str,
    agent_version: &str,
) -> proto::NodeTopologyRequest {
    let zones = zones
        .iter()
        .map(|(name, zone)| proto::Zone {
            name: name.clone(),
            r#type: zone.zone_type.clone(),
            parent: String::new(),
            resources: zone
                .resources
                .iter()
                .map(|(resource, info)| proto::ResourceInfo {
                    name: resource.clone(),
                    allocatable: info.allocatable.clone(),
                    capacity: info.capacity.clone(),
                })
                .collect(),
            costs: zone
                .costs
                .iter()
                .map(|(destination, &value)| proto::CostInfo {
                    name: destination.clone(),
                    value: value as i32,
                })
                .collect(),
        })
        .collect();

    proto::NodeTopologyRequest {
        zones,
        topology_policies: vec![tm_policy.to_string()],
        node_name: node_name.to_string(),
        agent_version: agent_version.to_string(),
    }
}
