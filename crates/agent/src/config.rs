//! Agent configuration

use anyhow::{Context, Result};
use serde::Deserialize;

/// Agent configuration, loaded from AGENT_* environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Node name from the Kubernetes downward API
    #[serde(default = "default_node_name")]
    pub node_name: String,

    /// Topology master address, "host:port"
    #[serde(default = "default_server")]
    pub server: String,

    /// Hostname expected from the server certificate, useful in testing
    #[serde(default)]
    pub server_name_override: String,

    /// Root certificate for verifying connections; unset = plain connection
    #[serde(default)]
    pub ca_file: Option<String>,

    /// Certificate used for authenticating connections
    #[serde(default)]
    pub cert_file: Option<String>,

    /// Private key matching the certificate
    #[serde(default)]
    pub key_file: Option<String>,

    /// Namespace to watch pods in; empty = all namespaces
    #[serde(default)]
    pub watch_namespace: String,

    /// Kubelet pod-resources socket path
    #[serde(default = "default_podresources_socket")]
    pub podresources_socket: String,

    /// Mount point of the host sysfs
    #[serde(default = "default_sysfs")]
    pub sysfs: String,

    /// Seconds to sleep between report cycles; 0 = do not reschedule
    #[serde(default = "default_sleep_interval")]
    pub sleep_interval_secs: u64,

    /// Report once and exit
    #[serde(default)]
    pub oneshot: bool,

    /// Do not publish the discovered topology (dry run)
    #[serde(default)]
    pub no_publish: bool,

    /// Kubelet topology-manager policy
    #[serde(default = "default_tm_policy")]
    pub topology_manager_policy: String,

    /// Kubelet topology-manager scope
    #[serde(default = "default_tm_scope")]
    pub topology_manager_scope: String,
}

fn default_node_name() -> String {
    std::env::var("NODE_NAME").unwrap_or_else(|_| "unknown".to_string())
}

fn default_server() -> String {
    "localhost:8080".to_string()
}

fn default_podresources_socket() -> String {
    "/var/lib/kubelet/pod-resources/kubelet.sock".to_string()
}

fn default_sysfs() -> String {
    "/sys".to_string()
}

fn default_sleep_interval() -> u64 {
    60
}

fn default_tm_policy() -> String {
    "none".to_string()
}

fn default_tm_scope() -> String {
    "container".to_string()
}

impl AgentConfig {
    /// Load configuration from the environment.
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("AGENT"))
            .build()?;

        config
            .try_deserialize()
            .context("invalid agent configuration")
    }
}
