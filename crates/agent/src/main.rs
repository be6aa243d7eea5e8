//! Topology Agent - NUMA resource topology reporter
//!
//! This binary runs as a DaemonSet on each Kubernetes node, discovering the
//! per-NUMA-zone resource allocation state and reporting it to the cluster
//! topology master.

use agent_lib::monitor::{KubePodMetadata, NodeResourcesAggregator, PodResourcesScanner};
use agent_lib::reporter::{ReporterClient, ReporterConfig, TopologyUpdater, UpdaterConfig};
use agent_lib::{podres, policy};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!(version = AGENT_VERSION, "Starting topology-agent");

    let config = config::AgentConfig::load()?;
    info!(node_name = %config.node_name, "Agent configured");

    let tm_policy = policy::detect_topology_policy(
        &config.topology_manager_policy,
        &config.topology_manager_scope,
    );
    info!(policy = %tm_policy, "Detected topology manager policy");

    let channel = podres::connect(&config.podresources_socket)
        .await
        .with_context(|| {
            format!(
                "failed to connect to pod resources socket {}",
                config.podresources_socket
            )
        })?;

    let metadata = KubePodMetadata::try_default().await?;
    let scanner = PodResourcesScanner::new(
        config.watch_namespace.clone(),
        channel.clone(),
        Arc::new(metadata),
    );

    // The inventory is computed once for the process lifetime; these
    // resources are expected to change rarely, if ever.
    let aggregator = NodeResourcesAggregator::new(Path::new(&config.sysfs), channel)
        .await
        .context("failed to obtain node resource information")?;

    let reporter = ReporterClient::new(ReporterConfig {
        server: config.server.clone(),
        server_name_override: config.server_name_override.clone(),
        ca_file: config.ca_file.as_ref().map(PathBuf::from),
        cert_file: config.cert_file.as_ref().map(PathBuf::from),
        key_file: config.key_file.as_ref().map(PathBuf::from),
        no_publish: config.no_publish,
    });

    let updater = TopologyUpdater::new(
        UpdaterConfig {
            oneshot: config.oneshot,
            sleep_interval: Duration::from_secs(config.sleep_interval_secs),
            tm_policy: tm_policy.to_string(),
            node_name: config.node_name.clone(),
            agent_version: AGENT_VERSION.to_string(),
        },
        Arc::new(scanner),
        Arc::new(aggregator),
        reporter,
    );

    let stop = updater.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("SIGINT received, shutting down");
            stop.stop();
        }
    });

    tokio::spawn(updater.run()).await??;
    Ok(())
}
