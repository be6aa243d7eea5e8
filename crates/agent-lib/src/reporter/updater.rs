//! Topology updater loop
//!
//! The agent's single event loop: one `select!` point multiplexing the
//! cycle timer, certificate-change notifications and the stop signal. Each
//! cycle runs scan, aggregate and report sequentially; no two cycles
//! overlap. Scan failures skip the cycle; report failures are fatal.

use super::client::ReporterClient;
use super::watch::FsWatcher;
use crate::models::ZoneMap;
use crate::monitor::{ResourcesAggregator, ResourcesScanner};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Configuration for the reporting loop.
#[derive(Debug, Clone)]
pub struct UpdaterConfig {
    /// Exit after one successful scan/report cycle.
    pub oneshot: bool,
    /// Delay between cycles. Zero means run the immediate first cycle and
    /// never reschedule.
    pub sleep_interval: Duration,
    /// Detected topology-manager policy, reported verbatim.
    pub tm_policy: String,
    /// The reporting node's identity.
    pub node_name: String,
    /// Build version carried in every report.
    pub agent_version: String,
}

/// Best-effort stop signal; at most one pending stop is meaningful.
#[derive(Clone)]
pub struct StopHandle(mpsc::Sender<()>);

impl StopHandle {
    pub fn stop(&self) {
        let _ = self.0.try_send(());
    }
}

/// The long-lived reporting client state machine.
pub struct TopologyUpdater {
    config: UpdaterConfig,
    scanner: Arc<dyn ResourcesScanner>,
    aggregator: Arc<dyn ResourcesAggregator>,
    client: ReporterClient,
    stop_tx: mpsc::Sender<()>,
    stop_rx: mpsc::Receiver<()>,
}

impl TopologyUpdater {
    pub fn new(
        config: UpdaterConfig,
        scanner: Arc<dyn ResourcesScanner>,
        aggregator: Arc<dyn ResourcesAggregator>,
        client: ReporterClient,
    ) -> Self {
        let (stop_tx, stop_rx) = mpsc::channel(1);
        Self {
            config,
            scanner,
            aggregator,
            client,
            stop_tx,
            stop_rx,
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(self.stop_tx.clone())
    }

    /// Run the loop until a fatal report error, the stop signal, or, in
    /// oneshot mode, one successful cycle.
    pub async fn run(self) -> Result<()> {
        let Self {
            config,
            scanner,
            aggregator,
            mut client,
            mut stop_rx,
            stop_tx: _stop_tx,
        } = self;

        info!(
            version = %config.agent_version,
            node_name = %config.node_name,
            "starting topology updater"
        );

        let mut cert_watch =
            FsWatcher::new(&client.tls_paths()).context("failed to watch TLS certificates")?;

        // First cycle fires immediately.
        let mut next_cycle = Box::pin(tokio::time::sleep(Duration::ZERO));
        let mut armed = true;

        loop {
            tokio::select! {
                _ = &mut next_cycle, if armed => {
                    debug!("scanning");
                    match scanner.scan().await {
                        Err(error) => warn!(%error, "scan failed"),
                        Ok(pod_resources) => {
                            let zones = aggregator.aggregate(&pod_resources);
                            publish(&mut client, &config, &zones).await?;
                            if config.oneshot {
                                return Ok(());
                            }
                        }
                    }
                    if config.sleep_interval.is_zero() {
                        armed = false;
                    } else {
                        next_cycle = Box::pin(tokio::time::sleep(config.sleep_interval));
                    }
                }
                Some(()) = cert_watch.events.recv() => {
                    info!("TLS certificate update, renewing connection to topology master");
                    client.disconnect();
                    client.connect().await?;
                }
                _ = stop_rx.recv() => {
                    info!("shutting down topology updater");
                    drop(cert_watch);
                    return Ok(());
                }
            }
        }
    }
}

/// Send one report: connect, advertise, disconnect. A failure here is fatal
/// to the loop; the process supervisor owns the restart policy.
async fn publish(
    client: &mut ReporterClient,
    config: &UpdaterConfig,
    zones: &ZoneMap,
) -> Result<()> {
    client
        .connect()
        .await
        .context("failed to connect to topology master")?;
    let result = client
        .advertise(
            zones,
            &config.tm_policy,
            &config.node_name,
            &config.agent_version,
        )
        .await;
    client.disconnect();
    result
}
