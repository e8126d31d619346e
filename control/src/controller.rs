use std::sync::Arc;

use fwctl_common::Codec;

use crate::bus::Bus;
use crate::config::Config;
use crate::dispatcher::CommandDispatcher;
use crate::error::Result;
use crate::ingress::{IngressHandle, StatusIngress};
use crate::metrics::ControlMetrics;
use crate::orchestrator::JobOrchestrator;
use crate::registry::Registry;

/// Everything needed to drive a writer pool over one bus: the registry, a
/// running status ingress, the dispatcher and the job workflows.
///
/// Must be created inside a tokio runtime.
pub struct WriterControl {
    registry: Arc<Registry>,
    metrics: Arc<ControlMetrics>,
    dispatcher: Arc<CommandDispatcher>,
    orchestrator: JobOrchestrator,
    ingress: IngressHandle,
    config: Config,
}

impl WriterControl {
    pub fn connect(bus: Arc<dyn Bus>, codec: Arc<dyn Codec>, config: Config) -> Result<Self> {
        let registry = Arc::new(Registry::new());
        let metrics = Arc::new(ControlMetrics::new());

        // Dispatcher first: it refuses an unreachable bus before anything is spawned
        let dispatcher = Arc::new(CommandDispatcher::new(
            bus.clone(),
            codec.clone(),
            registry.clone(),
            metrics.clone(),
            &config,
        )?);

        let ingress = StatusIngress::new(registry.clone(), codec, metrics.clone())
            .spawn(bus.as_ref(), &config.bus.status_topics())?;
        let orchestrator = JobOrchestrator::new(dispatcher.clone(), &config.timing);

        log::info!(
            "Writer control connected to {} (commands on {}, jobs on {})",
            config.bus.broker,
            config.bus.command_topic,
            config.bus.job_topic
        );

        Ok(Self {
            registry,
            metrics,
            dispatcher,
            orchestrator,
            ingress,
            config,
        })
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn metrics(&self) -> &Arc<ControlMetrics> {
        &self.metrics
    }

    pub fn dispatcher(&self) -> &Arc<CommandDispatcher> {
        &self.dispatcher
    }

    pub fn orchestrator(&self) -> &JobOrchestrator {
        &self.orchestrator
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Stop the status ingress. Returns the number of messages it processed.
    pub async fn shutdown(self) -> u64 {
        log::info!("Shutting down writer control");
        self.ingress.shutdown().await
    }
}
