use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use fwctl_common::{Codec, Message, StopTimeCommand};
use uuid::Uuid;

use crate::bus::Bus;
use crate::config::Config;
use crate::error::Result;
use crate::handle::CommandHandle;
use crate::metrics::ControlMetrics;
use crate::registry::Registry;

/// Publishes commands to the writer pool and hands back handles to follow
/// their outcome.
pub struct CommandDispatcher {
    bus: Arc<dyn Bus>,
    codec: Arc<dyn Codec>,
    registry: Arc<Registry>,
    metrics: Arc<ControlMetrics>,
    command_topic: String,
    job_topic: String,
    poll_interval: Duration,
}

impl CommandDispatcher {
    /// Fails immediately if the bus cannot be reached.
    pub fn new(
        bus: Arc<dyn Bus>,
        codec: Arc<dyn Codec>,
        registry: Arc<Registry>,
        metrics: Arc<ControlMetrics>,
        config: &Config,
    ) -> Result<Self> {
        if let Err(e) = bus.ensure_reachable() {
            log::error!("Unable to reach broker {}: {}", config.bus.broker, e);
            return Err(e.into());
        }

        Ok(Self {
            bus,
            codec,
            registry,
            metrics,
            command_topic: config.bus.command_topic.clone(),
            job_topic: config.bus.job_topic.clone(),
            poll_interval: config.timing.poll_interval().max(Duration::from_millis(1)),
        })
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn codec(&self) -> &Arc<dyn Codec> {
        &self.codec
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Handle for a command id, whether or not it was sent by us.
    pub fn handle(&self, command_id: &str) -> CommandHandle {
        CommandHandle::new(self.registry.clone(), command_id).with_poll_interval(self.poll_interval)
    }

    /// Bytes of a "set stop time" command.
    pub fn encode_stop_time(
        &self,
        service_id: Option<&str>,
        job_id: &str,
        command_id: &str,
        stop_time: DateTime<Utc>,
    ) -> Result<Vec<u8>> {
        let message = Message::StopTime(StopTimeCommand {
            job_id: job_id.to_string(),
            service_id: service_id.map(str::to_string),
            command_id: command_id.to_string(),
            stop_time,
        });
        Ok(self.codec.encode(&message)?)
    }

    /// Ask the worker running `job_id` to stop writing at `stop_time`.
    ///
    /// The command is registered as pending before it is published, so an
    /// answer can never arrive ahead of our own bookkeeping.
    pub fn send_stop_time(
        &self,
        service_id: Option<&str>,
        job_id: &str,
        stop_time: DateTime<Utc>,
    ) -> Result<CommandHandle> {
        let command_id = Uuid::new_v4().to_string();
        let payload = self.encode_stop_time(service_id, job_id, &command_id, stop_time)?;

        self.registry.register_pending(&command_id, job_id, service_id);
        self.publish(&self.command_topic, payload, "6s4t")?;
        log::info!(
            "Sent stop time {} for job {} (command {})",
            stop_time.to_rfc3339(),
            job_id,
            command_id
        );

        Ok(self.handle(&command_id))
    }

    /// Abort is a stop time at the unix epoch: "stop now".
    pub fn send_abort(&self, service_id: Option<&str>, job_id: &str) -> Result<CommandHandle> {
        self.send_stop_time(service_id, job_id, DateTime::<Utc>::UNIX_EPOCH)
    }

    pub fn send_stop_now(&self, service_id: Option<&str>, job_id: &str) -> Result<CommandHandle> {
        self.send_abort(service_id, job_id)
    }

    /// Publish a pre-built message to the job pool topic. No command is
    /// registered.
    pub fn send_raw(&self, payload: Vec<u8>) -> Result<()> {
        self.publish(&self.job_topic, payload, "raw")
    }

    fn publish(&self, topic: &str, payload: Vec<u8>, kind: &'static str) -> Result<()> {
        match self.bus.publish(topic, payload) {
            Ok(()) => {
                self.metrics.record_dispatched(kind);
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to publish to {}: {}", topic, e);
                self.metrics.record_publish_failure();
                Err(e.into())
            }
        }
    }
}
