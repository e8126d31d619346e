use std::sync::Arc;

use fwctl_common::{Codec, JobState, Message};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::bus::{Bus, Subscription};
use crate::error::Result;
use crate::metrics::ControlMetrics;
use crate::registry::Registry;

/// Feeds status broadcasts from the bus into the registry.
pub struct StatusIngress {
    registry: Arc<Registry>,
    codec: Arc<dyn Codec>,
    metrics: Arc<ControlMetrics>,
}

impl StatusIngress {
    pub fn new(registry: Arc<Registry>, codec: Arc<dyn Codec>, metrics: Arc<ControlMetrics>) -> Self {
        Self {
            registry,
            codec,
            metrics,
        }
    }

    /// Decode one raw payload and merge it into the registry.
    ///
    /// Returns true if the registry changed. Bad payloads are logged and
    /// dropped; they never surface as errors.
    pub fn ingest(&self, payload: &[u8]) -> bool {
        let message = match self.codec.decode(payload) {
            Ok(message) => message,
            Err(e) => {
                log::warn!("Dropping undecodable status message ({} bytes): {}", payload.len(), e);
                self.metrics.record_decode_failure();
                return false;
            }
        };

        let schema = message.schema();
        let applied = match message {
            Message::WorkerStatus(status) => {
                log::debug!("Worker {} is {:?}", status.service_id, status.state);
                self.registry.upsert_worker(status)
            }
            Message::JobStatus(status) if status.state == JobState::Unavailable => {
                log::warn!("Ignoring status for job {} reporting no state", status.job_id);
                self.metrics.record_ignored_update();
                return false;
            }
            Message::JobStatus(status) => {
                let job_id = status.job_id.clone();
                let state = status.state;
                let applied = self.registry.upsert_job(status);
                if applied {
                    log::info!("Job {} is now {}", job_id, state);
                } else {
                    log::debug!("Discarded stale status for job {}", job_id);
                }
                applied
            }
            Message::CommandStatus(status) => {
                let command_id = status.command_id.clone();
                let state = status.state;
                let applied = self.registry.upsert_command(status);
                if applied {
                    log::info!("Command {} answered with {:?}", command_id, state);
                } else {
                    log::debug!("Discarded late answer for command {}", command_id);
                }
                applied
            }
            Message::StopTime(_) | Message::RunStart(_) => {
                log::debug!("Ignoring {} command seen on a status topic", schema);
                return false;
            }
        };

        if applied {
            self.metrics.record_ingested(schema);
        } else {
            self.metrics.record_stale_update();
        }
        applied
    }

    /// Subscribe to `topics` and process messages on a background task until
    /// the returned handle is shut down.
    pub fn spawn(self, bus: &dyn Bus, topics: &[String]) -> Result<IngressHandle> {
        let subscription = bus.subscribe(topics)?;
        let token = CancellationToken::new();
        log::info!("Listening for status on {:?}", topics);

        let task = tokio::spawn(self.run(subscription, token.clone()));
        Ok(IngressHandle { token, task })
    }

    async fn run(self, mut subscription: Subscription, token: CancellationToken) -> u64 {
        let mut processed = 0;
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                payload = subscription.recv() => match payload {
                    Some(payload) => {
                        self.ingest(&payload);
                        processed += 1;
                    }
                    None => {
                        log::warn!("Status subscription closed by the bus");
                        return processed;
                    }
                },
            }
        }

        // Drain whatever was already delivered before stopping
        subscription.close();
        while let Ok(payload) = subscription.try_recv() {
            self.ingest(&payload);
            processed += 1;
        }
        log::info!("Status ingress stopped after {} messages", processed);
        processed
    }
}

/// Owner of a running ingress task.
pub struct IngressHandle {
    token: CancellationToken,
    task: JoinHandle<u64>,
}

impl IngressHandle {
    /// Token that stops the ingress when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the ingress, drain buffered messages and return how many
    /// messages were processed in total.
    pub async fn shutdown(self) -> u64 {
        self.token.cancel();
        match self.task.await {
            Ok(processed) => processed,
            Err(e) => {
                log::error!("Status ingress task failed: {}", e);
                0
            }
        }
    }
}
