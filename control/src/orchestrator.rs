use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use fwctl_common::{CommandState, JobState, Message, RunStartCommand, WriteJob};
use tokio::time::Instant;
use uuid::Uuid;

use crate::config::TimingConfig;
use crate::dispatcher::CommandDispatcher;
use crate::error::Result;
use crate::handle::CommandHandle;
use crate::registry::Registry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// A worker reported status for the job.
    Acknowledged,
    /// The start request was answered with an error.
    Rejected(Option<String>),
    /// Nothing was heard about the job before the deadline.
    TimedOut,
}

#[derive(Debug)]
pub struct StartReport {
    pub job_id: String,
    pub command_id: String,
    pub outcome: StartOutcome,
    /// Abort sent because the start could not be confirmed.
    pub compensation: Option<CommandHandle>,
}

impl StartReport {
    pub fn is_started(&self) -> bool {
        self.outcome == StartOutcome::Acknowledged
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The job reached `Done`, `Error` or `Timeout`.
    Finished(JobState),
    /// Deadline passed; carries the last known state.
    TimedOut(JobState),
    /// The worker answered the stop command with an error.
    StopRejected(Option<String>),
}

#[derive(Debug)]
pub struct RunReport {
    pub start: StartReport,
    pub completion: Option<JobOutcome>,
}

/// Start/stop workflows for write jobs, built on the dispatcher and the
/// registry.
pub struct JobOrchestrator {
    dispatcher: Arc<CommandDispatcher>,
    start_timeout: Duration,
    stop_timeout: Duration,
}

impl JobOrchestrator {
    /// Start and stop timeouts come from `timing` and are used by the
    /// `*_default` entry points.
    pub fn new(dispatcher: Arc<CommandDispatcher>, timing: &TimingConfig) -> Self {
        Self {
            dispatcher,
            start_timeout: timing.start_timeout(),
            stop_timeout: timing.stop_timeout(),
        }
    }

    pub fn start_timeout(&self) -> Duration {
        self.start_timeout
    }

    pub fn stop_timeout(&self) -> Duration {
        self.stop_timeout
    }

    fn registry(&self) -> &Arc<Registry> {
        self.dispatcher.registry()
    }

    /// Publish a start request for `job` and wait up to `ack_timeout` for a
    /// worker to report on it.
    ///
    /// If the start is not confirmed the job may still have started on a
    /// slow worker, so an abort is sent for it. The abort is best effort.
    pub async fn start_job(&self, mut job: WriteJob, ack_timeout: Duration) -> Result<StartReport> {
        let job_id = job.ensure_job_id().to_string();
        let command_id = Uuid::new_v4().to_string();

        let message = Message::RunStart(RunStartCommand::from_job(&job_id, &command_id, &job));
        let payload = self.dispatcher.codec().encode(&message)?;
        self.dispatcher.send_raw(payload)?;
        log::info!("Requested start of job {} writing {}", job_id, job.filename);

        let outcome = self.await_start(&job_id, &command_id, ack_timeout).await;
        let compensation = match outcome {
            StartOutcome::Acknowledged => {
                log::info!("Job {} acknowledged", job_id);
                None
            }
            StartOutcome::Rejected(ref message) => {
                log::warn!("Start of job {} rejected: {}", job_id, message.as_deref().unwrap_or("no message"));
                Some(self.dispatcher.send_abort(job.service_id.as_deref(), &job_id)?)
            }
            StartOutcome::TimedOut => {
                log::warn!("Timed out after {:?} starting job {}, aborting it", ack_timeout, job_id);
                Some(self.dispatcher.send_abort(job.service_id.as_deref(), &job_id)?)
            }
        };

        Ok(StartReport {
            job_id,
            command_id,
            outcome,
            compensation,
        })
    }

    /// `start_job` with the configured start timeout.
    pub async fn start_job_default(&self, job: WriteJob) -> Result<StartReport> {
        self.start_job(job, self.start_timeout).await
    }

    async fn await_start(&self, job_id: &str, command_id: &str, timeout: Duration) -> StartOutcome {
        let deadline = Instant::now() + timeout;
        loop {
            if self.registry().get_job(job_id).is_some() {
                return StartOutcome::Acknowledged;
            }
            if let Some(command) = self.registry().get_command(command_id) {
                if command.state == CommandState::Error {
                    return StartOutcome::Rejected(command.message);
                }
            }
            if !self.sleep_until_next_poll(deadline).await {
                return StartOutcome::TimedOut;
            }
        }
    }

    /// Poll the job until it is done, failed or timed out on the worker.
    pub async fn wait_for_completion(&self, job_id: &str, timeout: Duration) -> JobOutcome {
        let deadline = Instant::now() + timeout;
        loop {
            let state = self.registry().get_job_state(job_id);
            if state.is_finished() {
                return JobOutcome::Finished(state);
            }
            if !self.sleep_until_next_poll(deadline).await {
                log::debug!("Job {} still {} after {:?}", job_id, state, timeout);
                return JobOutcome::TimedOut(state);
            }
        }
    }

    /// Send a new stop time (or an abort when `stop_time` is `None`) and wait
    /// for the job to finish. A rejected stop command ends the wait early.
    pub async fn stop_job(
        &self,
        service_id: Option<&str>,
        job_id: &str,
        stop_time: Option<DateTime<Utc>>,
        timeout: Duration,
    ) -> Result<JobOutcome> {
        let stop = match stop_time {
            Some(stop_time) => self.dispatcher.send_stop_time(service_id, job_id, stop_time)?,
            None => self.dispatcher.send_abort(service_id, job_id)?,
        };

        let deadline = Instant::now() + timeout;
        loop {
            let state = self.registry().get_job_state(job_id);
            if state.is_finished() {
                return Ok(JobOutcome::Finished(state));
            }
            if stop.state() == Some(CommandState::Error) {
                let message = stop.message();
                log::warn!(
                    "Stop of job {} rejected: {}",
                    job_id,
                    message.as_deref().unwrap_or("no message")
                );
                return Ok(JobOutcome::StopRejected(message));
            }
            if !self.sleep_until_next_poll(deadline).await {
                log::debug!("Job {} still {} after stop request", job_id, state);
                return Ok(JobOutcome::TimedOut(state));
            }
        }
    }

    /// `stop_job` with the configured stop timeout.
    pub async fn stop_job_default(
        &self,
        service_id: Option<&str>,
        job_id: &str,
        stop_time: Option<DateTime<Utc>>,
    ) -> Result<JobOutcome> {
        self.stop_job(service_id, job_id, stop_time, self.stop_timeout).await
    }

    /// Start a job and, once acknowledged, wait for it to finish.
    pub async fn run_job(
        &self,
        job: WriteJob,
        ack_timeout: Duration,
        completion_timeout: Duration,
    ) -> Result<RunReport> {
        let start = self.start_job(job, ack_timeout).await?;
        let completion = if start.is_started() {
            Some(self.wait_for_completion(&start.job_id, completion_timeout).await)
        } else {
            None
        };
        Ok(RunReport { start, completion })
    }

    /// Sleep one poll interval, clipped to the deadline. Returns false once
    /// the deadline has passed.
    async fn sleep_until_next_poll(&self, deadline: Instant) -> bool {
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        tokio::time::sleep(self.dispatcher.poll_interval().min(deadline - now)).await;
        true
    }
}
