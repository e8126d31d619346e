use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use fwctl_common::{CommandState, CommandStatus, JobState, JobStatus, WorkerStatus};

/// Local, eventually-consistent view of the workers, jobs and commands seen
/// on the bus.
///
/// Readers (command handles, orchestration polls) never block the ingress
/// writer for longer than a single shard lock. Nothing is ever evicted.
#[derive(Debug, Default)]
pub struct Registry {
    workers: DashMap<String, WorkerStatus>,
    jobs: DashMap<String, JobStatus>,
    commands: DashMap<String, CommandStatus>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace-or-insert by service id. Worker heartbeats always win.
    pub fn upsert_worker(&self, status: WorkerStatus) -> bool {
        self.workers.insert(status.service_id.clone(), status);
        true
    }

    /// Merge a job status. Returns false when the update was dropped as stale.
    pub fn upsert_job(&self, status: JobStatus) -> bool {
        if status.state == JobState::Unavailable {
            log::debug!("Ignoring unavailable state reported for job {}", status.job_id);
            return false;
        }

        match self.jobs.entry(status.job_id.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(status);
                true
            }
            Entry::Occupied(mut slot) => {
                let stored = slot.get_mut();
                if status.timestamp < stored.timestamp {
                    return false;
                }

                // Same instant: a terminal state is never replaced by a non-terminal one
                let state = if status.timestamp == stored.timestamp
                    && stored.state.is_terminal()
                    && !status.state.is_terminal()
                {
                    stored.state
                } else {
                    status.state
                };

                let message = match status.message {
                    Some(message) => Some(message),
                    None if state == stored.state => stored.message.take(),
                    None => None,
                };

                *stored = JobStatus {
                    job_id: status.job_id,
                    state,
                    timestamp: status.timestamp,
                    message,
                    service_id: status.service_id.or_else(|| stored.service_id.take()),
                    file_name: status.file_name.or_else(|| stored.file_name.take()),
                };
                true
            }
        }
    }

    /// Merge a command status. Terminal commands are frozen.
    pub fn upsert_command(&self, status: CommandStatus) -> bool {
        match self.commands.entry(status.command_id.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(status);
                true
            }
            Entry::Occupied(mut slot) => {
                let stored = slot.get_mut();
                if stored.state.is_terminal() || status.timestamp < stored.timestamp {
                    return false;
                }
                let service_id = status.service_id.or_else(|| stored.service_id.take());
                *stored = CommandStatus { service_id, ..status };
                true
            }
        }
    }

    /// Record a command as pending before it is published.
    ///
    /// The row is stamped with the earliest representable time so that the
    /// first remote answer always passes the timestamp gate, whatever the
    /// clock skew between us and the worker. An existing row is left alone.
    pub fn register_pending(&self, command_id: &str, job_id: &str, service_id: Option<&str>) -> bool {
        match self.commands.entry(command_id.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(CommandStatus {
                    command_id: command_id.to_string(),
                    job_id: job_id.to_string(),
                    service_id: service_id.map(str::to_string),
                    state: CommandState::Pending,
                    message: None,
                    timestamp: DateTime::<Utc>::MIN_UTC,
                });
                true
            }
        }
    }

    pub fn get_worker(&self, service_id: &str) -> Option<WorkerStatus> {
        self.workers.get(service_id).map(|entry| entry.value().clone())
    }

    pub fn get_job(&self, job_id: &str) -> Option<JobStatus> {
        self.jobs.get(job_id).map(|entry| entry.value().clone())
    }

    pub fn get_command(&self, command_id: &str) -> Option<CommandStatus> {
        self.commands.get(command_id).map(|entry| entry.value().clone())
    }

    /// State of a job, or `JobState::Unavailable` if no such job is known.
    pub fn get_job_state(&self, job_id: &str) -> JobState {
        self.jobs
            .get(job_id)
            .map(|entry| entry.state)
            .unwrap_or(JobState::Unavailable)
    }

    pub fn get_job_status(&self, job_id: &str) -> Option<JobStatus> {
        self.get_job(job_id)
    }

    pub fn list_workers(&self) -> Vec<WorkerStatus> {
        self.workers.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn list_jobs(&self) -> Vec<JobStatus> {
        self.jobs.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn list_commands(&self) -> Vec<CommandStatus> {
        self.commands.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn list_known_workers(&self) -> Vec<WorkerStatus> {
        self.list_workers()
    }

    pub fn list_known_jobs(&self) -> Vec<JobStatus> {
        self.list_jobs()
    }

    pub fn list_known_commands(&self) -> Vec<CommandStatus> {
        self.list_commands()
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    pub fn command_count(&self) -> usize {
        self.commands.len()
    }
}
