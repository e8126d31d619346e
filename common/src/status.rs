use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// State of a write job as reported by the worker writing it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// No job is known by the requested id. Only ever returned by lookups.
    Unavailable,
    Started,
    Writing,
    Done,
    Error,
    Timeout,
}

impl JobState {
    /// States after which the worker is not expected to report progress again.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Done | JobState::Error)
    }

    /// States that end a stop/completion wait.
    pub fn is_finished(self) -> bool {
        matches!(self, JobState::Done | JobState::Error | JobState::Timeout)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            JobState::Unavailable => "unavailable",
            JobState::Started => "started",
            JobState::Writing => "writing",
            JobState::Done => "done",
            JobState::Error => "error",
            JobState::Timeout => "timeout",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CommandState {
    Pending,
    Success,
    Error,
}

impl CommandState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, CommandState::Pending)
    }
}

/// Free-form worker state label. The common labels get their own variant,
/// anything else is carried through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WorkerState {
    Idle,
    Writing,
    Unknown,
    Other(String),
}

impl From<String> for WorkerState {
    fn from(label: String) -> Self {
        match label.to_lowercase().as_str() {
            "idle" => WorkerState::Idle,
            "writing" => WorkerState::Writing,
            "unknown" | "" => WorkerState::Unknown,
            _ => WorkerState::Other(label),
        }
    }
}

impl From<WorkerState> for String {
    fn from(state: WorkerState) -> Self {
        match state {
            WorkerState::Idle => "idle".to_string(),
            WorkerState::Writing => "writing".to_string(),
            WorkerState::Unknown => "unknown".to_string(),
            WorkerState::Other(label) => label,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkerStatus {
    pub service_id: String,
    pub timestamp: DateTime<Utc>,
    pub state: WorkerState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
}

impl WorkerStatus {
    pub fn new(service_id: impl Into<String>, state: WorkerState, timestamp: DateTime<Utc>) -> Self {
        Self {
            service_id: service_id.into(),
            timestamp,
            state,
            host_name: None,
            process_id: None,
            job_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobStatus {
    pub job_id: String,
    pub state: JobState,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

impl JobStatus {
    pub fn new(job_id: impl Into<String>, state: JobState, timestamp: DateTime<Utc>) -> Self {
        Self {
            job_id: job_id.into(),
            state,
            timestamp,
            message: None,
            service_id: None,
            file_name: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_service_id(mut self, service_id: impl Into<String>) -> Self {
        self.service_id = Some(service_id.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommandStatus {
    pub command_id: String,
    pub job_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,
    pub state: CommandState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl CommandStatus {
    pub fn new(
        command_id: impl Into<String>,
        job_id: impl Into<String>,
        state: CommandState,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            command_id: command_id.into(),
            job_id: job_id.into(),
            service_id: None,
            state,
            message: None,
            timestamp,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}
