use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::job::WriteJob;
use crate::status::{CommandStatus, JobStatus, WorkerStatus};

/// Every message kind that travels over the command, job and status topics,
/// tagged with its schema identifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "schema")]
pub enum Message {
    #[serde(rename = "x5f2")]
    WorkerStatus(WorkerStatus),
    #[serde(rename = "wrdn")]
    JobStatus(JobStatus),
    #[serde(rename = "answ")]
    CommandStatus(CommandStatus),
    #[serde(rename = "6s4t")]
    StopTime(StopTimeCommand),
    #[serde(rename = "pl72")]
    RunStart(RunStartCommand),
}

impl Message {
    pub const SCHEMAS: [&'static str; 5] = ["x5f2", "wrdn", "answ", "6s4t", "pl72"];

    pub fn schema(&self) -> &'static str {
        match self {
            Message::WorkerStatus(_) => "x5f2",
            Message::JobStatus(_) => "wrdn",
            Message::CommandStatus(_) => "answ",
            Message::StopTime(_) => "6s4t",
            Message::RunStart(_) => "pl72",
        }
    }
}

/// "Set stop time" command. A stop time at the unix epoch means "stop now".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StopTimeCommand {
    pub job_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,
    pub command_id: String,
    pub stop_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunStartCommand {
    pub job_id: String,
    pub command_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,
    pub filename: String,
    pub broker: String,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_time: Option<DateTime<Utc>>,
    pub structure: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

impl RunStartCommand {
    pub fn from_job(job_id: impl Into<String>, command_id: impl Into<String>, job: &WriteJob) -> Self {
        Self {
            job_id: job_id.into(),
            command_id: command_id.into(),
            service_id: job.service_id.clone(),
            filename: job.filename.clone(),
            broker: job.broker.clone(),
            start_time: job.start_time,
            stop_time: job.stop_time,
            structure: job.structure.clone(),
            metadata: job.metadata.clone(),
        }
    }
}
