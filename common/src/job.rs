use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A file-writing job as handed to the worker pool.
///
/// `structure` is the serialized NeXus structure produced elsewhere; it is
/// passed through to the worker untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WriteJob {
    pub job_id: Option<String>,
    pub filename: String,
    pub structure: String,
    pub broker: String,
    pub start_time: DateTime<Utc>,
    pub stop_time: Option<DateTime<Utc>>,
    pub service_id: Option<String>,
    pub metadata: Option<String>,
}

impl WriteJob {
    pub fn new(
        structure: impl Into<String>,
        filename: impl Into<String>,
        broker: impl Into<String>,
        start_time: DateTime<Utc>,
    ) -> Self {
        Self {
            job_id: None,
            filename: filename.into(),
            structure: structure.into(),
            broker: broker.into(),
            start_time,
            stop_time: None,
            service_id: None,
            metadata: None,
        }
    }

    pub fn with_job_id(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = Some(job_id.into());
        self
    }

    pub fn with_stop_time(mut self, stop_time: DateTime<Utc>) -> Self {
        self.stop_time = Some(stop_time);
        self
    }

    pub fn with_service_id(mut self, service_id: impl Into<String>) -> Self {
        self.service_id = Some(service_id.into());
        self
    }

    pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }

    /// Returns the job id, generating (and keeping) a fresh one if none was set.
    pub fn ensure_job_id(&mut self) -> &str {
        self.job_id
            .get_or_insert_with(|| uuid::Uuid::new_v4().to_string())
            .as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_job_id_is_stable() {
        let mut job = WriteJob::new("{}", "out.nxs", "localhost:9092", Utc::now());
        let first = job.ensure_job_id().to_string();
        let second = job.ensure_job_id().to_string();
        assert_eq!(first, second);
        assert!(uuid::Uuid::parse_str(&first).is_ok());
    }

    #[test]
    fn test_ensure_job_id_keeps_caller_id() {
        let mut job = WriteJob::new("{}", "out.nxs", "localhost:9092", Utc::now()).with_job_id("job-1");
        assert_eq!(job.ensure_job_id(), "job-1");
    }
}
