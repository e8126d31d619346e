pub mod codec;
pub mod job;
pub mod message;
pub mod status;

pub use codec::{Codec, CodecError, JsonCodec};
pub use job::WriteJob;
pub use message::{Message, RunStartCommand, StopTimeCommand};
pub use status::{CommandState, CommandStatus, JobState, JobStatus, WorkerState, WorkerStatus};

// Bus defaults, matching a stock kafka-to-nexus deployment
pub const DEFAULT_BROKER: &str = "localhost:9092";
pub const DEFAULT_COMMAND_TOPIC: &str = "WriterCommand";
pub const DEFAULT_JOB_TOPIC: &str = "WriterJob";

// Timing defaults (milliseconds)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
pub const DEFAULT_START_TIMEOUT_MS: u64 = 2000;
pub const DEFAULT_STOP_TIMEOUT_MS: u64 = 2000;
