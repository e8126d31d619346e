//! Command dispatch and status correlation for pools of file-writer workers
//! driven over a publish/subscribe bus.

pub mod bus;
pub mod config;
pub mod controller;
pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod ingress;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod registry;

pub use bus::{Bus, MemoryBus, Subscription};
pub use config::Config;
pub use controller::WriterControl;
pub use dispatcher::CommandDispatcher;
pub use error::{BusError, ControlError, Result};
pub use handle::{CommandHandle, CommandOutcome};
pub use ingress::{IngressHandle, StatusIngress};
pub use metrics::ControlMetrics;
pub use orchestrator::{JobOrchestrator, JobOutcome, RunReport, StartOutcome, StartReport};
pub use registry::Registry;
