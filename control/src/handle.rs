use std::sync::Arc;
use std::time::Duration;

use fwctl_common::{CommandState, CommandStatus, DEFAULT_POLL_INTERVAL_MS};
use tokio::time::Instant;

use crate::registry::Registry;

/// Result of waiting on a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Success,
    /// The worker explicitly rejected the command.
    Error,
    /// No answer arrived before the deadline.
    Timeout,
}

/// Accessor for the outcome of one dispatched command.
///
/// Handles only read the registry; waiting, timing out or dropping a handle
/// has no effect on the command itself.
#[derive(Debug, Clone)]
pub struct CommandHandle {
    registry: Arc<Registry>,
    command_id: String,
    poll_interval: Duration,
}

impl CommandHandle {
    pub fn new(registry: Arc<Registry>, command_id: impl Into<String>) -> Self {
        Self {
            registry,
            command_id: command_id.into(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval.max(Duration::from_millis(1));
        self
    }

    pub fn command_id(&self) -> &str {
        &self.command_id
    }

    pub fn status(&self) -> Option<CommandStatus> {
        self.registry.get_command(&self.command_id)
    }

    pub fn state(&self) -> Option<CommandState> {
        self.status().map(|status| status.state)
    }

    /// Message attached to the worker's answer, if any.
    pub fn message(&self) -> Option<String> {
        self.status().and_then(|status| status.message)
    }

    pub fn is_done(&self) -> bool {
        self.state().map(CommandState::is_terminal).unwrap_or(false)
    }

    /// Poll the registry until the command is answered or `timeout` elapses.
    pub async fn wait(&self, timeout: Duration) -> CommandOutcome {
        let deadline = Instant::now() + timeout;
        loop {
            match self.state() {
                Some(CommandState::Success) => return CommandOutcome::Success,
                Some(CommandState::Error) => return CommandOutcome::Error,
                _ => {}
            }

            let now = Instant::now();
            if now >= deadline {
                log::debug!("Command {} not answered within {:?}", self.command_id, timeout);
                return CommandOutcome::Timeout;
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }
}
