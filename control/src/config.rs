use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    #[serde(default = "default_broker")]
    pub broker: String,
    #[serde(default = "default_command_topic")]
    pub command_topic: String,
    #[serde(default = "default_job_topic")]
    pub job_topic: String,
    /// Topics carrying worker, job and command status. Empty means the
    /// command and job topics.
    #[serde(default)]
    pub status_topics: Vec<String>,
}

fn default_broker() -> String { fwctl_common::DEFAULT_BROKER.to_string() }
fn default_command_topic() -> String { fwctl_common::DEFAULT_COMMAND_TOPIC.to_string() }
fn default_job_topic() -> String { fwctl_common::DEFAULT_JOB_TOPIC.to_string() }

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            broker: default_broker(),
            command_topic: default_command_topic(),
            job_topic: default_job_topic(),
            status_topics: Vec::new(),
        }
    }
}

impl BusConfig {
    pub fn status_topics(&self) -> Vec<String> {
        if self.status_topics.is_empty() {
            vec![self.command_topic.clone(), self.job_topic.clone()]
        } else {
            self.status_topics.clone()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_start_timeout")]
    pub start_timeout_ms: u64,
    #[serde(default = "default_stop_timeout")]
    pub stop_timeout_ms: u64,
}

fn default_poll_interval() -> u64 { fwctl_common::DEFAULT_POLL_INTERVAL_MS }
fn default_start_timeout() -> u64 { fwctl_common::DEFAULT_START_TIMEOUT_MS }
fn default_stop_timeout() -> u64 { fwctl_common::DEFAULT_STOP_TIMEOUT_MS }

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            start_timeout_ms: default_start_timeout(),
            stop_timeout_ms: default_stop_timeout(),
        }
    }
}

impl TimingConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn start_timeout(&self) -> Duration {
        Duration::from_millis(self.start_timeout_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    pub output: Option<PathBuf>,
}

fn default_log_level() -> String { "info".to_string() }

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            output: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub bus: BusConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load a YAML or TOML config file, picked by extension.
    pub fn from_file(path: &Path) -> Result<Self> {
        let parse: fn(&str) -> Result<Config> = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => |text| Ok(serde_yaml::from_str(text)?),
            Some("toml") => |text| Ok(toml::from_str(text)?),
            _ => anyhow::bail!("Unsupported config format for {}, expected .yaml, .yml or .toml", path.display()),
        };

        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        parse(&text).with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Merge with another config, preferring values from other
    pub fn merge(&mut self, other: Config) {
        self.bus.broker = other.bus.broker;
        self.bus.command_topic = other.bus.command_topic;
        self.bus.job_topic = other.bus.job_topic;
        if !other.bus.status_topics.is_empty() {
            self.bus.status_topics = other.bus.status_topics;
        }

        self.timing = other.timing;

        self.logging.level = other.logging.level;
        if other.logging.output.is_some() {
            self.logging.output = other.logging.output;
        }
    }
}
