use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for the correlation engine, exported in Prometheus text format.
pub struct ControlMetrics {
    messages_ingested: DashMap<&'static str, AtomicU64>,
    commands_dispatched: DashMap<&'static str, AtomicU64>,
    decode_failures: AtomicU64,
    stale_updates: AtomicU64,
    ignored_updates: AtomicU64,
    publish_failures: AtomicU64,
}

impl ControlMetrics {
    pub fn new() -> Self {
        Self {
            messages_ingested: DashMap::new(),
            commands_dispatched: DashMap::new(),
            decode_failures: AtomicU64::new(0),
            stale_updates: AtomicU64::new(0),
            ignored_updates: AtomicU64::new(0),
            publish_failures: AtomicU64::new(0),
        }
    }

    /// `kind` is the schema tag of the ingested message.
    pub fn record_ingested(&self, kind: &'static str) {
        self.messages_ingested
            .entry(kind)
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dispatched(&self, kind: &'static str) {
        self.commands_dispatched
            .entry(kind)
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale_update(&self) {
        self.stale_updates.fetch_add(1, Ordering::Relaxed);
    }

    /// Status that is well formed but carries nothing to store.
    pub fn record_ignored_update(&self) {
        self.ignored_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_publish_failure(&self) {
        self.publish_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn ingested(&self, kind: &str) -> u64 {
        self.messages_ingested
            .get(kind)
            .map(|count| count.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn dispatched(&self, kind: &str) -> u64 {
        self.commands_dispatched
            .get(kind)
            .map(|count| count.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn decode_failures(&self) -> u64 {
        self.decode_failures.load(Ordering::Relaxed)
    }

    pub fn stale_updates(&self) -> u64 {
        self.stale_updates.load(Ordering::Relaxed)
    }

    pub fn ignored_updates(&self) -> u64 {
        self.ignored_updates.load(Ordering::Relaxed)
    }

    pub fn publish_failures(&self) -> u64 {
        self.publish_failures.load(Ordering::Relaxed)
    }

    /// Generate Prometheus-compatible metrics output
    pub fn export(&self) -> String {
        let mut output = String::new();

        output.push_str("# HELP fwctl_messages_ingested_total Status messages applied from the bus\n");
        output.push_str("# TYPE fwctl_messages_ingested_total counter\n");
        let mut ingested: Vec<_> = self
            .messages_ingested
            .iter()
            .map(|entry| (*entry.key(), entry.value().load(Ordering::Relaxed)))
            .collect();
        ingested.sort_unstable();
        for (kind, count) in ingested {
            output.push_str(&format!("fwctl_messages_ingested_total{{schema=\"{}\"}} {}\n", kind, count));
        }
        output.push('\n');

        output.push_str("# HELP fwctl_commands_dispatched_total Commands published to the bus\n");
        output.push_str("# TYPE fwctl_commands_dispatched_total counter\n");
        let mut dispatched: Vec<_> = self
            .commands_dispatched
            .iter()
            .map(|entry| (*entry.key(), entry.value().load(Ordering::Relaxed)))
            .collect();
        dispatched.sort_unstable();
        for (kind, count) in dispatched {
            output.push_str(&format!("fwctl_commands_dispatched_total{{schema=\"{}\"}} {}\n", kind, count));
        }
        output.push('\n');

        output.push_str("# HELP fwctl_decode_failures_total Bus messages dropped because they could not be decoded\n");
        output.push_str("# TYPE fwctl_decode_failures_total counter\n");
        output.push_str(&format!("fwctl_decode_failures_total {}\n\n", self.decode_failures()));

        output.push_str("# HELP fwctl_stale_updates_total Status updates older than the stored state\n");
        output.push_str("# TYPE fwctl_stale_updates_total counter\n");
        output.push_str(&format!("fwctl_stale_updates_total {}\n\n", self.stale_updates()));

        output.push_str("# HELP fwctl_ignored_updates_total Status updates with nothing to store\n");
        output.push_str("# TYPE fwctl_ignored_updates_total counter\n");
        output.push_str(&format!("fwctl_ignored_updates_total {}\n\n", self.ignored_updates()));

        output.push_str("# HELP fwctl_publish_failures_total Commands that could not be published\n");
        output.push_str("# TYPE fwctl_publish_failures_total counter\n");
        output.push_str(&format!("fwctl_publish_failures_total {}\n", self.publish_failures()));

        output
    }
}

impl Default for ControlMetrics {
    fn default() -> Self {
        Self::new()
    }
}
