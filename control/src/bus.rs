//! Publish/subscribe capability the engine is built on.
//!
//! The production transport (Kafka) lives outside this crate and plugs in
//! through [`Bus`]. [`MemoryBus`] is an in-process broadcast bus used for
//! loopback setups and tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;

use crate::error::BusError;

/// Stream of raw payloads delivered to one subscriber.
pub type Subscription = mpsc::UnboundedReceiver<Vec<u8>>;

pub trait Bus: Send + Sync {
    /// Fails when no broker can be reached.
    fn ensure_reachable(&self) -> Result<(), BusError>;

    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), BusError>;

    fn subscribe(&self, topics: &[String]) -> Result<Subscription, BusError>;
}

struct Subscriber {
    topics: Vec<String>,
    sender: mpsc::UnboundedSender<Vec<u8>>,
}

#[derive(Default)]
struct MemoryBusInner {
    subscribers: Mutex<Vec<Subscriber>>,
    published: Mutex<Vec<(String, Vec<u8>)>>,
    unreachable: AtomicBool,
    fail_publish: AtomicBool,
}

/// Broadcast bus kept in process memory. Clones share the same bus.
#[derive(Clone, Default)]
pub struct MemoryBus {
    inner: Arc<MemoryBusInner>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a broker that cannot be reached.
    pub fn set_reachable(&self, reachable: bool) {
        self.inner.unreachable.store(!reachable, Ordering::SeqCst);
    }

    /// Make every subsequent publish fail.
    pub fn set_fail_publish(&self, fail: bool) {
        self.inner.fail_publish.store(fail, Ordering::SeqCst);
    }

    /// Every payload published so far, in publish order.
    pub fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.inner
            .published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn published_on(&self, topic: &str) -> Vec<Vec<u8>> {
        self.published()
            .into_iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, payload)| payload)
            .collect()
    }

    fn address(&self) -> String {
        "memory".to_string()
    }
}

impl Bus for MemoryBus {
    fn ensure_reachable(&self) -> Result<(), BusError> {
        if self.inner.unreachable.load(Ordering::SeqCst) {
            return Err(BusError::Unreachable(self.address()));
        }
        Ok(())
    }

    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), BusError> {
        self.ensure_reachable()?;
        if self.inner.fail_publish.load(Ordering::SeqCst) {
            return Err(BusError::Publish {
                topic: topic.to_string(),
                reason: "publishing disabled".to_string(),
            });
        }

        self.inner
            .published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((topic.to_string(), payload.clone()));

        let mut subscribers = self
            .inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // Closed receivers are pruned as we go
        subscribers.retain(|sub| {
            if !sub.topics.iter().any(|t| t == topic) {
                return !sub.sender.is_closed();
            }
            sub.sender.send(payload.clone()).is_ok()
        });
        Ok(())
    }

    fn subscribe(&self, topics: &[String]) -> Result<Subscription, BusError> {
        self.ensure_reachable()?;
        if topics.is_empty() {
            return Err(BusError::Subscribe("no topics given".to_string()));
        }
        let (sender, receiver) = mpsc::unbounded_channel();
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Subscriber {
                topics: topics.to_vec(),
                sender,
            });
        Ok(receiver)
    }
}
