//! # In-memory loopback broker.
//!
//! [`MemoryBroker`] implements [`Broker`](crate::Broker) over per-channel
//! `mpsc` queues in the current process. A publish is delivered to **all**
//! current subscribers of the channel — including the publisher's own
//! subscription, reproducing the echo behavior of real cluster brokers that
//! the dedup tracker exists to suppress.
//!
//! Useful for tests and for single-process deployments where cluster fan-out
//! degenerates to a loopback.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{mpsc, RwLock};

use crate::broker::Broker;
use crate::error::BrokerError;

/// Per-subscriber queue capacity.
const SUBSCRIBER_QUEUE: usize = 1024;

/// Loopback broker over in-process channels.
#[derive(Default)]
pub struct MemoryBroker {
    topics: RwLock<HashMap<String, Vec<mpsc::Sender<String>>>>,
}

impl MemoryBroker {
    /// Creates an empty broker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn publish(&self, channel: &str, payload: &str) -> Result<(), BrokerError> {
        // Snapshot senders, then deliver without holding the lock.
        let senders = {
            let topics = self.topics.read().await;
            topics.get(channel).cloned().unwrap_or_default()
        };
        for tx in senders {
            // A gone subscriber is not a publish failure.
            let _ = tx.send(payload.to_string()).await;
        }
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<mpsc::Receiver<String>, BrokerError> {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_QUEUE);
        let mut topics = self.topics.write().await;
        topics.entry(channel.to_string()).or_default().push(tx);
        Ok(rx)
    }

    async fn unsubscribe(&self, channel: &str) -> Result<(), BrokerError> {
        let mut topics = self.topics.write().await;
        topics.remove(channel);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_all_subscribers_including_publisher() {
        let broker = MemoryBroker::new();
        let mut a = broker.subscribe("c").await.unwrap();
        let mut b = broker.subscribe("c").await.unwrap();

        broker.publish("c", "hello").await.unwrap();

        assert_eq!(a.recv().await.as_deref(), Some("hello"));
        assert_eq!(b.recv().await.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn test_channels_are_isolated() {
        let broker = MemoryBroker::new();
        let mut a = broker.subscribe("a").await.unwrap();

        broker.publish("b", "for-b").await.unwrap();
        broker.publish("a", "for-a").await.unwrap();

        assert_eq!(a.recv().await.as_deref(), Some("for-a"));
    }

    #[tokio::test]
    async fn test_unsubscribe_ends_the_stream() {
        let broker = MemoryBroker::new();
        let mut rx = broker.subscribe("c").await.unwrap();

        broker.unsubscribe("c").await.unwrap();
        broker.publish("c", "late").await.unwrap();

        assert_eq!(rx.recv().await, None);
    }
}
