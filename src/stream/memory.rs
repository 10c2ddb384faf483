//! In-process event stream.
//!
//! [`MemoryTopic`] implements [`StreamSource`] over bounded tokio channels:
//! one message channel and one error channel per partition.
//! [`TopicPublisher`] routes each payload to a partition by hashing its
//! key, so all orders for one symbol land on the same partition and keep
//! their arrival order end to end.
//!
//! The message channels close when every publisher clone has been dropped,
//! which downstream consumers treat as end of stream.

use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHasher;
use tokio::sync::mpsc;

use crate::error::Error;
use crate::stream::{PartitionError, PartitionFeed, PartitionId, StreamMessage, StreamSource};

/// Channel capacity per partition
const PARTITION_BUFFER: usize = 256;

/// In-memory partitioned topic
///
/// Created together with its [`TopicPublisher`]; the topic side owns the
/// unclaimed feeds, the publisher side owns the senders.
pub struct MemoryTopic {
    name: String,
    feeds: Vec<Mutex<Option<PartitionFeed>>>,
}

impl MemoryTopic {
    /// Create a topic with a fixed partition count and its publisher
    ///
    /// # Panics
    ///
    /// Panics if `partitions` is zero.
    #[must_use]
    pub fn new(name: impl Into<String>, partitions: usize) -> (Self, TopicPublisher) {
        assert!(partitions > 0, "a topic needs at least one partition");

        let name = name.into();
        let mut feeds = Vec::with_capacity(partitions);
        let mut messages = Vec::with_capacity(partitions);
        let mut errors = Vec::with_capacity(partitions);
        let mut offsets = Vec::with_capacity(partitions);

        for _ in 0..partitions {
            let (msg_tx, msg_rx) = mpsc::channel(PARTITION_BUFFER);
            let (err_tx, err_rx) = mpsc::channel(PARTITION_BUFFER);
            feeds.push(Mutex::new(Some(PartitionFeed {
                messages: msg_rx,
                errors: err_rx,
            })));
            messages.push(msg_tx);
            errors.push(err_tx);
            offsets.push(AtomicU64::new(0));
        }

        let publisher = TopicPublisher {
            topic: name.clone(),
            messages,
            errors,
            offsets: Arc::new(offsets),
        };
        (Self { name, feeds }, publisher)
    }

    fn partition_index(&self, partition: PartitionId) -> Result<usize, Error> {
        usize::try_from(partition)
            .ok()
            .filter(|idx| *idx < self.feeds.len())
            .ok_or_else(|| Error::Stream(format!("unknown partition {partition}")))
    }
}

impl StreamSource for MemoryTopic {
    fn topic(&self) -> &str {
        &self.name
    }

    fn partitions(&self) -> Result<Vec<PartitionId>, Error> {
        Ok((0..self.feeds.len()).map(|p| p as PartitionId).collect())
    }

    fn subscribe(&self, partition: PartitionId) -> Result<PartitionFeed, Error> {
        let idx = self.partition_index(partition)?;
        self.feeds[idx]
            .lock()
            .take()
            .ok_or_else(|| Error::Stream(format!("partition {partition} already subscribed")))
    }
}

/// Publishing side of a [`MemoryTopic`]
///
/// Cheap to clone; clones share the per-partition offset counters, so
/// offsets stay unique within a partition no matter how many producers
/// exist.
#[derive(Clone)]
pub struct TopicPublisher {
    topic: String,
    messages: Vec<mpsc::Sender<StreamMessage>>,
    errors: Vec<mpsc::Sender<PartitionError>>,
    offsets: Arc<Vec<AtomicU64>>,
}

impl TopicPublisher {
    /// Name of the topic this publisher feeds
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Number of partitions on the topic
    pub fn partition_count(&self) -> usize {
        self.messages.len()
    }

    /// Publish a payload under a routing key
    ///
    /// Returns the partition and offset the message landed on. Blocks when
    /// the target partition's buffer is full (backpressure).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Stream`] if the partition's feed has been dropped.
    pub async fn publish(&self, key: &str, payload: Vec<u8>) -> Result<(PartitionId, u64), Error> {
        let partition = self.partition_for(key);
        let idx = partition as usize;
        let offset = self.offsets[idx].fetch_add(1, Ordering::Relaxed);

        let message = StreamMessage {
            partition,
            offset,
            key: key.to_string(),
            payload,
        };
        self.messages[idx]
            .send(message)
            .await
            .map_err(|_| Error::Stream(format!("partition {partition} feed closed")))?;
        Ok((partition, offset))
    }

    /// Report a transport error on one partition's error channel
    ///
    /// # Errors
    ///
    /// Returns [`Error::Stream`] if the partition does not exist or its
    /// feed has been dropped.
    pub async fn inject_error(
        &self,
        partition: PartitionId,
        message: impl Into<String>,
    ) -> Result<(), Error> {
        let idx = usize::try_from(partition)
            .ok()
            .filter(|idx| *idx < self.errors.len())
            .ok_or_else(|| Error::Stream(format!("unknown partition {partition}")))?;
        self.errors[idx]
            .send(PartitionError {
                partition,
                message: message.into(),
            })
            .await
            .map_err(|_| Error::Stream(format!("partition {partition} feed closed")))
    }

    fn partition_for(&self, key: &str) -> PartitionId {
        let mut hasher = FxHasher::default();
        key.hash(&mut hasher);
        (hasher.finish() % self.messages.len() as u64) as PartitionId
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_same_key_keeps_partition_and_order() {
        let (topic, publisher) = MemoryTopic::new("orders", 4);

        let mut landed = None;
        for i in 0..5u8 {
            let (partition, offset) = publisher.publish("BTCUSDT", vec![i]).await.unwrap();
            assert_eq!(offset, u64::from(i));
            match landed {
                None => landed = Some(partition),
                Some(p) => assert_eq!(partition, p),
            }
        }

        let mut feed = topic.subscribe(landed.unwrap()).unwrap();
        for i in 0..5u8 {
            let msg = feed.messages.recv().await.unwrap();
            assert_eq!(msg.payload, vec![i]);
            assert_eq!(msg.offset, u64::from(i));
            assert_eq!(msg.key, "BTCUSDT");
        }
    }

    #[tokio::test]
    async fn test_partition_within_range() {
        let (_topic, publisher) = MemoryTopic::new("orders", 3);
        for key in ["BTCUSDT", "BTCETH", "BTCIRT", "DOGEUSDT"] {
            let (partition, _) = publisher.publish(key, vec![]).await.unwrap();
            assert!((0..3).contains(&partition));
        }
    }

    #[tokio::test]
    async fn test_subscribe_twice_fails() {
        let (topic, _publisher) = MemoryTopic::new("orders", 1);
        let _feed = topic.subscribe(0).unwrap();
        let err = topic.subscribe(0).unwrap_err();
        assert!(matches!(err, Error::Stream(_)));
    }

    #[tokio::test]
    async fn test_subscribe_unknown_partition_fails() {
        let (topic, _publisher) = MemoryTopic::new("orders", 2);
        assert!(topic.subscribe(7).is_err());
        assert!(topic.subscribe(-1).is_err());
    }

    #[tokio::test]
    async fn test_error_channel_is_separate() {
        let (topic, publisher) = MemoryTopic::new("orders", 1);
        let mut feed = topic.subscribe(0).unwrap();

        publisher.publish("BTCUSDT", b"payload".to_vec()).await.unwrap();
        publisher.inject_error(0, "broker connection reset").await.unwrap();

        let msg = feed.messages.recv().await.unwrap();
        assert_eq!(msg.payload, b"payload");
        let err = feed.errors.recv().await.unwrap();
        assert_eq!(err.partition, 0);
        assert!(err.message.contains("reset"));
    }

    #[tokio::test]
    async fn test_publish_to_dropped_feed_fails() {
        let (topic, publisher) = MemoryTopic::new("orders", 1);
        let feed = topic.subscribe(0).unwrap();
        drop(feed);

        let err = publisher.publish("BTCUSDT", vec![]).await.unwrap_err();
        assert!(matches!(err, Error::Stream(_)));
    }

    #[tokio::test]
    async fn test_clones_share_offsets() {
        let (_topic, publisher) = MemoryTopic::new("orders", 1);
        let clone = publisher.clone();

        let (_, first) = publisher.publish("BTCUSDT", vec![]).await.unwrap();
        let (_, second) = clone.publish("BTCUSDT", vec![]).await.unwrap();
        assert_eq!(first, 0);
        assert_eq!(second, 1);
    }
}
