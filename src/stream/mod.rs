//! Event stream source abstraction.
//!
//! The ingestion loop consumes a partitioned, ordered event stream through
//! the [`StreamSource`] trait: enumerate the partitions of a topic, claim a
//! feed per partition, and receive raw messages and transport errors on
//! separate channels. Arrival order is preserved within a partition and
//! undefined across partitions.
//!
//! - [`memory`] - In-process topic used by the service binary and tests

pub mod memory;

pub use memory::{MemoryTopic, TopicPublisher};

use tokio::sync::mpsc;

use crate::error::Error;

/// Stream partition number
pub type PartitionId = i32;

/// A raw message received from one partition
#[derive(Debug, Clone, PartialEq)]
pub struct StreamMessage {
    /// Partition the message arrived on
    pub partition: PartitionId,

    /// Position within the partition
    pub offset: u64,

    /// Routing key the producer published under (the symbol)
    pub key: String,

    /// Undecoded payload
    pub payload: Vec<u8>,
}

/// A transport-level error reported by one partition
///
/// Delivered on a channel separate from messages; consumers log these and
/// keep consuming.
#[derive(Debug, Clone)]
pub struct PartitionError {
    /// Partition that reported the error
    pub partition: PartitionId,

    /// Human-readable description
    pub message: String,
}

impl std::fmt::Display for PartitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "partition {}: {}", self.partition, self.message)
    }
}

/// Receiving side of one partition subscription
#[derive(Debug)]
pub struct PartitionFeed {
    /// Messages in partition arrival order
    pub messages: mpsc::Receiver<StreamMessage>,

    /// Transport errors for this partition
    pub errors: mpsc::Receiver<PartitionError>,
}

/// A partitioned, ordered event stream
///
/// Implementations must preserve per-partition arrival order and hand out
/// each partition's feed at most once.
pub trait StreamSource: Send + Sync {
    /// Name of the topic this source serves
    fn topic(&self) -> &str;

    /// Enumerate the partitions currently available
    fn partitions(&self) -> Result<Vec<PartitionId>, Error>;

    /// Claim the feed for one partition
    ///
    /// # Errors
    ///
    /// Returns [`Error::Stream`] if the partition does not exist or its
    /// feed was already claimed.
    fn subscribe(&self, partition: PartitionId) -> Result<PartitionFeed, Error>;
}
