//! Stream ingestion loop.
//!
//! One [`IngestLoop`] per process drives the whole write path. A pump task
//! per partition decodes raw messages and forwards orders into one bounded
//! channel; the loop multiplexes that channel against the batch age timer
//! and the shutdown signal, so an idle wait is preempted by whichever
//! fires first. Flushes hand the drained batch to the order store under a
//! bounded retry policy covering transient failures; exhausting the
//! policy, or a failure retrying cannot help, is fatal to the run.
//!
//! Undecodable messages are logged and skipped without disturbing the
//! batch. Partition transport errors are logged and never terminate the
//! loop. Closure of the event channel (all publishers gone) drains and
//! stops the loop just like a shutdown signal.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use bookpipe::config::Config;
//! use bookpipe::ingest::IngestLoop;
//! use bookpipe::store::MemoryStore;
//! use bookpipe::stream::MemoryTopic;
//! use tokio::sync::watch;
//!
//! # async fn run() -> Result<(), bookpipe::Error> {
//! let (topic, _publisher) = MemoryTopic::new("orders", 4);
//! let store = Arc::new(MemoryStore::new());
//! let (_shutdown_tx, shutdown_rx) = watch::channel(false);
//!
//! let ingest = IngestLoop::start(&Config::new(), &topic, store, shutdown_rx)?;
//! let stats = ingest.run().await?;
//! println!("persisted {} orders in {} batches", stats.orders, stats.batches);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, error, info, warn};

use crate::batch::BatchAccumulator;
use crate::config::{Config, RetryPolicy};
use crate::error::Error;
use crate::store::OrderStore;
use crate::stream::{PartitionFeed, PartitionId, StreamSource};
use crate::types::Order;

/// Lifecycle states of the ingestion loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestState {
    /// Consuming and accumulating
    Running,
    /// A drained batch is with the store
    Flushing,
    /// Shutdown observed; performing the final flush
    Draining,
    /// Terminal
    Stopped,
}

/// Counters reported by a completed run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Orders appended to batches
    pub orders: u64,
    /// Batches handed to the store
    pub batches: u64,
}

/// Single-writer ingestion loop over a partitioned stream
///
/// Owns the batch accumulator exclusively; nothing else appends to or
/// drains it. The store handle is shared and must tolerate concurrent
/// snapshot queries while the loop inserts.
pub struct IngestLoop {
    batch: BatchAccumulator,
    store: Arc<dyn OrderStore>,
    retry: RetryPolicy,
    events: mpsc::Receiver<Order>,
    shutdown: watch::Receiver<bool>,
    pumps: Vec<JoinHandle<()>>,
    state: IngestState,
    stats: IngestStats,
}

impl IngestLoop {
    /// Subscribe to every partition and spawn the decode pumps
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for a zero batch size and
    /// [`Error::Stream`] when a partition cannot be subscribed.
    pub fn start(
        config: &Config,
        source: &dyn StreamSource,
        store: Arc<dyn OrderStore>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self, Error> {
        if config.max_batch_size() == 0 {
            return Err(Error::Config(
                "max_batch_size must be at least 1".to_string(),
            ));
        }

        let partitions = source.partitions()?;
        let (tx, events) = mpsc::channel(config.channel_capacity());

        let mut pumps = Vec::with_capacity(partitions.len());
        for partition in partitions {
            let feed = source.subscribe(partition)?;
            pumps.push(spawn_pump(partition, feed, tx.clone(), shutdown.clone()));
        }
        // The loop's receiver must close once every pump is gone
        drop(tx);

        info!(
            topic = source.topic(),
            partitions = pumps.len(),
            max_batch_size = config.max_batch_size(),
            flush_interval_ms = config.flush_interval().as_millis() as u64,
            "ingestion started"
        );
        Ok(Self {
            batch: BatchAccumulator::new(config.max_batch_size(), config.flush_interval()),
            store,
            retry: config.retry_policy().clone(),
            events,
            shutdown,
            pumps,
            state: IngestState::Running,
            stats: IngestStats::default(),
        })
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> IngestState {
        self.state
    }

    /// Drive the loop until shutdown or end of stream
    ///
    /// Performs a final drain flush of any pending orders before
    /// returning the run's counters. A flush that fails for good aborts
    /// the run with [`Error::FlushExhausted`]; the drained batch is not
    /// re-queued.
    pub async fn run(mut self) -> Result<IngestStats, Error> {
        loop {
            let deadline = self.batch.age_deadline();
            tokio::select! {
                _ = self.shutdown.changed() => {
                    info!("shutdown signal received");
                    break;
                }
                maybe = self.events.recv() => match maybe {
                    Some(order) => {
                        debug!(symbol = %order.symbol, side = ?order.side, "order buffered");
                        self.batch.append(order);
                        self.stats.orders += 1;
                        if self.batch.should_flush(Instant::now()) {
                            self.flush().await?;
                        }
                    }
                    None => {
                        info!("stream closed");
                        break;
                    }
                },
                () = sleep_until_opt(deadline) => {
                    self.flush().await?;
                }
            }
        }

        self.state = IngestState::Draining;
        if !self.batch.is_empty() {
            info!(pending = self.batch.len(), "draining pending batch");
        }
        self.flush().await?;

        for pump in &self.pumps {
            pump.abort();
        }
        self.state = IngestState::Stopped;
        info!(
            orders = self.stats.orders,
            batches = self.stats.batches,
            "ingestion stopped"
        );
        Ok(self.stats)
    }

    /// Hand the drained batch to the store, retrying transient failures
    /// under the policy; a non-transient failure escalates immediately
    async fn flush(&mut self) -> Result<(), Error> {
        let orders = self.batch.drain();
        if orders.is_empty() {
            return Ok(());
        }
        if self.state == IngestState::Running {
            self.state = IngestState::Flushing;
        }

        let mut attempt: u32 = 0;
        loop {
            match self.store.insert_batch(&orders).await {
                Ok(ids) => {
                    self.stats.batches += 1;
                    info!(
                        count = orders.len(),
                        first_id = ids.first().copied().unwrap_or_default(),
                        "batch persisted"
                    );
                    if self.state == IngestState::Flushing {
                        self.state = IngestState::Running;
                    }
                    return Ok(());
                }
                Err(err) if attempt < self.retry.max_retries && err.is_transient() => {
                    let delay = self.retry.delay_for_attempt(attempt);
                    warn!(
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "batch insert failed, retrying"
                    );
                    time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    error!(
                        attempts = attempt + 1,
                        error = %err,
                        "batch insert failed, giving up"
                    );
                    return Err(Error::FlushExhausted {
                        attempts: attempt + 1,
                        source: Box::new(err),
                    });
                }
            }
        }
    }
}

/// Sleep until the deadline, or forever when there is none
async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Spawn the decode pump for one partition
fn spawn_pump(
    partition: PartitionId,
    mut feed: PartitionFeed,
    tx: mpsc::Sender<Order>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut errors_open = true;
        loop {
            tokio::select! {
                maybe = feed.messages.recv() => match maybe {
                    Some(message) => match Order::decode(&message.payload) {
                        Ok(order) => {
                            if tx.send(order).await.is_err() {
                                break;
                            }
                        }
                        Err(err) => {
                            warn!(
                                partition,
                                offset = message.offset,
                                error = %err,
                                "skipping undecodable message"
                            );
                        }
                    },
                    None => break,
                },
                maybe = feed.errors.recv(), if errors_open => match maybe {
                    Some(err) => {
                        warn!(partition = err.partition, error = %err.message, "partition error");
                    }
                    None => errors_open = false,
                },
                _ = shutdown.changed() => break,
            }
        }
        debug!(partition, "pump stopped");
    })
}
