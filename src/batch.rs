//! Batch accumulation for order persistence.
//!
//! [`BatchAccumulator`] buffers decoded orders between flushes and decides
//! when a flush is due: when the pending count reaches the size threshold,
//! or when the oldest pending order exceeds the age threshold, whichever
//! comes first. A batch is always drained whole; there is no partial flush.
//!
//! The accumulator is owned and mutated by a single ingestion loop, so it
//! carries no interior locking. Age is tracked with [`tokio::time::Instant`]
//! so the timer participates in virtual time under `tokio::time::pause()`.

use std::time::Duration;

use tokio::time::Instant;

use crate::types::Order;

/// In-memory buffer of pending orders with size/age flush triggers
///
/// # Example
///
/// ```rust
/// use bookpipe::batch::BatchAccumulator;
/// use bookpipe::types::{Order, Side};
/// use std::time::Duration;
/// use tokio::time::Instant;
///
/// let mut batch = BatchAccumulator::new(2, Duration::from_secs(2));
/// batch.append(Order::new(Side::Buy, "BTCUSDT", 5, 99.0)?);
/// assert!(!batch.should_flush(Instant::now()));
///
/// batch.append(Order::new(Side::Sell, "BTCUSDT", 5, 101.0)?);
/// assert!(batch.should_flush(Instant::now()));
///
/// let drained = batch.drain();
/// assert_eq!(drained.len(), 2);
/// assert!(batch.is_empty());
/// # Ok::<(), bookpipe::Error>(())
/// ```
#[derive(Debug)]
pub struct BatchAccumulator {
    /// Pending orders in append order
    pending: Vec<Order>,

    /// Size threshold that makes a flush due
    max_size: usize,

    /// Age threshold that makes a flush due
    flush_interval: Duration,

    /// When the first order of the current batch arrived; `None` while empty
    opened_at: Option<Instant>,
}

impl BatchAccumulator {
    /// Create an empty accumulator with the given flush thresholds
    ///
    /// A huge `max_size` effectively disables the size trigger, leaving
    /// flushes to the age timer alone.
    #[must_use]
    pub fn new(max_size: usize, flush_interval: Duration) -> Self {
        Self {
            // max_size may be effectively unbounded, so it cannot size
            // the allocation directly
            pending: Vec::with_capacity(max_size.min(1024)),
            max_size,
            flush_interval,
            opened_at: None,
        }
    }

    /// Append one decoded order to the pending batch
    ///
    /// The first append since the last drain starts the age timer.
    pub fn append(&mut self, order: Order) {
        if self.pending.is_empty() {
            self.opened_at = Some(Instant::now());
        }
        self.pending.push(order);
    }

    /// Check whether a flush is due at `now`
    ///
    /// True when the pending count has reached the size threshold, or when
    /// a non-empty batch has aged past the flush interval. An empty batch
    /// is never due.
    #[must_use]
    pub fn should_flush(&self, now: Instant) -> bool {
        if self.pending.len() >= self.max_size {
            return true;
        }
        // opened_at is Some exactly while at least one order is pending
        match self.opened_at {
            Some(opened) => now.duration_since(opened) >= self.flush_interval,
            None => false,
        }
    }

    /// When the age trigger will fire, or `None` while the batch is empty
    ///
    /// The ingestion loop arms its timer branch with this deadline instead
    /// of polling on a fixed cadence.
    #[must_use]
    pub fn age_deadline(&self) -> Option<Instant> {
        self.opened_at.map(|opened| opened + self.flush_interval)
    }

    /// Take the full pending batch, resetting the accumulator
    ///
    /// Returns orders in append order. Draining stops the age timer; the
    /// next append restarts it.
    pub fn drain(&mut self) -> Vec<Order> {
        self.opened_at = None;
        std::mem::take(&mut self.pending)
    }

    /// Number of pending orders
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Check if no orders are pending
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Side;
    use proptest::prelude::*;

    fn make_order(i: usize) -> Order {
        let side = if i % 2 == 0 { Side::Buy } else { Side::Sell };
        Order::new(side, "BTCUSDT", i as u32, 100.0 + i as f64).unwrap()
    }

    #[test]
    fn test_size_trigger_fires_exactly_at_threshold() {
        let mut batch = BatchAccumulator::new(10, Duration::from_secs(2));
        for i in 0..9 {
            batch.append(make_order(i));
            assert!(!batch.should_flush(Instant::now()));
        }
        batch.append(make_order(9));
        assert!(batch.should_flush(Instant::now()));
    }

    #[test]
    fn test_empty_batch_is_never_due() {
        let batch = BatchAccumulator::new(10, Duration::from_secs(2));
        let far_future = Instant::now() + Duration::from_secs(3600);
        assert!(!batch.should_flush(far_future));
        assert!(batch.age_deadline().is_none());
    }

    #[test]
    fn test_age_trigger() {
        let mut batch = BatchAccumulator::new(10, Duration::from_secs(2));
        batch.append(make_order(0));

        let now = Instant::now();
        assert!(!batch.should_flush(now));
        assert!(batch.should_flush(now + Duration::from_secs(2)));
    }

    #[test]
    fn test_unbounded_size_flushes_by_age_alone() {
        // Construction must not allocate max_size up front
        let mut batch = BatchAccumulator::new(usize::MAX, Duration::from_secs(2));
        for i in 0..100 {
            batch.append(make_order(i));
        }

        let now = Instant::now();
        assert!(!batch.should_flush(now));
        assert!(batch.should_flush(now + Duration::from_secs(2)));
    }

    #[test]
    fn test_deadline_tracks_first_append() {
        let interval = Duration::from_secs(2);
        let mut batch = BatchAccumulator::new(10, interval);

        let before = Instant::now();
        batch.append(make_order(0));
        batch.append(make_order(1));
        let after = Instant::now();

        let deadline = batch.age_deadline().unwrap();
        assert!(deadline >= before + interval);
        assert!(deadline <= after + interval);
    }

    #[test]
    fn test_drain_preserves_append_order_and_resets() {
        let mut batch = BatchAccumulator::new(10, Duration::from_secs(2));
        for i in 0..5 {
            batch.append(make_order(i));
        }

        let drained = batch.drain();
        assert_eq!(drained.len(), 5);
        for (i, order) in drained.iter().enumerate() {
            assert_eq!(order.amount, i as u32);
        }

        assert!(batch.is_empty());
        assert!(batch.age_deadline().is_none());
        assert!(!batch.should_flush(Instant::now() + Duration::from_secs(10)));
    }

    #[test]
    fn test_drain_on_empty_is_a_no_op() {
        let mut batch = BatchAccumulator::new(10, Duration::from_secs(2));
        assert!(batch.drain().is_empty());
    }

    proptest! {
        #[test]
        fn prop_flush_fires_exactly_at_size_threshold(count in 1usize..40) {
            let mut batch = BatchAccumulator::new(10, Duration::from_secs(2));
            let mut flushes = 0;
            for i in 0..count {
                batch.append(make_order(i));
                if batch.should_flush(Instant::now()) {
                    let drained = batch.drain();
                    prop_assert_eq!(drained.len(), 10);
                    flushes += 1;
                }
            }
            prop_assert_eq!(flushes, count / 10);
            prop_assert_eq!(batch.len(), count % 10);
        }

        #[test]
        fn prop_drain_preserves_append_order(amounts in proptest::collection::vec(0u32..1_000, 1..30)) {
            let mut batch = BatchAccumulator::new(usize::MAX, Duration::from_secs(2));
            for &amount in &amounts {
                batch.append(make_order(amount as usize));
            }
            let drained: Vec<u32> = batch.drain().iter().map(|order| order.amount).collect();
            prop_assert_eq!(drained, amounts);
        }
    }
}
