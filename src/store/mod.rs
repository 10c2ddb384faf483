//! Durable order storage.
//!
//! [`OrderStore`] is the persistence seam of the pipeline: batch inserts
//! assign monotonically increasing identifiers and make rows visible to
//! queries, and side/symbol queries return rows in arrival order,
//! optionally restricted to a [`PriceBand`].
//!
//! - [`journal`] - Append-only file-backed store
//! - [`memory`] - In-memory store for tests and ephemeral runs

pub mod journal;
pub mod memory;

pub use journal::JournalStore;
pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::error::Error;
use crate::types::{Order, OrderId, Price, Side, StoredOrder};

/// Inclusive price interval for snapshot queries
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceBand {
    /// Lower bound, inclusive
    pub low: Price,
    /// Upper bound, inclusive
    pub high: Price,
}

impl PriceBand {
    /// Build the band `[reference - half_width, reference + half_width]`
    ///
    /// Returns `None` unless `half_width` is present and positive; a query
    /// without a band is unrestricted.
    #[must_use]
    pub fn around(reference: Price, half_width: Option<Price>) -> Option<Self> {
        match half_width {
            Some(width) if width > 0.0 => Some(Self {
                low: reference - width,
                high: reference + width,
            }),
            _ => None,
        }
    }

    /// Check whether a price lies inside the band
    #[must_use]
    pub fn contains(&self, price: Price) -> bool {
        price >= self.low && price <= self.high
    }
}

/// Batch-oriented, append-only order persistence
///
/// Implementations must tolerate concurrent callers: the ingestion loop
/// inserts while snapshot queries read.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist a batch, assigning each order the next identifier
    ///
    /// Identifiers are unique and monotonically increasing in append
    /// order. On success every row of the batch is visible to subsequent
    /// queries. An empty batch is a no-op.
    async fn insert_batch(&self, orders: &[Order]) -> Result<Vec<OrderId>, Error>;

    /// Fetch orders for one side of one symbol, in arrival order
    ///
    /// When `band` is present, only orders priced inside it are returned.
    async fn query_by_side(
        &self,
        symbol: &str,
        side: Side,
        band: Option<PriceBand>,
    ) -> Result<Vec<StoredOrder>, Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_requires_positive_half_width() {
        assert!(PriceBand::around(100.0, None).is_none());
        assert!(PriceBand::around(100.0, Some(0.0)).is_none());
        assert!(PriceBand::around(100.0, Some(-2.0)).is_none());
    }

    #[test]
    fn test_band_is_inclusive() {
        let band = PriceBand::around(100.0, Some(5.0)).unwrap();
        assert_eq!(band.low, 95.0);
        assert_eq!(band.high, 105.0);
        assert!(band.contains(95.0));
        assert!(band.contains(105.0));
        assert!(!band.contains(94.999));
        assert!(!band.contains(105.001));
    }
}
