//! Order-book snapshot type.
//!
//! The read-side projection served to query callers: bid and ask ladders
//! of `[price, amount]` pairs plus a `lastUpdateId` watermark. A snapshot
//! is computed fresh for every query and never cached or mutated.

use serde::{Deserialize, Serialize};

use crate::types::OrderId;

/// A point-in-time bid/ask ladder for one symbol
///
/// # Design Decisions
///
/// 1. **Pair per order**: each `[price, amount]` entry corresponds to
///    exactly one stored order; equal-price orders are not merged into a
///    single level. Consumers wanting aggregated levels fold the ladder
///    themselves.
///
/// 2. **Watermark, not freshness**: `last_update_id` is the id of the last
///    buy row the store returned for the query window, in store iteration
///    order. Treat it as an opaque watermark; it is not the globally
///    newest id.
///
/// 3. **Plain number pairs**: ladder entries are `[f64; 2]` so the wire
///    shape is a bare JSON array of numbers, no per-entry object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderBookSnapshot {
    /// Watermark from the buy-side scan (0 when no buys matched)
    pub last_update_id: OrderId,

    /// Bid ladder, price descending
    pub bids: Vec<[f64; 2]>,

    /// Ask ladder, price ascending
    pub asks: Vec<[f64; 2]>,
}

impl OrderBookSnapshot {
    /// Get the best bid as `[price, amount]`
    ///
    /// Returns `None` when no buy orders matched the query.
    #[must_use]
    pub fn best_bid(&self) -> Option<[f64; 2]> {
        self.bids.first().copied()
    }

    /// Get the best ask as `[price, amount]`
    #[must_use]
    pub fn best_ask(&self) -> Option<[f64; 2]> {
        self.asks.first().copied()
    }

    /// Get the spread between best ask and best bid
    #[must_use]
    pub fn spread(&self) -> Option<f64> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask[0] - bid[0]),
            _ => None,
        }
    }

    /// Number of entries on each side as `(bids, asks)`
    #[must_use]
    pub fn depth(&self) -> (usize, usize) {
        (self.bids.len(), self.asks.len())
    }

    /// Check if both ladders are empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}
