//! Snapshot assembly from the durable store.
//!
//! [`SnapshotBuilder`] re-derives a bid/ask ladder on every call: resolve
//! the symbol's reference price, query both sides of the store inside the
//! optional price band, stable-sort each side by price, and shape the rows
//! into `[price, amount]` pairs. Nothing is cached between calls; the
//! store is the single source of truth.

use std::sync::Arc;

use tracing::debug;

use crate::book::OrderBookSnapshot;
use crate::error::Error;
use crate::oracle::PriceOracle;
use crate::store::{OrderStore, PriceBand};
use crate::types::{Price, Side, StoredOrder};

/// Builds order-book snapshots for query callers
pub struct SnapshotBuilder {
    store: Arc<dyn OrderStore>,
    oracle: Arc<dyn PriceOracle>,
}

impl SnapshotBuilder {
    /// Create a builder over a store and a price oracle
    #[must_use]
    pub fn new(store: Arc<dyn OrderStore>, oracle: Arc<dyn PriceOracle>) -> Self {
        Self { store, oracle }
    }

    /// Build a snapshot for `symbol`
    ///
    /// When `half_width` is positive, only orders priced within
    /// `[reference - half_width, reference + half_width]` appear, with the
    /// reference price resolved through the oracle. Bids sort descending
    /// and asks ascending by price; equal prices keep their store arrival
    /// order (stable sort, no secondary key).
    ///
    /// `last_update_id` is the id of the final buy row in store iteration
    /// order, taken before sorting, or `0` when no buy rows matched. It is
    /// an opaque watermark, not a freshness marker.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SymbolNotFound`] when the oracle does not know the
    /// symbol; store and oracle transport failures propagate as transient
    /// errors.
    pub async fn build(
        &self,
        symbol: &str,
        half_width: Option<Price>,
    ) -> Result<OrderBookSnapshot, Error> {
        let reference = self.oracle.reference_price(symbol).await?;
        let band = PriceBand::around(reference, half_width);

        let buys = self.store.query_by_side(symbol, Side::Buy, band).await?;
        let sells = self.store.query_by_side(symbol, Side::Sell, band).await?;

        // Watermark comes from the unsorted scan, so capture it first
        let last_update_id = buys.last().map_or(0, |order| order.id);

        let mut bids = buys;
        bids.sort_by(|a, b| b.price.total_cmp(&a.price));
        let mut asks = sells;
        asks.sort_by(|a, b| a.price.total_cmp(&b.price));

        debug!(
            symbol,
            reference,
            bids = bids.len(),
            asks = asks.len(),
            "snapshot built"
        );
        Ok(OrderBookSnapshot {
            last_update_id,
            bids: bids.iter().map(to_pair).collect(),
            asks: asks.iter().map(to_pair).collect(),
        })
    }
}

fn to_pair(order: &StoredOrder) -> [f64; 2] {
    [order.price, f64::from(order.amount)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::StaticOracle;
    use crate::store::MemoryStore;
    use crate::types::Order;

    fn order(side: Side, symbol: &str, amount: u32, price: f64) -> Order {
        Order::new(side, symbol, amount, price).unwrap()
    }

    async fn builder_with(batch: Vec<Order>) -> SnapshotBuilder {
        let store = Arc::new(MemoryStore::new());
        store.insert_batch(&batch).await.unwrap();
        let oracle = Arc::new(
            StaticOracle::new()
                .with_price("BTCUSDT", 100.0)
                .with_price("BTCETH", 200.0),
        );
        SnapshotBuilder::new(store, oracle)
    }

    #[tokio::test]
    async fn test_band_limits_both_sides() {
        let builder = builder_with(vec![
            order(Side::Buy, "BTCUSDT", 1, 94.0),
            order(Side::Buy, "BTCUSDT", 2, 95.0),
            order(Side::Buy, "BTCUSDT", 3, 99.0),
            order(Side::Sell, "BTCUSDT", 4, 105.0),
            order(Side::Sell, "BTCUSDT", 5, 106.0),
        ])
        .await;

        let snapshot = builder.build("BTCUSDT", Some(5.0)).await.unwrap();
        let bid_prices: Vec<f64> = snapshot.bids.iter().map(|p| p[0]).collect();
        let ask_prices: Vec<f64> = snapshot.asks.iter().map(|p| p[0]).collect();
        assert_eq!(bid_prices, vec![99.0, 95.0]);
        assert_eq!(ask_prices, vec![105.0]);
    }

    #[tokio::test]
    async fn test_no_half_width_is_unrestricted() {
        let builder = builder_with(vec![
            order(Side::Buy, "BTCUSDT", 1, 10.0),
            order(Side::Sell, "BTCUSDT", 2, 500.0),
        ])
        .await;

        let snapshot = builder.build("BTCUSDT", None).await.unwrap();
        assert_eq!(snapshot.depth(), (1, 1));
    }

    #[tokio::test]
    async fn test_bids_descend_asks_ascend() {
        let builder = builder_with(vec![
            order(Side::Buy, "BTCUSDT", 1, 97.0),
            order(Side::Buy, "BTCUSDT", 2, 99.0),
            order(Side::Buy, "BTCUSDT", 3, 98.0),
            order(Side::Sell, "BTCUSDT", 4, 103.0),
            order(Side::Sell, "BTCUSDT", 5, 101.0),
            order(Side::Sell, "BTCUSDT", 6, 102.0),
        ])
        .await;

        let snapshot = builder.build("BTCUSDT", None).await.unwrap();
        let bid_prices: Vec<f64> = snapshot.bids.iter().map(|p| p[0]).collect();
        let ask_prices: Vec<f64> = snapshot.asks.iter().map(|p| p[0]).collect();
        assert_eq!(bid_prices, vec![99.0, 98.0, 97.0]);
        assert_eq!(ask_prices, vec![101.0, 102.0, 103.0]);
    }

    #[tokio::test]
    async fn test_equal_prices_keep_arrival_order() {
        let builder = builder_with(vec![
            order(Side::Buy, "BTCUSDT", 11, 99.0),
            order(Side::Buy, "BTCUSDT", 22, 99.0),
            order(Side::Buy, "BTCUSDT", 33, 99.0),
        ])
        .await;

        let snapshot = builder.build("BTCUSDT", None).await.unwrap();
        let amounts: Vec<f64> = snapshot.bids.iter().map(|p| p[1]).collect();
        assert_eq!(amounts, vec![11.0, 22.0, 33.0]);
    }

    #[tokio::test]
    async fn test_watermark_uses_pre_sort_order() {
        // Arrival order: ids 1..=3; the highest price arrives first, so
        // sorting moves id 1 to the front while the watermark stays 3
        let builder = builder_with(vec![
            order(Side::Buy, "BTCUSDT", 1, 99.0),
            order(Side::Buy, "BTCUSDT", 2, 97.0),
            order(Side::Buy, "BTCUSDT", 3, 98.0),
        ])
        .await;

        let snapshot = builder.build("BTCUSDT", None).await.unwrap();
        assert_eq!(snapshot.bids[0], [99.0, 1.0]);
        assert_eq!(snapshot.last_update_id, 3);
    }

    #[tokio::test]
    async fn test_watermark_zero_without_buys() {
        let builder = builder_with(vec![order(Side::Sell, "BTCUSDT", 1, 101.0)]).await;
        let snapshot = builder.build("BTCUSDT", None).await.unwrap();
        assert_eq!(snapshot.last_update_id, 0);
        assert_eq!(snapshot.depth(), (0, 1));
    }

    #[tokio::test]
    async fn test_unknown_symbol_is_distinct() {
        let builder = builder_with(Vec::new()).await;
        let err = builder.build("FOOBAR", Some(5.0)).await.unwrap_err();
        assert!(matches!(err, Error::SymbolNotFound(_)));
    }

    #[tokio::test]
    async fn test_rebuild_is_idempotent() {
        let builder = builder_with(vec![
            order(Side::Buy, "BTCUSDT", 1, 99.0),
            order(Side::Buy, "BTCUSDT", 2, 99.0),
            order(Side::Sell, "BTCUSDT", 3, 101.0),
        ])
        .await;

        let first = builder.build("BTCUSDT", Some(10.0)).await.unwrap();
        let second = builder.build("BTCUSDT", Some(10.0)).await.unwrap();
        assert_eq!(first, second);
    }
}
