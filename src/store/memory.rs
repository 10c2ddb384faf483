//! In-memory order store.
//!
//! [`MemoryStore`] keeps rows in an arrival-ordered vector behind a
//! read-write lock, with the same id-assignment contract as the journal
//! store. Used by tests, benchmarks, and ephemeral runs where durability
//! is not wanted.

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::Error;
use crate::store::{OrderStore, PriceBand};
use crate::types::{Order, OrderId, Side, StoredOrder};

struct Inner {
    rows: Vec<StoredOrder>,
    next_id: OrderId,
}

/// Volatile implementation of [`OrderStore`]
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            next_id: 1,
        }
    }
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of persisted orders
    pub fn len(&self) -> usize {
        self.inner.read().rows.len()
    }

    /// Check if the store holds no orders
    pub fn is_empty(&self) -> bool {
        self.inner.read().rows.is_empty()
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn insert_batch(&self, orders: &[Order]) -> Result<Vec<OrderId>, Error> {
        if orders.is_empty() {
            return Ok(Vec::new());
        }

        let mut inner = self.inner.write();
        let mut ids = Vec::with_capacity(orders.len());
        for order in orders {
            let id = inner.next_id;
            inner.next_id += 1;
            inner.rows.push(StoredOrder::from_order(id, order.clone()));
            ids.push(id);
        }
        Ok(ids)
    }

    async fn query_by_side(
        &self,
        symbol: &str,
        side: Side,
        band: Option<PriceBand>,
    ) -> Result<Vec<StoredOrder>, Error> {
        let inner = self.inner.read();
        Ok(inner
            .rows
            .iter()
            .filter(|order| order.side == side && order.symbol == symbol)
            .filter(|order| band.map_or(true, |b| b.contains(order.price)))
            .cloned()
            .collect())
    }
}
