//! Order event types.
//!
//! This module contains the two forms an order takes in the pipeline: the
//! [`Order`] decoded from a raw stream message, and the [`StoredOrder`] it
//! becomes once the durable store assigns it an identifier. Keeping the two
//! as separate types makes the id immutable by construction: nothing can
//! change or forge an id on an order that was never persisted.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::types::{Amount, OrderId, Price};

/// Order side (buy or sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Bid side of the book
    #[serde(alias = "buy", alias = "BUY")]
    Buy,
    /// Ask side of the book
    #[serde(alias = "sell", alias = "SELL")]
    Sell,
}

impl Side {
    /// Get the opposite side
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// A decoded order event, not yet persisted
///
/// Produced by [`Order::decode`] from a raw stream payload. Orders are
/// immutable once created; the store copies their fields into a
/// [`StoredOrder`] when a batch is flushed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Order side
    pub side: Side,

    /// Instrument symbol, e.g. `"BTCUSDT"`
    pub symbol: String,

    /// Quantity
    pub amount: Amount,

    /// Limit price
    pub price: Price,
}

impl Order {
    /// Create a validated order
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOrder`] if the symbol is empty or the price
    /// is not finite and positive.
    pub fn new(
        side: Side,
        symbol: impl Into<String>,
        amount: Amount,
        price: Price,
    ) -> Result<Self, Error> {
        let order = Self {
            side,
            symbol: symbol.into(),
            amount,
            price,
        };
        order.validate()?;
        Ok(order)
    }

    /// Decode an order from a raw stream message payload
    ///
    /// Producer-supplied fields outside the order shape (such as an
    /// `order_id`) are ignored; identifiers are only ever assigned by the
    /// store.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] for malformed JSON and
    /// [`Error::InvalidOrder`] when the decoded fields fail validation.
    pub fn decode(payload: &[u8]) -> Result<Self, Error> {
        let order: Order = serde_json::from_slice(payload)?;
        order.validate()?;
        Ok(order)
    }

    /// Encode this order to its JSON wire form
    pub fn encode(&self) -> Result<Vec<u8>, Error> {
        Ok(serde_json::to_vec(self)?)
    }

    fn validate(&self) -> Result<(), Error> {
        if self.symbol.is_empty() {
            return Err(Error::InvalidOrder("empty symbol".to_string()));
        }
        if !self.price.is_finite() || self.price <= 0.0 {
            return Err(Error::InvalidOrder(format!(
                "price {} must be finite and positive",
                self.price
            )));
        }
        Ok(())
    }
}

/// A persisted order with its store-assigned identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredOrder {
    /// Store-assigned identifier, unique and monotonically increasing
    pub id: OrderId,

    /// Order side
    pub side: Side,

    /// Instrument symbol
    pub symbol: String,

    /// Quantity
    pub amount: Amount,

    /// Limit price
    pub price: Price,
}

impl StoredOrder {
    /// Attach a store-assigned id to a decoded order
    #[must_use]
    pub fn from_order(id: OrderId, order: Order) -> Self {
        Self {
            id,
            side: order.side,
            symbol: order.symbol,
            amount: order.amount,
            price: order.price,
        }
    }
}
