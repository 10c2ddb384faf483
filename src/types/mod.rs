//! Core data types shared across the pipeline.
//!
//! - [`order`] - Order events and their persisted form

pub mod order;

pub use order::{Order, Side, StoredOrder};

/// Store-assigned order identifier
///
/// Assigned by the durable order store at persistence time, unique and
/// monotonically increasing across the life of a store. An identifier is
/// never reused and never changes once assigned.
pub type OrderId = u64;

/// Order quantity
///
/// Using `u32` keeps the wire decoder from ever admitting a negative
/// quantity; zero is allowed.
pub type Amount = u32;

/// Limit price
///
/// Prices arrive as floating values on the stream and are validated finite
/// and positive at decode time, so ordering them with `f64::total_cmp`
/// matches numeric order.
pub type Price = f64;
