//! Order-book snapshot assembly.
//!
//! - [`snapshot`] - The read-side projection served to queries
//! - [`builder`] - Re-derives snapshots from the durable store

pub mod builder;
pub mod snapshot;

pub use builder::SnapshotBuilder;
pub use snapshot::OrderBookSnapshot;
