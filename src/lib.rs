//! # bookpipe
//!
//! A streaming order ingestion pipeline with durable batch persistence and
//! band-filtered order-book snapshots.
//!
//! ## Features
//!
//! - **Partitioned stream consumption** - One decode pump per partition
//!   feeding a single-writer ingestion loop
//! - **Size/age batching** - Batches flush at a size threshold or an age
//!   deadline, whichever fires first, with a final drain on shutdown
//! - **Durable journal store** - Append-only, checksummed frames with
//!   torn-tail recovery on open
//! - **Snapshot queries** - Bid/ask ladders re-derived from storage,
//!   bounded to a price band around an oracle reference price
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use bookpipe::api::{self, ApiState};
//! use bookpipe::book::SnapshotBuilder;
//! use bookpipe::config::Config;
//! use bookpipe::generator::OrderGenerator;
//! use bookpipe::ingest::IngestLoop;
//! use bookpipe::oracle::StaticOracle;
//! use bookpipe::store::JournalStore;
//! use bookpipe::stream::MemoryTopic;
//! use tokio::sync::watch;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), bookpipe::Error> {
//!     let config = Config::new();
//!     let (topic, publisher) = MemoryTopic::new(config.topic(), 4);
//!     let store = Arc::new(JournalStore::open("./data")?);
//!     let oracle = Arc::new(StaticOracle::new().with_price("BTCUSDT", 100.0));
//!     let (shutdown_tx, shutdown_rx) = watch::channel(false);
//!
//!     // Bridge Ctrl-C into the shutdown channel
//!     tokio::spawn(async move {
//!         let _ = tokio::signal::ctrl_c().await;
//!         let _ = shutdown_tx.send(true);
//!     });
//!
//!     // Demo traffic
//!     let generator = OrderGenerator::new(publisher, vec![("BTCUSDT".to_string(), 100.0)]);
//!     tokio::spawn(generator.run(Duration::from_secs(20), shutdown_rx.clone()));
//!
//!     // Snapshot queries while the loop ingests
//!     let snapshots = Arc::new(SnapshotBuilder::new(store.clone(), oracle));
//!     let router = api::router(ApiState::new(snapshots));
//!     tokio::spawn(async move {
//!         let listener = tokio::net::TcpListener::bind("0.0.0.0:8085").await?;
//!         axum::serve(listener, router).await
//!     });
//!
//!     let ingest = IngestLoop::start(&config, &topic, store, shutdown_rx)?;
//!     let stats = ingest.run().await?;
//!     println!("{} orders in {} batches", stats.orders, stats.batches);
//!     Ok(())
//! }
//! ```
//!
//! ## Snapshot semantics
//!
//! Snapshots are re-derived from the store on every query, never cached.
//! Two deliberate quirks are part of the contract:
//!
//! - Ladder entries are one `[price, amount]` pair per stored order;
//!   equal-price orders are not aggregated into a level.
//! - `lastUpdateId` is the id of the last buy row in store iteration
//!   order for the query window, an opaque watermark rather than a
//!   freshness marker.
//!
//! ## Architecture
//!
//! - [`stream`] - Partitioned event stream trait and in-process topic
//! - [`ingest`] - Decode pumps and the single-writer ingestion loop
//! - [`batch`] - Size/age batch accumulation
//! - [`store`] - Durable journal store and in-memory store
//! - [`book`] - Snapshot type and builder
//! - [`oracle`] - Reference price sources
//! - [`api`] - HTTP query surface
//! - [`generator`] - Synthetic demo producer
//! - [`config`] - Pipeline tuning knobs
//! - [`error`] - Error types for the crate
//! - [`types`] - Order types shared across modules
//!
//! ## Performance
//!
//! - `parking_lot` locks around the journal writer and indexes
//! - `FxHashMap`/`FxHasher` for symbol tables and partition routing
//! - Batches coalesce into a single journal write and fsync
//! - Snapshot assembly sorts once per side, no per-entry allocation

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod api;
pub mod batch;
pub mod book;
pub mod config;
pub mod error;
pub mod generator;
pub mod ingest;
pub mod oracle;
pub mod store;
pub mod stream;
pub mod types;

// Re-export main types at crate root for convenience
pub use config::Config;
pub use error::Error;

/// Result type alias using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;
