//! Service binary: wires the stream, store, oracle, query surface, and
//! demo generator together and runs the ingestion loop until shutdown.
//!
//! Environment:
//! - `BOOKPIPE_ADDR` - query surface bind address (default `0.0.0.0:8085`)
//! - `BOOKPIPE_DATA_DIR` - journal directory (default `./data`)
//! - `BOOKPIPE_GENERATOR` - set to `off` to disable the demo producer
//! - `RUST_LOG` - tracing filter (default `info`)

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

use bookpipe::api::{self, ApiState};
use bookpipe::book::SnapshotBuilder;
use bookpipe::config::Config;
use bookpipe::generator::OrderGenerator;
use bookpipe::ingest::IngestLoop;
use bookpipe::oracle::StaticOracle;
use bookpipe::store::JournalStore;
use bookpipe::stream::MemoryTopic;

/// Demo symbols with their reference prices
const DEMO_SYMBOLS: [(&str, f64); 3] = [
    ("BTCUSDT", 100.0),
    ("BTCETH", 200.0),
    ("BTCIRT", 500.0),
];

/// Partition count for the in-process topic
const PARTITIONS: usize = 4;

/// Cadence of the demo generator
const GENERATOR_INTERVAL: Duration = Duration::from_secs(20);

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt::init();

    let addr = std::env::var("BOOKPIPE_ADDR").unwrap_or_else(|_| "0.0.0.0:8085".to_string());
    let data_dir = std::env::var("BOOKPIPE_DATA_DIR").unwrap_or_else(|_| "./data".to_string());

    let config = Config::new();
    let store = Arc::new(JournalStore::open(&data_dir).context("opening journal store")?);
    let (topic, publisher) = MemoryTopic::new(config.topic(), PARTITIONS);

    let mut oracle = StaticOracle::new();
    for (symbol, price) in DEMO_SYMBOLS {
        oracle = oracle.with_price(symbol, price);
    }
    let oracle = Arc::new(oracle);
    info!(symbols = ?oracle.symbols().collect::<Vec<_>>(), "oracle seeded");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received");
            let _ = shutdown_tx.send(true);
        }
    });

    let generate = std::env::var("BOOKPIPE_GENERATOR").map_or(true, |v| v != "off");
    if generate {
        let symbols = DEMO_SYMBOLS
            .iter()
            .map(|(symbol, price)| (symbol.to_string(), *price))
            .collect();
        let generator = OrderGenerator::new(publisher, symbols);
        let generator_shutdown = shutdown_rx.clone();
        tokio::spawn(async move {
            if let Err(err) = generator.run(GENERATOR_INTERVAL, generator_shutdown).await {
                warn!(error = %err, "generator exited with error");
            }
        });
    }

    let snapshots = Arc::new(SnapshotBuilder::new(store.clone(), oracle));
    let router = api::router(ApiState::new(snapshots));
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding query listener on {addr}"))?;
    info!(addr = %addr, "query surface listening");

    let mut api_shutdown = shutdown_rx.clone();
    let server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = api_shutdown.changed().await;
            })
            .await
    });

    let shutdown_probe = shutdown_rx.clone();
    let ingest = IngestLoop::start(&config, &topic, store, shutdown_rx)?;
    let stats = ingest.run().await?;
    info!(
        orders = stats.orders,
        batches = stats.batches,
        "pipeline drained"
    );

    if *shutdown_probe.borrow() {
        server.await.context("query surface task")??;
    } else {
        // End of stream without a signal: nothing left to serve
        server.abort();
    }
    Ok(())
}
