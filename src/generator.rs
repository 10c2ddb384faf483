//! Synthetic order generator.
//!
//! A demo producer that publishes rounds of plausible orders through a
//! [`TopicPublisher`]: for each configured symbol, half the round bids
//! just below the reference price and half asks just above it. Useful for
//! exercising the pipeline end to end without a live upstream feed.

use std::time::Duration;

use rand::Rng;
use tokio::sync::watch;
use tokio::time;
use tracing::{debug, info};

use crate::error::Error;
use crate::stream::TopicPublisher;
use crate::types::{Order, Price, Side};

/// Orders emitted per symbol per round
const ORDERS_PER_ROUND: usize = 10;

/// Widest offset from the reference price
const PRICE_SPREAD: f64 = 10.0;

/// Upper bound on generated amounts, exclusive
const MAX_AMOUNT: u32 = 1000;

/// Publishes rounds of synthetic orders
pub struct OrderGenerator {
    publisher: TopicPublisher,
    symbols: Vec<(String, Price)>,
}

impl OrderGenerator {
    /// Create a generator over the given symbols and reference prices
    #[must_use]
    pub fn new(publisher: TopicPublisher, symbols: Vec<(String, Price)>) -> Self {
        Self { publisher, symbols }
    }

    /// Publish one round of orders, returning how many were sent
    ///
    /// Per symbol: half the round buys at prices in
    /// `(reference - 10, reference]`, half sells in
    /// `[reference, reference + 10)`, with amounts below 1000.
    pub async fn produce_once(&self) -> Result<usize, Error> {
        let mut published = 0;
        for (symbol, reference) in &self.symbols {
            for i in 0..ORDERS_PER_ROUND {
                let order = random_order(symbol, *reference, i)?;
                let payload = order.encode()?;
                let (partition, offset) = self.publisher.publish(symbol, payload).await?;
                debug!(symbol = %symbol, partition, offset, "order published");
                published += 1;
            }
        }
        Ok(published)
    }

    /// Publish a round every `interval` until shutdown
    ///
    /// The first round fires immediately.
    pub async fn run(
        self,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), Error> {
        let mut ticker = time::interval(interval);
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!("generator stopped");
                    return Ok(());
                }
                _ = ticker.tick() => {
                    let published = self.produce_once().await?;
                    info!(published, "generator round complete");
                }
            }
        }
    }
}

fn random_order(symbol: &str, reference: Price, i: usize) -> Result<Order, Error> {
    let mut rng = rand::thread_rng();
    let amount = rng.gen_range(0..MAX_AMOUNT);
    let (side, price) = if i < ORDERS_PER_ROUND / 2 {
        (Side::Buy, reference - rng.gen::<f64>() * PRICE_SPREAD)
    } else {
        (Side::Sell, reference + rng.gen::<f64>() * PRICE_SPREAD)
    };
    Order::new(side, symbol, amount, price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::MemoryTopic;
    use crate::stream::StreamSource;

    #[tokio::test]
    async fn test_round_shape() {
        let (topic, publisher) = MemoryTopic::new("orders", 1);
        let generator = OrderGenerator::new(
            publisher,
            vec![("BTCUSDT".to_string(), 100.0), ("BTCETH".to_string(), 200.0)],
        );

        let published = generator.produce_once().await.unwrap();
        assert_eq!(published, 20);

        let mut feed = topic.subscribe(0).unwrap();
        for symbol_round in 0..2 {
            let reference = if symbol_round == 0 { 100.0 } else { 200.0 };
            for i in 0..10 {
                let message = feed.messages.recv().await.unwrap();
                let order = Order::decode(&message.payload).unwrap();
                assert!(order.amount < 1000);
                if i < 5 {
                    assert_eq!(order.side, Side::Buy);
                    assert!(order.price <= reference);
                    assert!(order.price > reference - 10.0);
                } else {
                    assert_eq!(order.side, Side::Sell);
                    assert!(order.price >= reference);
                    assert!(order.price < reference + 10.0);
                }
            }
        }
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let (topic, publisher) = MemoryTopic::new("orders", 1);
        let generator =
            OrderGenerator::new(publisher, vec![("BTCUSDT".to_string(), 100.0)]);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut feed = topic.subscribe(0).unwrap();
        let handle = tokio::spawn(generator.run(Duration::from_secs(60), shutdown_rx));

        // The first round fires immediately
        for _ in 0..10 {
            assert!(feed.messages.recv().await.is_some());
        }

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap().unwrap();
    }
}
