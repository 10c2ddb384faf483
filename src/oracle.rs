//! Reference price oracles.
//!
//! Snapshot queries bound their price band around a reference price that
//! comes from outside the order stream. [`PriceOracle`] is that seam:
//! [`StaticOracle`] serves a fixed table, [`HttpOracle`] asks a remote
//! quote service. Both distinguish an unknown symbol from a transport
//! failure so callers can answer "not found" versus "unavailable."

use async_trait::async_trait;
use reqwest::StatusCode;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use url::Url;

use crate::error::Error;
use crate::types::Price;

/// Source of per-symbol reference prices
#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// Resolve the reference price for a symbol
    ///
    /// # Errors
    ///
    /// Returns [`Error::SymbolNotFound`] when the symbol is unknown to the
    /// oracle.
    async fn reference_price(&self, symbol: &str) -> Result<Price, Error>;
}

/// Fixed table of reference prices
///
/// # Example
///
/// ```rust
/// use bookpipe::oracle::StaticOracle;
///
/// let oracle = StaticOracle::new()
///     .with_price("BTCUSDT", 100.0)
///     .with_price("BTCETH", 200.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticOracle {
    prices: FxHashMap<String, Price>,
}

impl StaticOracle {
    /// Create an oracle that knows no symbols
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a symbol's reference price
    #[must_use]
    pub fn with_price(mut self, symbol: impl Into<String>, price: Price) -> Self {
        self.prices.insert(symbol.into(), price);
        self
    }

    /// Iterate the symbols this oracle knows
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.prices.keys().map(String::as_str)
    }
}

#[async_trait]
impl PriceOracle for StaticOracle {
    async fn reference_price(&self, symbol: &str) -> Result<Price, Error> {
        self.prices
            .get(symbol)
            .copied()
            .ok_or_else(|| Error::SymbolNotFound(symbol.to_string()))
    }
}

/// Client for a remote quote service
///
/// Fetches `GET {base}/price?symbol=S` expecting a body like
/// `{"symbol": "S", "price": 100.0}`. A 404 maps to
/// [`Error::SymbolNotFound`]; other non-success statuses map to
/// [`Error::Oracle`].
#[derive(Debug, Clone)]
pub struct HttpOracle {
    client: reqwest::Client,
    base: Url,
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    price: Price,
}

impl HttpOracle {
    /// Create a client for the quote service at `base`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when `base` is not a valid URL.
    pub fn new(base: &str) -> Result<Self, Error> {
        let base = Url::parse(base)
            .map_err(|err| Error::Config(format!("invalid oracle url: {err}")))?;
        Ok(Self {
            client: reqwest::Client::new(),
            base,
        })
    }

    fn quote_url(&self, symbol: &str) -> Result<Url, Error> {
        let endpoint = format!("{}/price", self.base.as_str().trim_end_matches('/'));
        Url::parse_with_params(&endpoint, &[("symbol", symbol)])
            .map_err(|err| Error::Config(format!("invalid oracle url: {err}")))
    }
}

#[async_trait]
impl PriceOracle for HttpOracle {
    async fn reference_price(&self, symbol: &str) -> Result<Price, Error> {
        let url = self.quote_url(symbol)?;
        let response = self.client.get(url).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(Error::SymbolNotFound(symbol.to_string())),
            status if status.is_success() => {
                let quote: QuoteResponse = response.json().await?;
                Ok(quote.price)
            }
            status => {
                let message = response.text().await.unwrap_or_default();
                Err(Error::Oracle {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }
}
