use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use super::transport::UpstreamTransport;
use crate::circuit_breaker::CircuitState;
use crate::http_client::HttpClient;
use crate::upstream::{PriceFetcher, SourceError, Upstream, UpstreamFuture};
use crate::{KimpConfig, PricePoint, Symbol, VenueId};

/// Binance spot 24h ticker adapter (foreign leg).
///
/// The full ticker list is fetched in one call and filtered client-side.
#[derive(Clone)]
pub struct BinanceAdapter {
    transport: UpstreamTransport,
    base_url: String,
}

impl BinanceAdapter {
    pub fn from_config(http_client: Arc<dyn HttpClient>, config: &KimpConfig) -> Self {
        Self {
            transport: UpstreamTransport::new(VenueId::Binance, http_client, config),
            base_url: config.binance_base_url.trim_end_matches('/').to_owned(),
        }
    }

    fn ticker_url(&self) -> String {
        format!("{}/api/v3/ticker/24hr", self.base_url)
    }

    async fn fetch_tickers(
        &self,
        requested: &BTreeSet<Symbol>,
    ) -> Result<BTreeMap<Symbol, PricePoint>, SourceError> {
        if requested.is_empty() {
            return Ok(BTreeMap::new());
        }

        let body = self.transport.get_body(&self.ticker_url()).await?;
        parse_tickers(&body, requested)
    }
}

impl Upstream for BinanceAdapter {
    fn venue(&self) -> VenueId {
        VenueId::Binance
    }

    fn circuit_state(&self) -> CircuitState {
        self.transport.circuit_state()
    }
}

impl PriceFetcher for BinanceAdapter {
    fn fetch_prices<'a>(
        &'a self,
        requested: &'a BTreeSet<Symbol>,
    ) -> UpstreamFuture<'a, BTreeMap<Symbol, PricePoint>> {
        Box::pin(self.fetch_tickers(requested))
    }
}

// Binance encodes decimals as strings.
#[derive(Debug, Deserialize)]
struct BinanceTicker {
    symbol: String,
    #[serde(rename = "lastPrice", default)]
    last_price: Option<String>,
    #[serde(rename = "priceChangePercent", default)]
    price_change_percent: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BinanceErrorBody {
    code: i64,
    msg: String,
}

fn parse_tickers(
    body: &str,
    requested: &BTreeSet<Symbol>,
) -> Result<BTreeMap<Symbol, PricePoint>, SourceError> {
    let payload: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| SourceError::parse(format!("failed to parse binance response: {e}")))?;

    let entries = match payload {
        serde_json::Value::Array(entries) => entries,
        other => {
            if let Ok(error) = serde_json::from_value::<BinanceErrorBody>(other) {
                return Err(SourceError::unavailable(format!(
                    "binance error {}: {}",
                    error.code, error.msg
                )));
            }
            return Err(SourceError::parse("binance ticker response is not an array"));
        }
    };

    let wanted: HashMap<&str, &Symbol> = requested
        .iter()
        .map(|symbol| (symbol.as_str(), symbol))
        .collect();

    let mut prices = BTreeMap::new();
    for entry in entries {
        let Ok(ticker) = serde_json::from_value::<BinanceTicker>(entry) else {
            continue;
        };
        let Some(symbol) = wanted.get(ticker.symbol.as_str()) else {
            continue;
        };

        match to_price_point(symbol, &ticker) {
            Some(point) => {
                prices.insert((*symbol).clone(), point);
            }
            None => debug!(symbol = %symbol, "skipping malformed binance ticker"),
        }
    }

    Ok(prices)
}

fn to_price_point(symbol: &Symbol, ticker: &BinanceTicker) -> Option<PricePoint> {
    let price = ticker.last_price.as_deref()?.parse::<f64>().ok()?;
    let change = match ticker.price_change_percent.as_deref() {
        Some(raw) => raw.parse::<f64>().ok()?,
        None => 0.0,
    };
    PricePoint::new(symbol.clone(), price, change).ok()
}
