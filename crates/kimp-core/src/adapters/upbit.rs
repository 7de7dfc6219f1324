use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use super::transport::UpstreamTransport;
use crate::circuit_breaker::CircuitState;
use crate::http_client::HttpClient;
use crate::upstream::{MarketCatalog, PriceFetcher, SourceError, Upstream, UpstreamFuture};
use crate::{KimpConfig, PricePoint, Symbol, VenueId};

/// Upbit adapter (domestic leg): market catalog plus batched ticker lookups.
#[derive(Clone)]
pub struct UpbitAdapter {
    transport: UpstreamTransport,
    base_url: String,
    market_prefix: String,
}

impl UpbitAdapter {
    pub fn from_config(http_client: Arc<dyn HttpClient>, config: &KimpConfig) -> Self {
        Self {
            transport: UpstreamTransport::new(VenueId::Upbit, http_client, config),
            base_url: config.upbit_base_url.trim_end_matches('/').to_owned(),
            market_prefix: config.domestic_prefix.clone(),
        }
    }

    fn markets_url(&self) -> String {
        format!("{}/v1/market/all", self.base_url)
    }

    fn ticker_url(&self, markets: &BTreeSet<Symbol>) -> String {
        let joined = markets
            .iter()
            .map(|market| urlencoding::encode(market.as_str()).into_owned())
            .collect::<Vec<_>>()
            .join(",");
        format!("{}/v1/ticker?markets={joined}", self.base_url)
    }

    async fn fetch_markets(&self) -> Result<BTreeSet<Symbol>, SourceError> {
        let body = self.transport.get_body(&self.markets_url()).await?;
        parse_markets(&body, &self.market_prefix)
    }

    async fn fetch_tickers(
        &self,
        requested: &BTreeSet<Symbol>,
    ) -> Result<BTreeMap<Symbol, PricePoint>, SourceError> {
        if requested.is_empty() {
            return Ok(BTreeMap::new());
        }

        let body = self.transport.get_body(&self.ticker_url(requested)).await?;
        parse_tickers(&body, requested)
    }
}

impl Upstream for UpbitAdapter {
    fn venue(&self) -> VenueId {
        VenueId::Upbit
    }

    fn circuit_state(&self) -> CircuitState {
        self.transport.circuit_state()
    }
}

impl MarketCatalog for UpbitAdapter {
    fn list_markets(&self) -> UpstreamFuture<'_, BTreeSet<Symbol>> {
        Box::pin(self.fetch_markets())
    }
}

impl PriceFetcher for UpbitAdapter {
    fn fetch_prices<'a>(
        &'a self,
        requested: &'a BTreeSet<Symbol>,
    ) -> UpstreamFuture<'a, BTreeMap<Symbol, PricePoint>> {
        Box::pin(self.fetch_tickers(requested))
    }
}

#[derive(Debug, Deserialize)]
struct UpbitMarket {
    market: String,
}

#[derive(Debug, Deserialize)]
struct UpbitTicker {
    #[serde(default)]
    market: Option<String>,
    #[serde(default)]
    trade_price: Option<f64>,
    /// Fraction, not percent.
    #[serde(default)]
    signed_change_rate: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct UpbitErrorBody {
    error: UpbitErrorDetail,
}

#[derive(Debug, Deserialize)]
struct UpbitErrorDetail {
    #[serde(default)]
    name: serde_json::Value,
    #[serde(default)]
    message: String,
}

/// Splits an array payload from Upbit's `{"error": {...}}` envelope.
fn into_entries(body: &str, what: &str) -> Result<Vec<serde_json::Value>, SourceError> {
    let payload: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| SourceError::parse(format!("failed to parse upbit {what} response: {e}")))?;

    match payload {
        serde_json::Value::Array(entries) => Ok(entries),
        other => match serde_json::from_value::<UpbitErrorBody>(other) {
            Ok(envelope) => Err(SourceError::unavailable(format!(
                "upbit error {}: {}",
                envelope.error.name, envelope.error.message
            ))),
            Err(_) => Err(SourceError::parse(format!(
                "upbit {what} response is not an array"
            ))),
        },
    }
}

fn parse_markets(body: &str, prefix: &str) -> Result<BTreeSet<Symbol>, SourceError> {
    let markets = into_entries(body, "market")?
        .into_iter()
        .filter_map(|entry| serde_json::from_value::<UpbitMarket>(entry).ok())
        .filter(|entry| entry.market.starts_with(prefix))
        .filter_map(|entry| Symbol::parse(&entry.market).ok())
        .collect();

    Ok(markets)
}

fn parse_tickers(
    body: &str,
    requested: &BTreeSet<Symbol>,
) -> Result<BTreeMap<Symbol, PricePoint>, SourceError> {
    let mut prices = BTreeMap::new();

    for entry in into_entries(body, "ticker")? {
        let Ok(ticker) = serde_json::from_value::<UpbitTicker>(entry) else {
            continue;
        };
        let (Some(market), Some(trade_price)) = (ticker.market, ticker.trade_price) else {
            continue;
        };
        let Some(symbol) = requested.iter().find(|symbol| symbol.as_str() == market) else {
            continue;
        };

        let change_pct = ticker.signed_change_rate.unwrap_or(0.0) * 100.0;
        match PricePoint::new(symbol.clone(), trade_price, change_pct) {
            Ok(point) => {
                prices.insert(symbol.clone(), point);
            }
            Err(error) => debug!(market = %symbol, %error, "skipping malformed upbit ticker"),
        }
    }

    Ok(prices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::{HttpResponse, ScriptedHttpClient};
    use crate::upstream::SourceErrorKind;

    const MARKETS_URL: &str = "https://api.upbit.com/v1/market/all";
    const TICKER_URL: &str = "https://api.upbit.com/v1/ticker";

    fn symbols(raw: &[&str]) -> BTreeSet<Symbol> {
        raw.iter()
            .map(|s| Symbol::parse(s).expect("valid symbol"))
            .collect()
    }

    fn adapter(client: Arc<ScriptedHttpClient>) -> UpbitAdapter {
        let config = KimpConfig {
            max_retries: 0,
            ..KimpConfig::default()
        };
        UpbitAdapter::from_config(client, &config)
    }

    #[tokio::test]
    async fn catalog_keeps_krw_markets_only() {
        let client = Arc::new(ScriptedHttpClient::new().json(
            MARKETS_URL,
            r#"[
                {"market":"KRW-BTC","korean_name":"비트코인","english_name":"Bitcoin"},
                {"market":"BTC-ETH","korean_name":"이더리움","english_name":"Ethereum"},
                {"market":"KRW-ETH","korean_name":"이더리움","english_name":"Ethereum"},
                {"market":"USDT-XRP","korean_name":"리플","english_name":"Ripple"}
            ]"#,
        ));

        let markets = adapter(client).list_markets().await.expect("markets");

        assert_eq!(markets, symbols(&["KRW-BTC", "KRW-ETH"]));
    }

    #[tokio::test]
    async fn ticker_request_batches_sorted_codes() {
        let client = Arc::new(ScriptedHttpClient::new().json(
            TICKER_URL,
            r#"[
                {"market":"KRW-BTC","trade_price":89000000.0,"signed_change_rate":0.008},
                {"market":"KRW-ETH","trade_price":4200000.0}
            ]"#,
        ));

        let prices = adapter(client.clone())
            .fetch_prices(&symbols(&["KRW-ETH", "KRW-BTC"]))
            .await
            .expect("prices");

        assert_eq!(
            client.recorded_requests()[0].url,
            "https://api.upbit.com/v1/ticker?markets=KRW-BTC,KRW-ETH"
        );
        let btc = &prices[&Symbol::parse("KRW-BTC").expect("valid")];
        assert_eq!(btc.price, 89_000_000.0);
        assert!((btc.change_24h_pct - 0.8).abs() < 1e-9);
        let eth = &prices[&Symbol::parse("KRW-ETH").expect("valid")];
        assert_eq!(eth.change_24h_pct, 0.0);
    }

    #[tokio::test]
    async fn entries_without_market_or_price_are_skipped() {
        let client = Arc::new(ScriptedHttpClient::new().json(
            TICKER_URL,
            r#"[
                {"trade_price":1.0},
                {"market":"KRW-XRP"},
                {"market":"KRW-ADA","trade_price":650.0,"signed_change_rate":-0.012}
            ]"#,
        ));

        let prices = adapter(client)
            .fetch_prices(&symbols(&["KRW-XRP", "KRW-ADA"]))
            .await
            .expect("prices");

        assert_eq!(prices.len(), 1);
        let ada = &prices[&Symbol::parse("KRW-ADA").expect("valid")];
        assert!((ada.change_24h_pct + 1.2).abs() < 1e-9);
    }

    #[tokio::test]
    async fn error_envelope_is_unavailable() {
        let client = Arc::new(ScriptedHttpClient::new().route(
            TICKER_URL,
            Ok(HttpResponse::ok_json(
                r#"{"error":{"name":404,"message":"Code not found"}}"#,
            )),
        ));

        let error = adapter(client)
            .fetch_prices(&symbols(&["KRW-BTC"]))
            .await
            .expect_err("error envelope");

        assert_eq!(error.kind(), SourceErrorKind::Unavailable);
        assert!(error.message().contains("Code not found"));
    }

    #[tokio::test]
    async fn garbage_body_is_a_parse_error() {
        let client = Arc::new(ScriptedHttpClient::new().json(MARKETS_URL, "<html>"));

        let error = adapter(client).list_markets().await.expect_err("not json");

        assert_eq!(error.kind(), SourceErrorKind::Parse);
    }
}
