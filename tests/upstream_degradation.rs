//! Behavior-driven tests for degraded upstreams: failures are recorded, never raised.

use std::sync::Arc;
use std::time::Duration;

use kimp_core::{
    CircuitState, HttpClient, HttpError, HttpRequest, HttpResponse, KimpConfig,
    PremiumCalculatorBuilder, ScriptedHttpClient, Stage, VenueId,
};
use kimp_core::http_client::HttpFuture;

const FX_URL: &str = "https://api.exchangerate-api.com/v4/latest/USD";
const MARKETS_URL: &str = "https://api.upbit.com/v1/market/all";
const UPBIT_TICKER_URL: &str = "https://api.upbit.com/v1/ticker";
const BINANCE_URL: &str = "https://api.binance.com/api/v3/ticker/24hr";

const MARKETS: &str = r#"[{"market":"KRW-BTC"},{"market":"KRW-ETH"}]"#;
const BINANCE_TICKERS: &str = r#"[
    {"symbol":"BTCUSDT","lastPrice":"65000","priceChangePercent":"1.5"},
    {"symbol":"ETHUSDT","lastPrice":"3000","priceChangePercent":"-2.1"}
]"#;
const UPBIT_TICKERS: &str = r#"[
    {"market":"KRW-BTC","trade_price":89000000.0,"signed_change_rate":0.008},
    {"market":"KRW-ETH","trade_price":4009500.0,"signed_change_rate":-0.015}
]"#;

fn config() -> KimpConfig {
    KimpConfig {
        max_retries: 0,
        ..KimpConfig::default()
    }
}

/// Holds requests to `slow_prefix` longer than any test timeout; everything
/// else is answered by the scripted client.
struct StalledHttpClient {
    slow_prefix: &'static str,
    inner: ScriptedHttpClient,
}

impl HttpClient for StalledHttpClient {
    fn execute(&self, request: HttpRequest) -> HttpFuture<'_> {
        if request.url.starts_with(self.slow_prefix) {
            return Box::pin(async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Err(HttpError::new("unreachable"))
            });
        }
        self.inner.execute(request)
    }
}

// =============================================================================
// Foreign leg failures
// =============================================================================

#[tokio::test]
async fn when_binance_is_down_cycle_returns_empty_result_with_warning() {
    // Given: Binance answers 503 while the other upstreams are healthy
    let client = Arc::new(
        ScriptedHttpClient::new()
            .json(FX_URL, r#"{"rates":{"KRW":1350}}"#)
            .json(MARKETS_URL, MARKETS)
            .json(UPBIT_TICKER_URL, UPBIT_TICKERS)
            .route(BINANCE_URL, Ok(HttpResponse::with_status(503, "unavailable"))),
    );
    let calculator = PremiumCalculatorBuilder::new(config())
        .with_http_client(client)
        .build()
        .expect("valid config");

    // When: A cycle runs
    let result = calculator.calculate().await;

    // Then: No record is produced, the live rate is kept and the failure is visible
    assert!(result.is_empty());
    assert!(!result.exchange_rate.is_fallback);
    assert_eq!(result.failures.len(), 1);
    let failure = &result.failures[0];
    assert_eq!(failure.venue, VenueId::Binance);
    assert_eq!(failure.stage, Stage::ForeignPrices);
    assert_eq!(failure.code, "upstream.unavailable");
    assert!(failure.message.contains("status 503"));
}

#[tokio::test]
async fn when_binance_payload_is_malformed_failure_is_a_parse_error() {
    // Given: Binance returns a non-JSON body with status 200
    let client = Arc::new(
        ScriptedHttpClient::new()
            .json(FX_URL, r#"{"rates":{"KRW":1350}}"#)
            .json(MARKETS_URL, MARKETS)
            .json(UPBIT_TICKER_URL, UPBIT_TICKERS)
            .json(BINANCE_URL, "<html>maintenance</html>"),
    );
    let calculator = PremiumCalculatorBuilder::new(config())
        .with_http_client(client)
        .build()
        .expect("valid config");

    // When: A cycle runs
    let result = calculator.calculate().await;

    // Then: The cycle degrades instead of failing
    assert!(result.is_empty());
    assert_eq!(result.failures[0].code, "upstream.parse_error");
}

// =============================================================================
// Domestic catalog failures
// =============================================================================

#[tokio::test]
async fn when_catalog_is_down_no_price_leg_is_queried() {
    // Given: The Upbit market listing fails at the transport level
    let client = Arc::new(
        ScriptedHttpClient::new()
            .json(FX_URL, r#"{"rates":{"KRW":1350}}"#)
            .route(
                MARKETS_URL,
                Err(HttpError::new("connection failed: connection reset by peer")),
            )
            .json(UPBIT_TICKER_URL, UPBIT_TICKERS)
            .json(BINANCE_URL, BINANCE_TICKERS),
    );
    let calculator = PremiumCalculatorBuilder::new(config())
        .with_http_client(client.clone())
        .build()
        .expect("valid config");

    // When: A cycle runs
    let result = calculator.calculate().await;

    // Then: The result is empty, the catalog failure is recorded and no ticker was fetched
    assert!(result.is_empty());
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].stage, Stage::MarketCatalog);
    assert_eq!(result.failures[0].venue, VenueId::Upbit);
    assert_eq!(client.request_count(BINANCE_URL), 0);
    assert_eq!(client.request_count(UPBIT_TICKER_URL), 0);
}

// =============================================================================
// Timeouts, retries and circuit breaking
// =============================================================================

#[tokio::test]
async fn when_fx_source_stalls_timeout_triggers_fallback_rate() {
    // Given: The FX source never answers and the timeout is short
    let client = Arc::new(StalledHttpClient {
        slow_prefix: FX_URL,
        inner: ScriptedHttpClient::new()
            .json(MARKETS_URL, MARKETS)
            .json(UPBIT_TICKER_URL, UPBIT_TICKERS)
            .json(BINANCE_URL, BINANCE_TICKERS),
    });
    let calculator = PremiumCalculatorBuilder::new(KimpConfig {
        timeout_ms: 50,
        ..config()
    })
    .with_http_client(client)
    .build()
    .expect("valid config");

    // When: A cycle runs
    let result = tokio::time::timeout(Duration::from_secs(5), calculator.calculate())
        .await
        .expect("cycle is bounded by the upstream timeout");

    // Then: The fallback rate is used and the records are still produced
    assert!(result.exchange_rate.is_fallback);
    assert_eq!(result.exchange_rate.usd_to_domestic, 1_300.0);
    assert_eq!(result.len(), 2);
    assert!(result.failures[0].message.contains("timed out"));
}

#[tokio::test]
async fn transient_failures_are_retried_within_budget() {
    // Given: Binance keeps answering 503 and one retry is allowed
    let client = Arc::new(
        ScriptedHttpClient::new()
            .json(FX_URL, r#"{"rates":{"KRW":1350}}"#)
            .json(MARKETS_URL, MARKETS)
            .json(UPBIT_TICKER_URL, UPBIT_TICKERS)
            .route(BINANCE_URL, Ok(HttpResponse::with_status(503, "busy"))),
    );
    let calculator = PremiumCalculatorBuilder::new(KimpConfig {
        max_retries: 1,
        ..config()
    })
    .with_http_client(client.clone())
    .build()
    .expect("valid config");

    // When: A cycle runs
    let result = calculator.calculate().await;

    // Then: Binance was called once plus one retry before the cycle degraded
    assert_eq!(client.request_count(BINANCE_URL), 2);
    assert!(result.is_empty());
}

#[tokio::test]
async fn repeated_failures_open_the_circuit_and_skip_the_upstream() {
    // Given: Binance is down and the breaker opens after two failures
    let client = Arc::new(
        ScriptedHttpClient::new()
            .json(FX_URL, r#"{"rates":{"KRW":1350}}"#)
            .json(MARKETS_URL, MARKETS)
            .json(UPBIT_TICKER_URL, UPBIT_TICKERS)
            .route(BINANCE_URL, Ok(HttpResponse::with_status(500, "down"))),
    );
    let calculator = PremiumCalculatorBuilder::new(KimpConfig {
        breaker_failure_threshold: 2,
        breaker_open_timeout_ms: 60_000,
        ..config()
    })
    .with_http_client(client.clone())
    .build()
    .expect("valid config");

    // When: Three cycles run
    calculator.calculate().await;
    calculator.calculate().await;
    let third = calculator.calculate().await;

    // Then: The third cycle never reached Binance and health reports the open circuit
    assert_eq!(client.request_count(BINANCE_URL), 2);
    assert!(third.failures[0].message.contains("circuit breaker is open"));

    let binance = calculator
        .health()
        .into_iter()
        .find(|status| status.venue == VenueId::Binance)
        .expect("binance reported");
    assert_eq!(binance.circuit, CircuitState::Open);
}
