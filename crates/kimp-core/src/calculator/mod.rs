//! Premium calculation: rate + catalog, both price legs, join, sort.

mod rate;
pub mod stages;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

pub use rate::ExchangeRateProvider;
use stages::{
    effective_pairs, fetch_both_legs, join_records, list_domestic_markets, resolve_rate,
    sort_records,
};

use crate::adapters::{BinanceAdapter, ExchangeRateApiAdapter, UpbitAdapter};
use crate::http_client::{HttpClient, ReqwestHttpClient};
use crate::upstream::{HealthStatus, MarketCatalog, PriceFetcher};
use crate::{ExchangeRate, KimpConfig, ResultSet, SymbolMapping, UtcDateTime, ValidationError};

/// Orchestrates one calculation cycle over the configured upstreams.
///
/// Holds only immutable configuration and shared adapters, so one instance is
/// shared across request handlers.
#[derive(Clone)]
pub struct PremiumCalculator {
    mapping: Arc<SymbolMapping>,
    rate_provider: ExchangeRateProvider,
    catalog: Arc<dyn MarketCatalog>,
    foreign: Arc<dyn PriceFetcher>,
    domestic: Arc<dyn PriceFetcher>,
}

impl PremiumCalculator {
    pub fn new(
        mapping: Arc<SymbolMapping>,
        rate_provider: ExchangeRateProvider,
        catalog: Arc<dyn MarketCatalog>,
        foreign: Arc<dyn PriceFetcher>,
        domestic: Arc<dyn PriceFetcher>,
    ) -> Self {
        Self {
            mapping,
            rate_provider,
            catalog,
            foreign,
            domestic,
        }
    }

    pub fn mapping(&self) -> &SymbolMapping {
        &self.mapping
    }

    /// Runs one cycle. Upstream failures degrade the result instead of failing it.
    pub async fn calculate(&self) -> ResultSet {
        let started = Instant::now();
        let generated_at = UtcDateTime::now();

        let (rate, markets) = tokio::join!(
            resolve_rate(&self.rate_provider),
            list_domestic_markets(self.catalog.as_ref()),
        );

        let pairs = effective_pairs(&self.mapping, &markets.data);
        if pairs.is_empty() {
            warn!(
                listed_markets = markets.data.len(),
                "no mapped pair is listed on the domestic venue"
            );
        }

        let (foreign, domestic) =
            fetch_both_legs(self.foreign.as_ref(), self.domestic.as_ref(), &pairs).await;

        let mut records = join_records(
            &pairs,
            &foreign.data,
            &domestic.data,
            rate.data.usd_to_domestic,
            generated_at,
        );
        sort_records(&mut records);

        let failures: Vec<_> = [rate.failure, markets.failure, foreign.failure, domestic.failure]
            .into_iter()
            .flatten()
            .collect();

        debug!(
            effective_pairs = pairs.len(),
            records = records.len(),
            failures = failures.len(),
            fallback_rate = rate.data.is_fallback,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "premium cycle complete"
        );

        ResultSet {
            records,
            exchange_rate: rate.data,
            generated_at,
            failures,
        }
    }

    pub async fn exchange_rate(&self) -> ExchangeRate {
        self.rate_provider.get_rate().await
    }

    /// Circuit state per venue; adapters shared between roles are reported once.
    pub fn health(&self) -> Vec<HealthStatus> {
        let source = self.rate_provider.source();
        let observed = [
            (source.venue(), source.circuit_state()),
            (self.catalog.venue(), self.catalog.circuit_state()),
            (self.foreign.venue(), self.foreign.circuit_state()),
            (self.domestic.venue(), self.domestic.circuit_state()),
        ];

        let mut by_venue = BTreeMap::new();
        for (venue, circuit) in observed {
            by_venue.entry(venue).or_insert(circuit);
        }

        by_venue
            .into_iter()
            .map(|(venue, circuit)| HealthStatus { venue, circuit })
            .collect()
    }
}

/// Wires the production adapters from a [`KimpConfig`].
///
/// # Example
///
/// ```rust,ignore
/// use kimp_core::{KimpConfig, PremiumCalculatorBuilder};
///
/// let calculator = PremiumCalculatorBuilder::new(KimpConfig::default()).build()?;
/// let result = calculator.calculate().await;
/// ```
pub struct PremiumCalculatorBuilder {
    config: KimpConfig,
    http_client: Option<Arc<dyn HttpClient>>,
    mapping: Option<SymbolMapping>,
}

impl PremiumCalculatorBuilder {
    pub fn new(config: KimpConfig) -> Self {
        Self {
            config,
            http_client: None,
            mapping: None,
        }
    }

    /// Overrides the reqwest transport, e.g. with a scripted client in tests.
    pub fn with_http_client(mut self, http_client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(http_client);
        self
    }

    pub fn with_mapping(mut self, mapping: SymbolMapping) -> Self {
        self.mapping = Some(mapping);
        self
    }

    pub fn build(self) -> Result<PremiumCalculator, ValidationError> {
        self.config.validate()?;

        let http_client = self
            .http_client
            .unwrap_or_else(|| Arc::new(ReqwestHttpClient::new()));
        let fx = Arc::new(ExchangeRateApiAdapter::from_config(
            http_client.clone(),
            &self.config,
        ));
        let binance = Arc::new(BinanceAdapter::from_config(http_client.clone(), &self.config));
        // Catalog and domestic tickers share one adapter, hence one circuit breaker.
        let upbit = Arc::new(UpbitAdapter::from_config(http_client, &self.config));

        Ok(PremiumCalculator::new(
            Arc::new(self.mapping.unwrap_or_default()),
            ExchangeRateProvider::new(fx, self.config.fallback_rate),
            upbit.clone(),
            binance,
            upbit,
        ))
    }
}
