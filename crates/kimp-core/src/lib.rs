//! Core contracts for kimp.
//!
//! This crate contains:
//! - Domain models (symbols, pair mapping, prices, premium records) and validation
//! - Upstream venue identifiers, traits and fail-soft outcome types
//! - HTTP transport, circuit breaker and retry policy
//! - exchangerate-api, Binance and Upbit adapters
//! - The premium calculator, snapshot cache and query selections

pub mod adapters;
pub mod cache;
pub mod calculator;
pub mod circuit_breaker;
pub mod config;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod query;
pub mod retry;
pub mod service;
pub mod source;
pub mod upstream;

pub use adapters::{BinanceAdapter, ExchangeRateApiAdapter, UpbitAdapter};
pub use cache::SnapshotCache;
pub use calculator::{ExchangeRateProvider, PremiumCalculator, PremiumCalculatorBuilder};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use config::KimpConfig;
pub use domain::{
    premium_pct, round_to_cents, ExchangeRate, PairMapping, PremiumRecord, PricePoint, ResultSet,
    Symbol, SymbolMapping, UtcDateTime, DEFAULT_PAIRS,
};
pub use error::{CoreError, ValidationError};
pub use http_client::{
    HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient, ScriptedHttpClient,
};
pub use query::{QueryError, TOP_N_MAX, TOP_N_MIN};
pub use retry::{Backoff, RetryPolicy};
pub use service::{HealthReport, KimpService, OverallHealth};
pub use source::VenueId;
pub use upstream::{
    Fetched, FxRateSource, HealthStatus, MarketCatalog, PriceFetcher, SourceError,
    SourceErrorKind, Stage, Upstream, UpstreamFailure, UpstreamFuture,
};
