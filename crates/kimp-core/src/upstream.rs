//! Upstream contracts and the fail-soft outcome types the calculator consumes.
//!
//! | Trait | Venue | Description |
//! |-------|-------|-------------|
//! | [`FxRateSource`] | exchangerate-api | USD quote against the domestic currency |
//! | [`MarketCatalog`] | Upbit | Currently listed domestic market codes |
//! | [`PriceFetcher`] | Binance, Upbit | Last price and 24h change per symbol |
//!
//! Adapters return `Result<_, SourceError>`. The calculator never propagates those
//! errors; it turns them into a [`Fetched`] carrying an empty value and an
//! [`UpstreamFailure`] so degraded cycles stay visible.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::circuit_breaker::CircuitState;
use crate::{PricePoint, Symbol, VenueId};

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    /// Network error, timeout, non-2xx status or open circuit.
    Unavailable,
    /// Payload was not the expected JSON shape.
    Parse,
    InvalidRequest,
    Internal,
}

/// Structured upstream error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn circuit_open(venue: VenueId) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: format!("{venue} circuit breaker is open; skipping upstream call"),
            retryable: false,
        }
    }

    pub fn status(venue: VenueId, status: u16, retryable: bool) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: format!("{venue} upstream returned status {status}"),
            retryable,
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Parse,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn non_retryable(mut self) -> Self {
        self.retryable = false;
        self
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Unavailable => "upstream.unavailable",
            SourceErrorKind::Parse => "upstream.parse_error",
            SourceErrorKind::InvalidRequest => "upstream.invalid_request",
            SourceErrorKind::Internal => "upstream.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Pipeline step an upstream failure was observed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    ExchangeRate,
    MarketCatalog,
    ForeignPrices,
    DomesticPrices,
}

/// Upstream failure recorded instead of being raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamFailure {
    pub venue: VenueId,
    pub stage: Stage,
    pub code: String,
    pub message: String,
}

impl UpstreamFailure {
    pub fn new(venue: VenueId, stage: Stage, error: &SourceError) -> Self {
        Self {
            venue,
            stage,
            code: error.code().to_owned(),
            message: error.message().to_owned(),
        }
    }
}

/// Fail-soft result: always carries a usable value, plus the failure that
/// forced a degraded one.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub data: T,
    pub failure: Option<UpstreamFailure>,
}

impl<T> Fetched<T> {
    pub fn ok(data: T) -> Self {
        Self {
            data,
            failure: None,
        }
    }

    pub fn degraded(data: T, failure: UpstreamFailure) -> Self {
        Self {
            data,
            failure: Some(failure),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

pub type UpstreamFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SourceError>> + Send + 'a>>;

/// Common identity and health surface of every upstream adapter.
pub trait Upstream: Send + Sync {
    fn venue(&self) -> VenueId;

    fn circuit_state(&self) -> CircuitState;
}

/// Live USD quote against the domestic currency.
pub trait FxRateSource: Upstream {
    fn usd_rate(&self) -> UpstreamFuture<'_, f64>;
}

/// Domestic venue market listing, already filtered to the domestic-currency quote.
pub trait MarketCatalog: Upstream {
    fn list_markets(&self) -> UpstreamFuture<'_, BTreeSet<Symbol>>;
}

/// Ticker lookup. Symbols absent upstream are omitted from the map, not reported.
pub trait PriceFetcher: Upstream {
    fn fetch_prices<'a>(
        &'a self,
        requested: &'a BTreeSet<Symbol>,
    ) -> UpstreamFuture<'a, BTreeMap<Symbol, PricePoint>>;
}

/// Snapshot of one venue's circuit, reported by `/health`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    pub venue: VenueId,
    pub circuit: CircuitState,
}
