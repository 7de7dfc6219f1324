use serde::{Deserialize, Serialize};

use crate::upstream::UpstreamFailure;
use crate::{Symbol, UtcDateTime, ValidationError};

/// Last trade price and 24h change for one symbol on one venue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub symbol: Symbol,
    pub price: f64,
    pub change_24h_pct: f64,
}

impl PricePoint {
    pub fn new(symbol: Symbol, price: f64, change_24h_pct: f64) -> Result<Self, ValidationError> {
        validate_positive("price", price)?;
        validate_finite("change_24h_pct", change_24h_pct)?;

        Ok(Self {
            symbol,
            price,
            change_24h_pct,
        })
    }
}

/// USD to domestic currency rate used for one calculation cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub usd_to_domestic: f64,
    pub is_fallback: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

impl ExchangeRate {
    pub fn live(usd_to_domestic: f64) -> Self {
        Self {
            usd_to_domestic,
            is_fallback: false,
            fallback_reason: None,
        }
    }

    pub fn fallback(usd_to_domestic: f64, reason: impl Into<String>) -> Self {
        Self {
            usd_to_domestic,
            is_fallback: true,
            fallback_reason: Some(reason.into()),
        }
    }
}

/// Premium of the domestic price over the converted foreign price for one asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PremiumRecord {
    pub timestamp: UtcDateTime,
    pub display_name: Symbol,
    pub foreign_price_native: f64,
    pub foreign_price_domestic: f64,
    pub domestic_price_domestic: f64,
    pub premium_pct: f64,
    pub foreign_change_24h_pct: f64,
    pub domestic_change_24h_pct: f64,
    pub usd_to_domestic_rate: f64,
}

impl PremiumRecord {
    /// Converts the foreign leg at `rate` and derives the premium.
    pub fn derive(
        display_name: Symbol,
        foreign: &PricePoint,
        domestic: &PricePoint,
        rate: f64,
        timestamp: UtcDateTime,
    ) -> Self {
        let foreign_price_domestic = foreign.price * rate;

        Self {
            timestamp,
            display_name,
            foreign_price_native: foreign.price,
            foreign_price_domestic,
            domestic_price_domestic: domestic.price,
            premium_pct: premium_pct(domestic.price, foreign_price_domestic),
            foreign_change_24h_pct: foreign.change_24h_pct,
            domestic_change_24h_pct: domestic.change_24h_pct,
            usd_to_domestic_rate: rate,
        }
    }
}

/// Output of one calculation cycle, sorted by `premium_pct` descending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    pub records: Vec<PremiumRecord>,
    pub exchange_rate: ExchangeRate,
    pub generated_at: UtcDateTime,
    pub failures: Vec<UpstreamFailure>,
}

impl ResultSet {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_degraded(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// `round(((domestic - foreign) / foreign) * 100, 2)`
pub fn premium_pct(domestic_price: f64, foreign_price_domestic: f64) -> f64 {
    round_to_cents((domestic_price - foreign_price_domestic) / foreign_price_domestic * 100.0)
}

/// Rounds the exact binary value to two decimals, ties to even.
pub fn round_to_cents(value: f64) -> f64 {
    format!("{value:.2}").parse().unwrap_or(value)
}

fn validate_finite(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    Ok(())
}

fn validate_positive(field: &'static str, value: f64) -> Result<(), ValidationError> {
    validate_finite(field, value)?;
    if value <= 0.0 {
        return Err(ValidationError::NonPositiveValue { field });
    }
    Ok(())
}
