//! Runtime configuration shared by the adapters, calculator and cache.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::circuit_breaker::CircuitBreakerConfig;
use crate::http_client::DEFAULT_TIMEOUT_MS;
use crate::retry::RetryPolicy;
use crate::{CoreError, ValidationError};

pub const DEFAULT_FX_BASE_URL: &str = "https://api.exchangerate-api.com";
pub const DEFAULT_BINANCE_BASE_URL: &str = "https://api.binance.com";
pub const DEFAULT_UPBIT_BASE_URL: &str = "https://api.upbit.com";
/// Substituted when the live USD/KRW lookup fails.
pub const DEFAULT_FALLBACK_RATE: f64 = 1_300.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KimpConfig {
    pub fx_base_url: String,
    pub binance_base_url: String,
    pub upbit_base_url: String,
    /// Currency code looked up in the FX payload.
    pub currency: String,
    /// Prefix of domestic market codes quoted in `currency`.
    pub domestic_prefix: String,
    pub fallback_rate: f64,
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub breaker_failure_threshold: u32,
    pub breaker_open_timeout_ms: u64,
    /// Zero disables the snapshot cache.
    pub cache_ttl_ms: u64,
}

impl Default for KimpConfig {
    fn default() -> Self {
        Self {
            fx_base_url: String::from(DEFAULT_FX_BASE_URL),
            binance_base_url: String::from(DEFAULT_BINANCE_BASE_URL),
            upbit_base_url: String::from(DEFAULT_UPBIT_BASE_URL),
            currency: String::from("KRW"),
            domestic_prefix: String::from("KRW-"),
            fallback_rate: DEFAULT_FALLBACK_RATE,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_retries: 1,
            breaker_failure_threshold: 3,
            breaker_open_timeout_ms: 30_000,
            cache_ttl_ms: 0,
        }
    }
}

impl KimpConfig {
    /// Parses a JSON document (missing keys take their defaults) and validates it.
    pub fn from_json_str(raw: &str) -> Result<Self, CoreError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, url) in [
            ("fx_base_url", &self.fx_base_url),
            ("binance_base_url", &self.binance_base_url),
            ("upbit_base_url", &self.upbit_base_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(invalid(field, format!("'{url}' is not an http(s) URL")));
            }
        }

        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(invalid(
                "currency",
                format!("'{}' is not a 3-letter uppercase code", self.currency),
            ));
        }
        if self.domestic_prefix.trim().is_empty() {
            return Err(invalid("domestic_prefix", "must not be empty"));
        }
        if !self.fallback_rate.is_finite() || self.fallback_rate <= 0.0 {
            return Err(invalid("fallback_rate", "must be a positive number"));
        }
        if self.timeout_ms == 0 {
            return Err(invalid("timeout_ms", "must be greater than zero"));
        }
        if self.breaker_failure_threshold == 0 {
            return Err(invalid("breaker_failure_threshold", "must be greater than zero"));
        }

        Ok(())
    }

    pub fn circuit_breaker(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.breaker_failure_threshold,
            open_timeout: Duration::from_millis(self.breaker_open_timeout_ms),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::exponential(self.max_retries)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ValidationError {
    ValidationError::InvalidConfig {
        field,
        reason: reason.into(),
    }
}
