use std::sync::Arc;

use serde::Serialize;

use crate::cache::SnapshotCache;
use crate::calculator::{PremiumCalculator, PremiumCalculatorBuilder};
use crate::circuit_breaker::CircuitState;
use crate::http_client::HttpClient;
use crate::upstream::HealthStatus;
use crate::{ExchangeRate, KimpConfig, ResultSet, ValidationError};

/// Overall availability derived from the upstream circuits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallHealth {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub status: OverallHealth,
    pub upstreams: Vec<HealthStatus>,
}

impl HealthReport {
    pub fn from_statuses(upstreams: Vec<HealthStatus>) -> Self {
        let open = upstreams
            .iter()
            .filter(|status| status.circuit == CircuitState::Open)
            .count();
        let closed = upstreams
            .iter()
            .filter(|status| status.circuit == CircuitState::Closed)
            .count();

        let status = if closed == upstreams.len() {
            OverallHealth::Healthy
        } else if open == upstreams.len() {
            OverallHealth::Unhealthy
        } else {
            OverallHealth::Degraded
        };

        Self { status, upstreams }
    }
}

/// Calculator plus snapshot cache; the one instance request handlers share.
#[derive(Clone)]
pub struct KimpService {
    calculator: Arc<PremiumCalculator>,
    cache: SnapshotCache,
}

impl KimpService {
    pub fn new(calculator: PremiumCalculator, cache: SnapshotCache) -> Self {
        Self {
            calculator: Arc::new(calculator),
            cache,
        }
    }

    /// Builds the production service; `http_client` overrides the reqwest transport.
    pub fn from_config(
        config: &KimpConfig,
        http_client: Option<Arc<dyn HttpClient>>,
    ) -> Result<Self, ValidationError> {
        let mut builder = PremiumCalculatorBuilder::new(config.clone());
        if let Some(http_client) = http_client {
            builder = builder.with_http_client(http_client);
        }
        Ok(Self::new(builder.build()?, SnapshotCache::new(config.cache_ttl())))
    }

    pub fn calculator(&self) -> &PremiumCalculator {
        &self.calculator
    }

    /// Latest result set, from the cache when it is enabled and fresh.
    pub async fn snapshot(&self) -> Arc<ResultSet> {
        let calculator = &self.calculator;
        self.cache.get_or_refresh(|| calculator.calculate()).await
    }

    pub async fn exchange_rate(&self) -> ExchangeRate {
        self.calculator.exchange_rate().await
    }

    pub fn health(&self) -> HealthReport {
        HealthReport::from_statuses(self.calculator.health())
    }
}
