use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;

use super::transport::UpstreamTransport;
use crate::circuit_breaker::CircuitState;
use crate::http_client::HttpClient;
use crate::upstream::{FxRateSource, SourceError, Upstream, UpstreamFuture};
use crate::{KimpConfig, VenueId};

/// USD quote from exchangerate-api.com (`/v4/latest/USD`).
#[derive(Clone)]
pub struct ExchangeRateApiAdapter {
    transport: UpstreamTransport,
    base_url: String,
    currency: String,
}

impl ExchangeRateApiAdapter {
    pub fn from_config(http_client: Arc<dyn HttpClient>, config: &KimpConfig) -> Self {
        Self {
            transport: UpstreamTransport::new(VenueId::ExchangeRateApi, http_client, config),
            base_url: config.fx_base_url.trim_end_matches('/').to_owned(),
            currency: config.currency.clone(),
        }
    }

    fn latest_usd_url(&self) -> String {
        format!("{}/v4/latest/USD", self.base_url)
    }

    async fn fetch_usd_rate(&self) -> Result<f64, SourceError> {
        let body = self.transport.get_body(&self.latest_usd_url()).await?;
        parse_rate(&body, &self.currency)
    }
}

impl Upstream for ExchangeRateApiAdapter {
    fn venue(&self) -> VenueId {
        VenueId::ExchangeRateApi
    }

    fn circuit_state(&self) -> CircuitState {
        self.transport.circuit_state()
    }
}

impl FxRateSource for ExchangeRateApiAdapter {
    fn usd_rate(&self) -> UpstreamFuture<'_, f64> {
        Box::pin(self.fetch_usd_rate())
    }
}

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    #[serde(default)]
    rates: HashMap<String, f64>,
}

fn parse_rate(body: &str, currency: &str) -> Result<f64, SourceError> {
    let response: LatestRatesResponse = serde_json::from_str(body)
        .map_err(|e| SourceError::parse(format!("failed to parse exchange rate response: {e}")))?;

    let rate = response.rates.get(currency).copied().ok_or_else(|| {
        SourceError::parse(format!("exchange rate response has no {currency} quote"))
    })?;

    if !rate.is_finite() || rate <= 0.0 {
        return Err(SourceError::parse(format!(
            "exchange rate response has invalid {currency} quote {rate}"
        )));
    }

    Ok(rate)
}
