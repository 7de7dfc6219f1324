use std::sync::Arc;

use tracing::warn;

use crate::upstream::{FxRateSource, Fetched, Stage, UpstreamFailure};
use crate::ExchangeRate;

/// Live USD rate with a constant fallback; never fails.
#[derive(Clone)]
pub struct ExchangeRateProvider {
    source: Arc<dyn FxRateSource>,
    fallback_rate: f64,
}

impl ExchangeRateProvider {
    pub fn new(source: Arc<dyn FxRateSource>, fallback_rate: f64) -> Self {
        Self {
            source,
            fallback_rate,
        }
    }

    pub fn source(&self) -> &Arc<dyn FxRateSource> {
        &self.source
    }

    pub fn fallback_rate(&self) -> f64 {
        self.fallback_rate
    }

    /// Resolves the rate, recording why the fallback was used when it was.
    pub async fn resolve(&self) -> Fetched<ExchangeRate> {
        match self.source.usd_rate().await {
            Ok(rate) => Fetched::ok(ExchangeRate::live(rate)),
            Err(error) => {
                warn!(
                    venue = %self.source.venue(),
                    fallback_rate = self.fallback_rate,
                    %error,
                    "exchange rate lookup failed; using fallback rate"
                );
                let failure = UpstreamFailure::new(self.source.venue(), Stage::ExchangeRate, &error);
                Fetched::degraded(
                    ExchangeRate::fallback(self.fallback_rate, error.message()),
                    failure,
                )
            }
        }
    }

    pub async fn get_rate(&self) -> ExchangeRate {
        self.resolve().await.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ExchangeRateApiAdapter;
    use crate::http_client::ScriptedHttpClient;
    use crate::KimpConfig;

    fn provider(client: ScriptedHttpClient) -> ExchangeRateProvider {
        let config = KimpConfig {
            max_retries: 0,
            ..KimpConfig::default()
        };
        let source = ExchangeRateApiAdapter::from_config(Arc::new(client), &config);
        ExchangeRateProvider::new(Arc::new(source), config.fallback_rate)
    }

    #[tokio::test]
    async fn live_rate_is_not_flagged() {
        let provider = provider(
            ScriptedHttpClient::new().json("https://api.exchangerate-api.com/", r#"{"rates":{"KRW":1350}}"#),
        );

        let resolved = provider.resolve().await;

        assert!(resolved.is_success());
        assert_eq!(resolved.data, ExchangeRate::live(1_350.0));
    }

    #[tokio::test]
    async fn failure_substitutes_fallback_and_records_reason() {
        let provider = provider(ScriptedHttpClient::new());

        let resolved = provider.resolve().await;

        assert_eq!(resolved.data.usd_to_domestic, 1_300.0);
        assert!(resolved.data.is_fallback);
        assert!(resolved
            .data
            .fallback_reason
            .as_deref()
            .is_some_and(|reason| reason.contains("no scripted response")));
        let failure = resolved.failure.expect("failure recorded");
        assert_eq!(failure.stage, Stage::ExchangeRate);
        assert_eq!(failure.code, "upstream.unavailable");
    }
}
