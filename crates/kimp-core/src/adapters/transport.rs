use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::circuit_breaker::{CircuitBreaker, CircuitState};
use crate::http_client::{HttpClient, HttpError, HttpRequest};
use crate::retry::RetryPolicy;
use crate::upstream::SourceError;
use crate::{KimpConfig, VenueId};

/// GET-JSON plumbing shared by the adapters: circuit breaker, retry budget and
/// a hard per-attempt deadline.
#[derive(Clone)]
pub(crate) struct UpstreamTransport {
    venue: VenueId,
    http_client: Arc<dyn HttpClient>,
    circuit_breaker: Arc<CircuitBreaker>,
    retry: RetryPolicy,
    timeout_ms: u64,
}

impl UpstreamTransport {
    pub(crate) fn new(venue: VenueId, http_client: Arc<dyn HttpClient>, config: &KimpConfig) -> Self {
        Self {
            venue,
            http_client,
            circuit_breaker: Arc::new(CircuitBreaker::new(venue, config.circuit_breaker())),
            retry: config.retry_policy(),
            timeout_ms: config.timeout_ms,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[cfg(test)]
    pub(crate) fn with_circuit_breaker(mut self, circuit_breaker: Arc<CircuitBreaker>) -> Self {
        self.circuit_breaker = circuit_breaker;
        self
    }

    pub(crate) fn circuit_state(&self) -> CircuitState {
        self.circuit_breaker.state()
    }

    /// Fetches `url` and returns the body of a 2xx response.
    pub(crate) async fn get_body(&self, url: &str) -> Result<String, SourceError> {
        let mut attempt = 0;
        loop {
            match self.attempt(url).await {
                Ok(body) => return Ok(body),
                Err(error) if self.retry.should_retry(attempt, &error) => {
                    let delay = self.retry.delay_for_attempt(attempt);
                    debug!(
                        venue = %self.venue,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "retrying upstream call"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }

    async fn attempt(&self, url: &str) -> Result<String, SourceError> {
        if !self.circuit_breaker.allow_request() {
            return Err(SourceError::circuit_open(self.venue));
        }

        let request = HttpRequest::get(url)
            .with_header("accept", "application/json")
            .with_timeout_ms(self.timeout_ms);

        // Bounds transports that ignore `timeout_ms`; dropping the future cancels the call.
        let deadline = Duration::from_millis(self.timeout_ms);
        let response = match tokio::time::timeout(deadline, self.http_client.execute(request)).await
        {
            Ok(Ok(response)) => response,
            Ok(Err(error)) => {
                self.circuit_breaker.record_failure();
                return Err(self.transport_error(&error));
            }
            Err(_) => {
                self.circuit_breaker.record_failure();
                return Err(SourceError::unavailable(format!(
                    "{} request timed out after {} ms",
                    self.venue, self.timeout_ms
                )));
            }
        };

        if !response.is_success() {
            self.circuit_breaker.record_failure();
            return Err(SourceError::status(
                self.venue,
                response.status,
                self.retry.should_retry_status(response.status),
            ));
        }

        self.circuit_breaker.record_success();
        Ok(response.body)
    }

    fn transport_error(&self, error: &HttpError) -> SourceError {
        let converted =
            SourceError::unavailable(format!("{} transport error: {}", self.venue, error.message()));
        if error.retryable() {
            converted
        } else {
            converted.non_retryable()
        }
    }
}
