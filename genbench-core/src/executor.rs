use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::client::{CompletionRequest, TextGenerationClient, TransportError};
use crate::config::BenchConfig;
use crate::outcome::RequestOutcome;

/// Sends one completion request and turns whatever happens into an outcome.
#[derive(Clone)]
pub struct RequestExecutor {
    client: Arc<dyn TextGenerationClient>,
    endpoint: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    timeout: Duration,
}

impl RequestExecutor {
    pub fn new(client: Arc<dyn TextGenerationClient>, config: &BenchConfig) -> Self {
        Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeout: config.request_timeout(),
        }
    }

    pub async fn execute(&self, prompt: &str, request_id: u64, cancel: &CancellationToken) -> RequestOutcome {
        let request = CompletionRequest {
            endpoint: self.endpoint.clone(),
            model: self.model.clone(),
            prompt: prompt.to_owned(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let start = Instant::now();
        let result = tokio::select! {
            _ = cancel.cancelled() => Err(TransportError::Cancelled),
            res = tokio::time::timeout(self.timeout, self.client.send(&request, self.timeout)) => {
                res.unwrap_or_else(|_| Err(TransportError::Timeout(self.timeout)))
            }
        };
        let latency = start.elapsed().as_secs_f64();

        match result {
            Ok(raw) if raw.is_success() => RequestOutcome::success(
                request_id,
                prompt,
                latency,
                raw.completion_tokens(),
                raw.total_tokens(),
                raw.first_text(),
            ),
            Ok(raw) => {
                debug!(request_id, status = raw.status, "request failed");
                RequestOutcome::failure(
                    request_id,
                    prompt,
                    latency,
                    format!("Non-success status {}", raw.status),
                )
            }
            Err(e) => {
                debug!(request_id, error = %e, "request failed");
                RequestOutcome::failure(request_id, prompt, latency, e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{Choice, RawResponse, Usage};
    use async_trait::async_trait;

    struct FixedClient {
        delay: Duration,
        response: fn() -> std::result::Result<RawResponse, TransportError>,
    }

    #[async_trait]
    impl TextGenerationClient for FixedClient {
        async fn send(
            &self,
            _request: &CompletionRequest,
            _timeout: Duration,
        ) -> std::result::Result<RawResponse, TransportError> {
            tokio::time::sleep(self.delay).await;
            (self.response)()
        }
    }

    fn ok_response() -> std::result::Result<RawResponse, TransportError> {
        Ok(RawResponse {
            status: 200,
            usage: Some(Usage {
                completion_tokens: 20,
                total_tokens: 28,
            }),
            choices: vec![Choice {
                text: "Paris is the capital of France.".into(),
            }],
        })
    }

    fn executor(delay: Duration, response: fn() -> std::result::Result<RawResponse, TransportError>) -> RequestExecutor {
        let config = BenchConfig {
            request_timeout_seconds: 5,
            ..Default::default()
        };
        RequestExecutor::new(Arc::new(FixedClient { delay, response }), &config)
    }

    #[tokio::test(start_paused = true)]
    async fn times_successful_request() {
        let exec = executor(Duration::from_secs(2), ok_response);
        let outcome = exec.execute("What?", 4, &CancellationToken::new()).await;

        assert!(outcome.succeeded());
        assert_eq!(outcome.request_id(), 4);
        assert_eq!(outcome.completion_tokens(), 20);
        assert_eq!(outcome.total_tokens(), 28);
        assert!((outcome.latency_seconds() - 2.0).abs() < 1e-3);
        assert!((outcome.tokens_per_second() - 10.0).abs() < 1e-2);
        assert_eq!(outcome.response_excerpt(), Some("Paris is the capital of France."));
    }

    #[tokio::test(start_paused = true)]
    async fn transport_error_becomes_failure() {
        let exec = executor(Duration::from_millis(300), || {
            Err(TransportError::Decode("expected value".into()))
        });
        let outcome = exec.execute("p", 0, &CancellationToken::new()).await;

        assert!(!outcome.succeeded());
        assert!(outcome.error_message().unwrap().contains("expected value"));
        assert!((outcome.latency_seconds() - 0.3).abs() < 1e-3);
        assert_eq!(outcome.tokens_per_second(), 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn non_success_status_becomes_failure() {
        let exec = executor(Duration::ZERO, || {
            Ok(RawResponse {
                status: 503,
                usage: None,
                choices: Vec::new(),
            })
        });
        let outcome = exec.execute("p", 0, &CancellationToken::new()).await;
        assert!(!outcome.succeeded());
        assert_eq!(outcome.error_message(), Some("Non-success status 503"));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_request_times_out() {
        let exec = executor(Duration::from_secs(600), ok_response);
        let outcome = exec.execute("p", 1, &CancellationToken::new()).await;

        assert!(!outcome.succeeded());
        assert!(outcome.error_message().unwrap().contains("timeout"));
        assert!((outcome.latency_seconds() - 5.0).abs() < 1e-3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_ends_request() {
        let exec = executor(Duration::from_secs(60), ok_response);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = exec.execute("p", 2, &cancel).await;

        assert!(!outcome.succeeded());
        assert_eq!(outcome.error_message(), Some("Request cancelled"));
    }
}
