//! Chat gateway used by the evaluator.
//!
//! `ChatCompletionsClient` talks HTTP; `ProviderGateway` wraps any gateway with
//! bounded retries for transient transport errors and usage recording.

pub mod client;
pub mod error;
pub mod types;
pub mod usage;

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::sleep;

use usage::CallRecord;

pub use client::ChatCompletionsClient;
pub use error::ProviderError;
pub use types::*;
pub use usage::{NoopUsageSink, TracingUsageSink, UsageSink};

#[async_trait::async_trait]
pub trait ChatGateway: Send + Sync {
    /// Cheap local check that credentials are present and well-formed.
    fn check_credentials(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, ProviderError>;
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub max_retries: u32,
    pub retry_base_delay: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            retry_base_delay: Duration::from_secs(1),
        }
    }
}

pub struct ProviderGateway<G: ChatGateway, U: UsageSink> {
    inner: G,
    usage_sink: Arc<U>,
    config: GatewayConfig,
}

impl<U: UsageSink> ProviderGateway<ChatCompletionsClient, U> {
    pub fn from_env(usage_sink: Arc<U>) -> Result<Self, ProviderError> {
        Ok(Self::with_config(
            ChatCompletionsClient::from_env()?,
            usage_sink,
            GatewayConfig::default(),
        ))
    }
}

impl<G: ChatGateway, U: UsageSink> ProviderGateway<G, U> {
    pub fn with_config(inner: G, usage_sink: Arc<U>, config: GatewayConfig) -> Self {
        Self {
            inner,
            usage_sink,
            config,
        }
    }

    async fn record(
        &self,
        req: &ChatRequest,
        attempt: u32,
        result: &Result<ChatResponse, ProviderError>,
        elapsed: Duration,
    ) {
        let record = CallRecord::new(&req.model, req.attribution.caller)
            .run(req.attribution.run_id)
            .attempt(attempt)
            .latency(elapsed.as_millis() as u64);
        let record = match result {
            Ok(resp) => record.tokens(resp.input_tokens, resp.output_tokens),
            Err(err) => record.error(err.code()),
        };
        self.usage_sink.record(record).await;
    }
}

#[async_trait::async_trait]
impl<G: ChatGateway, U: UsageSink> ChatGateway for ProviderGateway<G, U> {
    fn check_credentials(&self) -> Result<(), ProviderError> {
        self.inner.check_credentials()
    }

    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let mut attempt = 0;
        loop {
            let started = Instant::now();
            let result = self.inner.chat(req.clone()).await;
            self.record(&req, attempt, &result, started.elapsed()).await;

            match result {
                Ok(resp) => return Ok(resp),
                Err(err) => {
                    if !err.is_retryable() || attempt >= self.config.max_retries {
                        return Err(err);
                    }
                    let delay = match &err {
                        ProviderError::RateLimited { retry_after, .. } => {
                            (*retry_after).min(backoff_delay(self.config.retry_base_delay, 5))
                        }
                        _ => backoff_delay(self.config.retry_base_delay, attempt),
                    };
                    tracing::debug!(error = %err, attempt, ?delay, "retrying chat call");
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let multiplier = 2u32.pow(attempt.min(5));
    base * multiplier
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Flaky {
        failures: u32,
        calls: AtomicU32,
        retryable: bool,
    }

    #[async_trait::async_trait]
    impl ChatGateway for Flaky {
        async fn chat(&self, _req: ChatRequest) -> Result<ChatResponse, ProviderError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                return Err(ProviderError::provider("boom", self.retryable));
            }
            Ok(ChatResponse {
                content: "ok".into(),
                input_tokens: 1,
                output_tokens: 1,
                latency: Duration::ZERO,
                finish_reason: FinishReason::Stop,
            })
        }
    }

    fn gateway(failures: u32, retryable: bool) -> ProviderGateway<Flaky, NoopUsageSink> {
        ProviderGateway::with_config(
            Flaky {
                failures,
                calls: AtomicU32::new(0),
                retryable,
            },
            Arc::new(NoopUsageSink),
            GatewayConfig {
                max_retries: 2,
                retry_base_delay: Duration::from_millis(0),
            },
        )
    }

    fn request() -> ChatRequest {
        ChatRequest::new("m", vec![Message::user("hi")], Attribution::new("test"))
    }

    #[tokio::test]
    async fn retries_transient_errors() {
        let gw = gateway(2, true);
        let resp = gw.chat(request()).await.unwrap();
        assert_eq!(resp.content, "ok");
        assert_eq!(gw.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let gw = gateway(1, false);
        assert!(gw.chat(request()).await.is_err());
        assert_eq!(gw.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn backoff_doubles() {
        let base = Duration::from_millis(100);
        assert_eq!(backoff_delay(base, 0), Duration::from_millis(100));
        assert_eq!(backoff_delay(base, 2), Duration::from_millis(400));
    }
}
