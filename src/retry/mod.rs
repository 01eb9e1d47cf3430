//! Retry policy with error classification and circuit integration.
//!
//! `RetryPolicy::execute` wraps a single backend operation: it consults the
//! backend's circuit breaker before each attempt, classifies failures into
//! transient / rate-limited / permanent, and backs off exponentially with
//! jitter between transient attempts. It is the single point where
//! `CircuitBreaker::on_success`/`on_failure` fire, and it emits one
//! `CallOutcome` per attempt for the trackers. It knows nothing about the
//! dead-letter queue; routing exhausted work there is the orchestrator's job.

use crate::backend::{BackendError, ExtractionResult};
use crate::breaker::CircuitBreaker;
use crate::config::RetryConfig;
use crate::tracking::CallOutcome;
use std::future::Future;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Retry classification of a backend failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Timeouts, 5xx, connection errors: retry with backoff
    Transient,
    /// 429/quota: retry, honoring the provider's hint when present
    RateLimited { retry_after: Option<Duration> },
    /// Auth failures, malformed requests, other 4xx: fail immediately
    Permanent,
}

/// Classify a backend error for retry decisions.
pub fn classify(error: &BackendError) -> ErrorClass {
    match error {
        BackendError::Network(_) | BackendError::Timeout(_) => ErrorClass::Transient,
        BackendError::RateLimited { retry_after } => ErrorClass::RateLimited {
            retry_after: *retry_after,
        },
        BackendError::Upstream { status, .. } => match status {
            408 | 500..=599 => ErrorClass::Transient,
            429 => ErrorClass::RateLimited { retry_after: None },
            _ => ErrorClass::Permanent,
        },
        BackendError::Auth(_)
        | BackendError::InvalidResponse(_)
        | BackendError::Configuration(_) => ErrorClass::Permanent,
    }
}

/// Terminal result of a retried call.
#[derive(Error, Debug)]
pub enum RetryError {
    /// The breaker rejected the call before any attempt was made.
    #[error("circuit open for backend '{backend_id}'")]
    CircuitOpen { backend_id: String },

    /// A permanent failure; no retry was attempted.
    #[error("permanent failure from backend '{backend_id}': {source}")]
    Permanent {
        backend_id: String,
        source: BackendError,
    },

    /// All attempts consumed on transient/rate-limited failures.
    #[error("retries exhausted for backend '{backend_id}' after {attempts} attempts: {source}")]
    Exhausted {
        backend_id: String,
        attempts: u32,
        source: BackendError,
    },
}

impl RetryError {
    pub fn source_kind(&self) -> &'static str {
        match self {
            RetryError::CircuitOpen { .. } => "circuit_open",
            RetryError::Permanent { source, .. } | RetryError::Exhausted { source, .. } => {
                source.kind()
            }
        }
    }
}

/// Bounded exponential backoff executor.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Delay before the retry following `attempt` (zero-based).
    fn backoff(&self, attempt: u32, class: ErrorClass) -> Duration {
        if let ErrorClass::RateLimited {
            retry_after: Some(hint),
        } = class
        {
            // The provider's hint is authoritative; no cap applied.
            return hint;
        }

        let exp = attempt.min(20);
        let delay_ms = self
            .config
            .base_delay_ms
            .saturating_mul(1u64 << exp)
            .min(self.config.max_delay_ms);
        Duration::from_millis(delay_ms.saturating_add(jitter_ms(self.config.jitter_ms)))
    }

    /// Run `operation` against one backend with classified retries.
    ///
    /// Returns the terminal result plus the `CallOutcome` of every attempt
    /// made. A circuit-open rejection produces no outcome and consumes no
    /// attempt.
    pub async fn execute<F, Fut>(
        &self,
        backend_id: &str,
        max_attempts: u32,
        breaker: &CircuitBreaker,
        mut operation: F,
    ) -> (Result<ExtractionResult, RetryError>, Vec<CallOutcome>)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<ExtractionResult, BackendError>>,
    {
        let max_attempts = max_attempts.max(1);
        let mut outcomes = Vec::new();

        for attempt in 0..max_attempts {
            if !breaker.allow() {
                tracing::debug!(backend_id, "Circuit open, failing fast");
                return (
                    Err(RetryError::CircuitOpen {
                        backend_id: backend_id.to_string(),
                    }),
                    outcomes,
                );
            }

            let start = Instant::now();
            let result = operation().await;
            let latency_ms = start.elapsed().as_millis() as u64;

            match result {
                Ok(extraction) => {
                    breaker.on_success();
                    outcomes.push(CallOutcome::success(backend_id, latency_ms, &extraction));
                    return (Ok(extraction), outcomes);
                }
                Err(error) => {
                    breaker.on_failure();
                    let class = classify(&error);
                    outcomes.push(CallOutcome::failure(backend_id, latency_ms, &error, class));

                    match class {
                        ErrorClass::Permanent => {
                            tracing::warn!(
                                backend_id,
                                error = %error,
                                "Permanent failure, not retrying"
                            );
                            return (
                                Err(RetryError::Permanent {
                                    backend_id: backend_id.to_string(),
                                    source: error,
                                }),
                                outcomes,
                            );
                        }
                        ErrorClass::Transient | ErrorClass::RateLimited { .. } => {
                            if attempt + 1 >= max_attempts {
                                return (
                                    Err(RetryError::Exhausted {
                                        backend_id: backend_id.to_string(),
                                        attempts: max_attempts,
                                        source: error,
                                    }),
                                    outcomes,
                                );
                            }
                            let delay = self.backoff(attempt, class);
                            tracing::debug!(
                                backend_id,
                                attempt = attempt + 1,
                                delay_ms = delay.as_millis() as u64,
                                error = %error,
                                "Retrying after backoff"
                            );
                            tokio::time::sleep(delay).await;
                        }
                    }
                }
            }
        }

        // max_attempts >= 1 guarantees the loop returned before this point.
        unreachable!("retry loop always returns")
    }
}

/// Jitter drawn from the clock's subsecond nanos; enough to decorrelate
/// retry storms without a RNG dependency.
fn jitter_ms(max_jitter_ms: u64) -> u64 {
    if max_jitter_ms == 0 {
        return 0;
    }
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64 % max_jitter_ms)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BreakerConfig;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(RetryConfig {
            base_delay_ms: 1,
            max_delay_ms: 4,
            jitter_ms: 0,
        })
    }

    fn breaker() -> CircuitBreaker {
        CircuitBreaker::new("test", BreakerConfig::default())
    }

    fn ok_result() -> ExtractionResult {
        ExtractionResult {
            fields: BTreeMap::new(),
            confidence: 0.9,
            completeness: 1.0,
            validation_passed: true,
            usage: Default::default(),
        }
    }

    #[test]
    fn classification_matrix() {
        assert_eq!(
            classify(&BackendError::Timeout(1000)),
            ErrorClass::Transient
        );
        assert_eq!(
            classify(&BackendError::Network("refused".into())),
            ErrorClass::Transient
        );
        assert_eq!(
            classify(&BackendError::Upstream {
                status: 503,
                message: String::new()
            }),
            ErrorClass::Transient
        );
        assert_eq!(
            classify(&BackendError::RateLimited {
                retry_after: Some(Duration::from_secs(2))
            }),
            ErrorClass::RateLimited {
                retry_after: Some(Duration::from_secs(2))
            }
        );
        assert_eq!(
            classify(&BackendError::Upstream {
                status: 400,
                message: String::new()
            }),
            ErrorClass::Permanent
        );
        assert_eq!(
            classify(&BackendError::Auth("bad key".into())),
            ErrorClass::Permanent
        );
    }

    #[test]
    fn backoff_doubles_then_caps() {
        let policy = RetryPolicy::new(RetryConfig {
            base_delay_ms: 1_000,
            max_delay_ms: 8_000,
            jitter_ms: 0,
        });
        assert_eq!(
            policy.backoff(0, ErrorClass::Transient),
            Duration::from_millis(1_000)
        );
        assert_eq!(
            policy.backoff(1, ErrorClass::Transient),
            Duration::from_millis(2_000)
        );
        assert_eq!(
            policy.backoff(2, ErrorClass::Transient),
            Duration::from_millis(4_000)
        );
        assert_eq!(
            policy.backoff(3, ErrorClass::Transient),
            Duration::from_millis(8_000)
        );
        assert_eq!(
            policy.backoff(10, ErrorClass::Transient),
            Duration::from_millis(8_000)
        );
    }

    #[test]
    fn rate_limit_hint_is_authoritative() {
        let policy = RetryPolicy::new(RetryConfig {
            base_delay_ms: 1_000,
            max_delay_ms: 8_000,
            jitter_ms: 50,
        });
        let delay = policy.backoff(
            0,
            ErrorClass::RateLimited {
                retry_after: Some(Duration::from_secs(30)),
            },
        );
        assert_eq!(delay, Duration::from_secs(30));
    }

    #[tokio::test]
    async fn permanent_failure_single_attempt() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();
        let breaker = breaker();

        let (result, outcomes) = policy()
            .execute("test", 3, &breaker, move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err(BackendError::Auth("denied".into())) }
            })
            .await;

        assert!(matches!(result, Err(RetryError::Permanent { .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(outcomes.len(), 1);
        assert!(!outcomes[0].success);
    }

    #[tokio::test]
    async fn transient_failure_retries_to_exhaustion() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();
        let breaker = breaker();

        let (result, outcomes) = policy()
            .execute("test", 3, &breaker, move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err(BackendError::Timeout(10)) }
            })
            .await;

        assert!(matches!(
            result,
            Err(RetryError::Exhausted { attempts: 3, .. })
        ));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(outcomes.len(), 3);
    }

    #[tokio::test]
    async fn recovers_on_later_attempt() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();
        let breaker = breaker();

        let (result, outcomes) = policy()
            .execute("test", 3, &breaker, move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(BackendError::Timeout(10))
                    } else {
                        Ok(ok_result())
                    }
                }
            })
            .await;

        assert!(result.is_ok());
        assert_eq!(outcomes.len(), 2);
        assert!(!outcomes[0].success);
        assert!(outcomes[1].success);
    }

    #[tokio::test]
    async fn circuit_open_fails_fast_without_attempt() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();
        let breaker = CircuitBreaker::new(
            "test",
            BreakerConfig {
                failure_threshold: 1,
                cooldown_seconds: 60,
                success_threshold: 1,
            },
        );
        breaker.on_failure();

        let (result, outcomes) = policy()
            .execute("test", 3, &breaker, move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok(ok_result()) }
            })
            .await;

        assert!(matches!(result, Err(RetryError::CircuitOpen { .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 0);
        assert!(outcomes.is_empty());
    }

    #[tokio::test]
    async fn failures_trip_breaker_mid_retry() {
        // threshold 2: the second failed attempt opens the circuit, the
        // third attempt is rejected without running.
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();
        let breaker = CircuitBreaker::new(
            "test",
            BreakerConfig {
                failure_threshold: 2,
                cooldown_seconds: 60,
                success_threshold: 1,
            },
        );

        let (result, outcomes) = policy()
            .execute("test", 5, &breaker, move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err(BackendError::Timeout(10)) }
            })
            .await;

        assert!(matches!(result, Err(RetryError::CircuitOpen { .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert_eq!(outcomes.len(), 2);
    }

    #[tokio::test]
    async fn success_records_usage_and_quality() {
        let breaker = breaker();
        let (result, outcomes) = policy()
            .execute("test", 3, &breaker, || async { Ok(ok_result()) })
            .await;

        assert!(result.is_ok());
        assert_eq!(outcomes.len(), 1);
        let outcome = &outcomes[0];
        assert!(outcome.success);
        assert!(outcome.usage.is_some());
        let quality = outcome.quality.expect("quality sample");
        assert_eq!(quality.confidence, 0.9);
    }
}
