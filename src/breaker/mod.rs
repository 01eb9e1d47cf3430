//! Per-backend circuit breakers.
//!
//! A breaker stops traffic to a backend after repeated failures and probes
//! for recovery after a cooldown. Only `Closed` and `HalfOpen` admit calls;
//! `Open` admits the first call after the cooldown elapses, which is itself
//! the transition to `HalfOpen`.

use crate::config::BreakerConfig;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// Circuit state for one backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation
    Closed,
    /// Tripped; calls are rejected until the cooldown elapses
    Open,
    /// Probing recovery; a failure reopens immediately
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half_open"),
        }
    }
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    opened_at: Option<Instant>,
}

/// Circuit breaker for a single backend.
#[derive(Debug)]
pub struct CircuitBreaker {
    backend_id: String,
    config: BreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(backend_id: impl Into<String>, config: BreakerConfig) -> Self {
        Self {
            backend_id: backend_id.into(),
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                consecutive_successes: 0,
                opened_at: None,
            }),
        }
    }

    fn locked(&self) -> MutexGuard<'_, BreakerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether a call may proceed right now.
    ///
    /// The first `allow()` after the cooldown elapses transitions the
    /// breaker to `HalfOpen` and returns true.
    pub fn allow(&self) -> bool {
        let mut inner = self.locked();
        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let cooled_down = inner
                    .opened_at
                    .map(|at| at.elapsed() >= self.config.cooldown())
                    .unwrap_or(true);
                if cooled_down {
                    inner.state = CircuitState::HalfOpen;
                    inner.consecutive_successes = 0;
                    tracing::info!(
                        backend_id = %self.backend_id,
                        "Circuit half-open, probing backend"
                    );
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn on_success(&self) {
        let mut inner = self.locked();
        inner.consecutive_failures = 0;
        if inner.state == CircuitState::HalfOpen {
            inner.consecutive_successes += 1;
            if inner.consecutive_successes >= self.config.success_threshold {
                inner.state = CircuitState::Closed;
                inner.opened_at = None;
                tracing::info!(backend_id = %self.backend_id, "Circuit closed");
            }
        }
    }

    pub fn on_failure(&self) {
        let mut inner = self.locked();
        inner.consecutive_successes = 0;
        inner.consecutive_failures += 1;
        match inner.state {
            // A half-open failure reopens immediately and resets the cooldown.
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
                tracing::warn!(
                    backend_id = %self.backend_id,
                    "Circuit reopened: probe failed"
                );
            }
            CircuitState::Closed
                if inner.consecutive_failures >= self.config.failure_threshold =>
            {
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
                tracing::warn!(
                    backend_id = %self.backend_id,
                    consecutive_failures = inner.consecutive_failures,
                    "Circuit opened"
                );
            }
            _ => {}
        }
    }

    pub fn state(&self) -> CircuitState {
        self.locked().state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.locked().consecutive_failures
    }

    /// Force the breaker back to closed (used by operator reset).
    pub fn reset(&self) {
        let mut inner = self.locked();
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.consecutive_successes = 0;
        inner.opened_at = None;
        tracing::info!(backend_id = %self.backend_id, "Circuit reset");
    }
}

/// Registry of breakers, one per backend id, created lazily.
pub struct BreakerRegistry {
    breakers: DashMap<String, Arc<CircuitBreaker>>,
    config: BreakerConfig,
}

impl BreakerRegistry {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            breakers: DashMap::new(),
            config,
        }
    }

    pub fn get(&self, backend_id: &str) -> Arc<CircuitBreaker> {
        self.breakers
            .entry(backend_id.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(backend_id, self.config)))
            .clone()
    }

    pub fn state(&self, backend_id: &str) -> CircuitState {
        self.breakers
            .get(backend_id)
            .map(|b| b.state())
            .unwrap_or(CircuitState::Closed)
    }

    pub fn reset(&self, backend_id: &str) {
        if let Some(breaker) = self.breakers.get(backend_id) {
            breaker.reset();
        }
    }
}
