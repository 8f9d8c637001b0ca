//! Circuit breaker for unreliable out-of-process collaborators
//!
//! State transitions:
//! - Closed → Open: when consecutive failures reach the threshold
//! - Open → HalfOpen: after the open duration elapses
//! - HalfOpen → Closed: when a trial call succeeds
//! - HalfOpen → Open: when a trial call fails

use parking_lot::RwLock;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation, calls pass through
    Closed,
    /// Calls fail fast without reaching the collaborator
    Open,
    /// One trial call is allowed through; others fail fast until it resolves
    HalfOpen,
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit
    pub failure_threshold: u32,
    /// How long the circuit stays open before a trial call
    pub open_duration: Duration,
    /// Upper bound on a single call; exceeding it counts as a failure
    pub call_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_duration: Duration::from_secs(30),
            call_timeout: Duration::from_millis(800),
        }
    }
}

#[derive(Clone)]
pub struct CircuitBreaker {
    name: &'static str,
    config: CircuitBreakerConfig,
    state: Arc<RwLock<BreakerState>>,
}

struct BreakerState {
    current: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    /// Start of the in-flight HalfOpen trial call
    trial_started: Option<Instant>,
}

impl CircuitBreaker {
    pub fn new(name: &'static str, config: CircuitBreakerConfig) -> Self {
        Self {
            name,
            config,
            state: Arc::new(RwLock::new(BreakerState {
                current: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                trial_started: None,
            })),
        }
    }

    pub fn state(&self) -> CircuitState {
        self.state.read().current
    }

    /// Runs a call under the breaker and the per-call timeout
    pub async fn call<F, Fut, T>(&self, f: F) -> EngineResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = EngineResult<T>>,
    {
        if self.should_reject_call() {
            return Err(EngineError::CircuitOpen(self.name));
        }

        let outcome = match tokio::time::timeout(self.config.call_timeout, f()).await {
            Ok(result) => result,
            Err(_) => Err(EngineError::Timeout(self.config.call_timeout)),
        };

        match &outcome {
            Ok(_) => self.record_success(),
            Err(_) => self.record_failure(),
        }
        outcome
    }

    fn should_reject_call(&self) -> bool {
        let mut state = self.state.write();

        match state.current {
            CircuitState::Open => match state.opened_at {
                Some(opened_at) if opened_at.elapsed() >= self.config.open_duration => {
                    info!(breaker = self.name, "Circuit breaker: Open → HalfOpen");
                    state.current = CircuitState::HalfOpen;
                    state.trial_started = Some(Instant::now());
                    false
                }
                _ => true,
            },
            // A trial older than the call timeout was abandoned by its caller.
            CircuitState::HalfOpen => match state.trial_started {
                Some(started) if started.elapsed() < self.config.call_timeout => true,
                _ => {
                    state.trial_started = Some(Instant::now());
                    false
                }
            },
            CircuitState::Closed => false,
        }
    }

    fn record_success(&self) {
        let mut state = self.state.write();
        state.consecutive_failures = 0;
        state.trial_started = None;

        if state.current == CircuitState::HalfOpen {
            info!(breaker = self.name, "Circuit breaker: HalfOpen → Closed");
            state.current = CircuitState::Closed;
            state.opened_at = None;
        }
    }

    fn record_failure(&self) {
        let mut state = self.state.write();
        state.consecutive_failures += 1;
        state.trial_started = None;

        match state.current {
            CircuitState::Closed if state.consecutive_failures >= self.config.failure_threshold => {
                warn!(
                    breaker = self.name,
                    failures = state.consecutive_failures,
                    "Circuit breaker: Closed → Open"
                );
                state.current = CircuitState::Open;
                state.opened_at = Some(Instant::now());
            }
            CircuitState::HalfOpen => {
                warn!(breaker = self.name, "Circuit breaker: HalfOpen → Open (trial failed)");
                state.current = CircuitState::Open;
                state.opened_at = Some(Instant::now());
            }
            _ => {}
        }
    }
}
