use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the circuit opens
    pub failure_threshold: u32,
    /// How long the circuit stays open before allowing a trial call
    pub reset_timeout: Duration,
    /// Trial calls allowed while half-open
    pub half_open_max_attempts: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            reset_timeout: Duration::from_secs(30),
            half_open_max_attempts: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    last_failure_at: Option<Instant>,
    half_open_in_flight: u32,
}

/// Outcome of a pre-call circuit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerDecision {
    Proceed,
    /// Proceed as a half-open trial call. The caller holds the reserved trial
    /// slot and must report the outcome to the breaker: a failed trial that
    /// goes unreported leaves the slot taken and the circuit stuck half-open.
    Trial,
    /// The circuit is open; no call may start before `retry_in` elapses
    Blocked { retry_in: Duration },
}

/// Gate in front of the synthesis endpoint that stops new attempts while the
/// upstream is failing.
///
/// Closed -> Open after `failure_threshold` consecutive failures; Open ->
/// Half-Open once `reset_timeout` elapses, letting through
/// `half_open_max_attempts` trial calls; trial success closes the circuit,
/// trial failure re-opens it and restarts the timeout clock.
///
/// Shared across all jobs of a pipeline as an injected `Arc`, never a
/// module-level singleton, so tests can pre-load state and independent
/// pipelines keep isolated breakers.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                last_failure_at: None,
                half_open_in_flight: 0,
            }),
        }
    }

    /// Whether a new synthesis attempt may start right now.
    ///
    /// Transitions Open -> Half-Open when the reset timeout has elapsed and
    /// reserves one of the half-open trial slots for the caller.
    pub fn check_state(&self) -> BreakerDecision {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        match inner.state {
            CircuitState::Closed => BreakerDecision::Proceed,
            CircuitState::Open => {
                let elapsed = inner
                    .last_failure_at
                    .map(|at| at.elapsed())
                    .unwrap_or(Duration::MAX);
                if elapsed >= self.config.reset_timeout {
                    inner.state = CircuitState::HalfOpen;
                    inner.half_open_in_flight = 1;
                    tracing::info!("Circuit breaker half-open, allowing one trial call");
                    BreakerDecision::Trial
                } else {
                    BreakerDecision::Blocked {
                        retry_in: self.config.reset_timeout - elapsed,
                    }
                }
            }
            CircuitState::HalfOpen => {
                if inner.half_open_in_flight < self.config.half_open_max_attempts {
                    inner.half_open_in_flight += 1;
                    BreakerDecision::Trial
                } else {
                    BreakerDecision::Blocked {
                        retry_in: self.config.reset_timeout,
                    }
                }
            }
        }
    }

    /// Report a successful call: closes the circuit and resets the counter.
    pub fn on_success(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.state != CircuitState::Closed {
            tracing::info!("Circuit breaker closed after successful trial call");
        }
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.half_open_in_flight = 0;
    }

    /// Report a permanently failed job (one report per job, not per attempt).
    pub fn on_failure(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
        inner.last_failure_at = Some(Instant::now());

        match inner.state {
            CircuitState::HalfOpen => {
                // Trial call failed: re-open and restart the timeout clock
                inner.state = CircuitState::Open;
                inner.half_open_in_flight = 0;
                tracing::warn!("Circuit breaker re-opened after failed trial call");
            }
            CircuitState::Closed if inner.consecutive_failures >= self.config.failure_threshold => {
                inner.state = CircuitState::Open;
                tracing::warn!(
                    consecutive_failures = inner.consecutive_failures,
                    "Circuit breaker opened"
                );
            }
            _ => {}
        }
    }

    pub fn is_open(&self) -> bool {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.state == CircuitState::Open
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}
