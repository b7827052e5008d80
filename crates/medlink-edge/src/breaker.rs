//! Circuit breaker guarding the broker transport.
//!
//! After `failure_threshold` consecutive failures the breaker opens and
//! every call fails fast for `cooldown`, so a saturated or unreachable
//! broker is not hammered. When the cooldown elapses one trial call is
//! allowed through; its outcome closes or re-opens the breaker.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
enum State {
    Closed { failures: u32 },
    Open { until: Instant },
    HalfOpen,
}

/// Consecutive-failure circuit breaker.
///
/// Internals are synchronous so the async publisher can consult it without
/// awaiting; recorded outcomes drive the state machine.
pub struct CircuitBreaker {
    failure_threshold: u32,
    cooldown: Duration,
    state: Mutex<State>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            failure_threshold,
            cooldown,
            state: Mutex::new(State::Closed { failures: 0 }),
        }
    }

    /// Whether a call may proceed right now.
    ///
    /// While open this returns `false` without side effects until the
    /// cooldown elapses, then transitions to half-open and admits one
    /// trial call.
    pub fn allow(&self) -> bool {
        let mut state = self.state.lock();
        match *state {
            State::Closed { .. } | State::HalfOpen => true,
            State::Open { until } => {
                if Instant::now() >= until {
                    tracing::info!("circuit breaker half-open, allowing trial call");
                    *state = State::HalfOpen;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Record a successful call: closes the breaker and resets the count.
    pub fn record_success(&self) {
        let mut state = self.state.lock();
        if matches!(*state, State::HalfOpen) {
            tracing::info!("circuit breaker reset");
        }
        *state = State::Closed { failures: 0 };
    }

    /// Record a failed call, opening the breaker at the threshold.
    pub fn record_failure(&self) {
        let mut state = self.state.lock();
        *state = match *state {
            State::Closed { failures } => {
                let failures = failures + 1;
                if failures >= self.failure_threshold {
                    tracing::warn!(
                        cooldown_secs = self.cooldown.as_secs(),
                        "circuit breaker opened"
                    );
                    State::Open {
                        until: Instant::now() + self.cooldown,
                    }
                } else {
                    State::Closed { failures }
                }
            }
            // A failed trial call re-opens for a full cooldown.
            State::HalfOpen => State::Open {
                until: Instant::now() + self.cooldown,
            },
            open @ State::Open { .. } => open,
        };
    }

    /// Whether the breaker is currently refusing calls.
    pub fn is_open(&self) -> bool {
        matches!(*self.state.lock(), State::Open { until } if Instant::now() < until)
    }
}
