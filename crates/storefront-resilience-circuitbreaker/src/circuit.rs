use crate::config::CircuitBreakerConfig;
use crate::events::CircuitBreakerEvent;
#[cfg(feature = "metrics")]
use metrics::{counter, gauge};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// State of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
#[repr(u8)]
pub enum CircuitState {
    /// Calls flow through and outcomes are recorded.
    Closed = 0,
    /// Calls are rejected without reaching the operation.
    Open = 1,
    /// A limited number of trial calls test the operation.
    HalfOpen = 2,
}

impl CircuitState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }

    /// Upper-case label (`CLOSED`, `OPEN`, `HALF_OPEN`) used in logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            CircuitState::Closed => "CLOSED",
            CircuitState::Open => "OPEN",
            CircuitState::HalfOpen => "HALF_OPEN",
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of a breaker's window.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CircuitMetrics {
    /// Current state.
    pub state: CircuitState,
    /// Outcomes currently in the sliding window.
    pub total_calls: usize,
    /// Failed outcomes in the window.
    pub failure_count: usize,
    /// Successful outcomes in the window.
    pub success_count: usize,
    /// `failure_count / total_calls`, 0.0 for an empty window.
    pub failure_rate: f64,
    /// Time spent in the current state.
    pub time_since_state_change: Duration,
}

/// Admission ticket returned by [`Circuit::try_acquire`].
///
/// Trial calls admitted in half-open carry the generation they were admitted in so that a
/// late result from an earlier half-open episode is not counted against the current one.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Admission {
    trial_generation: Option<u64>,
}

pub(crate) struct Circuit {
    state: CircuitState,
    state_atomic: Arc<AtomicU8>,
    last_state_change: Instant,
    generation: u64,
    /// Most recent outcomes, `true` for a failure.
    window: VecDeque<bool>,
    trials_in_flight: usize,
    trial_successes: usize,
    /// Raised while the circuit is locked, published by the caller after unlocking.
    pending: Vec<CircuitBreakerEvent>,
}

impl Circuit {
    pub(crate) fn new(state_atomic: Arc<AtomicU8>) -> Self {
        state_atomic.store(CircuitState::Closed as u8, Ordering::Release);
        Self {
            state: CircuitState::Closed,
            state_atomic,
            last_state_change: Instant::now(),
            generation: 0,
            window: VecDeque::new(),
            trials_in_flight: 0,
            trial_successes: 0,
            pending: Vec::new(),
        }
    }

    pub(crate) fn state(&self) -> CircuitState {
        self.state
    }

    pub(crate) fn take_events(&mut self) -> Vec<CircuitBreakerEvent> {
        std::mem::take(&mut self.pending)
    }

    pub(crate) fn metrics(&self) -> CircuitMetrics {
        let (total, failures) = self.counts();
        CircuitMetrics {
            state: self.state,
            total_calls: total,
            failure_count: failures,
            success_count: total - failures,
            failure_rate: rate(failures, total),
            time_since_state_change: self.last_state_change.elapsed(),
        }
    }

    /// Decides whether a call may proceed, moving OPEN to HALF_OPEN once the cool-down has
    /// elapsed.
    pub(crate) fn try_acquire(&mut self, config: &CircuitBreakerConfig) -> Option<Admission> {
        if self.state == CircuitState::Open
            && self.last_state_change.elapsed() >= config.wait_duration_in_open
        {
            self.transition_to(CircuitState::HalfOpen, config);
        }

        let admission = match self.state {
            CircuitState::Closed => Some(Admission {
                trial_generation: None,
            }),
            CircuitState::Open => None,
            CircuitState::HalfOpen => {
                if self.trials_in_flight + self.trial_successes
                    < config.permitted_calls_in_half_open
                {
                    self.trials_in_flight += 1;
                    Some(Admission {
                        trial_generation: Some(self.generation),
                    })
                } else {
                    None
                }
            }
        };

        let event = match admission {
            Some(_) => CircuitBreakerEvent::CallPermitted {
                policy: config.name.clone(),
                state: self.state,
            },
            None => CircuitBreakerEvent::CallRejected {
                policy: config.name.clone(),
                state: self.state,
            },
        };
        self.pending.push(event);

        admission
    }

    pub(crate) fn record_success(
        &mut self,
        admission: Admission,
        config: &CircuitBreakerConfig,
        duration: Duration,
    ) {
        self.pending.push(CircuitBreakerEvent::SuccessRecorded {
            policy: config.name.clone(),
            state: self.state,
            duration,
        });

        #[cfg(feature = "metrics")]
        counter!("circuitbreaker_calls_total", "policy" => config.name.to_string(), "outcome" => "success").increment(1);

        match self.state {
            CircuitState::Closed => {
                self.push(false, config);
                self.evaluate(config);
            }
            CircuitState::HalfOpen => {
                if self.is_current_trial(admission) {
                    self.trials_in_flight = self.trials_in_flight.saturating_sub(1);
                    self.trial_successes += 1;
                    if self.trial_successes >= config.permitted_calls_in_half_open {
                        self.transition_to(CircuitState::Closed, config);
                    }
                }
            }
            // Late result from a call admitted before the breaker tripped.
            CircuitState::Open => {}
        }
    }

    pub(crate) fn record_failure(
        &mut self,
        admission: Admission,
        config: &CircuitBreakerConfig,
        duration: Duration,
    ) {
        self.pending.push(CircuitBreakerEvent::FailureRecorded {
            policy: config.name.clone(),
            state: self.state,
            duration,
        });

        #[cfg(feature = "metrics")]
        counter!("circuitbreaker_calls_total", "policy" => config.name.to_string(), "outcome" => "failure").increment(1);

        match self.state {
            CircuitState::Closed => {
                self.push(true, config);
                self.evaluate(config);
            }
            CircuitState::HalfOpen => {
                if self.is_current_trial(admission) {
                    self.transition_to(CircuitState::Open, config);
                }
            }
            CircuitState::Open => {}
        }
    }

    /// Returns a half-open trial slot whose call was dropped before completing.
    pub(crate) fn abandon(&mut self, admission: Admission) {
        if self.state == CircuitState::HalfOpen && self.is_current_trial(admission) {
            self.trials_in_flight = self.trials_in_flight.saturating_sub(1);
        }
    }

    pub(crate) fn force(&mut self, state: CircuitState, config: &CircuitBreakerConfig) {
        self.transition_to(state, config);
    }

    pub(crate) fn reset(&mut self, config: &CircuitBreakerConfig) {
        self.transition_to(CircuitState::Closed, config);
        self.window.clear();
    }

    fn is_current_trial(&self, admission: Admission) -> bool {
        admission.trial_generation == Some(self.generation)
    }

    fn push(&mut self, failure: bool, config: &CircuitBreakerConfig) {
        self.window.push_back(failure);
        while self.window.len() > config.sliding_window_size {
            self.window.pop_front();
        }
    }

    fn counts(&self) -> (usize, usize) {
        let failures = self.window.iter().filter(|failed| **failed).count();
        (self.window.len(), failures)
    }

    fn evaluate(&mut self, config: &CircuitBreakerConfig) {
        let (total, failures) = self.counts();
        if total < config.minimum_number_of_calls {
            return;
        }
        if rate(failures, total) >= config.failure_rate_threshold {
            self.transition_to(CircuitState::Open, config);
        }
    }

    fn transition_to(&mut self, state: CircuitState, config: &CircuitBreakerConfig) {
        if self.state == state {
            return;
        }
        let from_state = self.state;

        self.pending.push(CircuitBreakerEvent::StateTransition {
            policy: config.name.clone(),
            from_state,
            to_state: state,
        });

        #[cfg(feature = "tracing")]
        tracing::info!(
            policy = %config.name,
            from = from_state.as_str(),
            to = state.as_str(),
            "circuit state transition"
        );

        #[cfg(feature = "metrics")]
        {
            counter!(
                "circuitbreaker_transitions_total",
                "policy" => config.name.to_string(),
                "from" => from_state.as_str(),
                "to" => state.as_str()
            )
            .increment(1);
            gauge!("circuitbreaker_state", "policy" => config.name.to_string()).set(state as u8 as f64);
        }

        self.state = state;
        self.state_atomic.store(state as u8, Ordering::Release);
        self.last_state_change = Instant::now();
        self.generation = self.generation.wrapping_add(1);
        self.trials_in_flight = 0;
        self.trial_successes = 0;
        // A fresh closed period starts from an empty window.
        if state != CircuitState::Open {
            self.window.clear();
        }
    }
}

fn rate(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}
