use crate::events::CircuitBreakerEvent;
use crate::{CircuitBreakerLayer, CircuitState};
use std::time::Duration;
use storefront_resilience_core::{EventListeners, PolicyName};

/// Configuration for one policy's circuit breaker.
#[derive(Debug)]
pub struct CircuitBreakerConfig {
    pub(crate) name: PolicyName,
    pub(crate) failure_rate_threshold: f64,
    /// Count-based: the most recent `sliding_window_size` outcomes.
    pub(crate) sliding_window_size: usize,
    pub(crate) minimum_number_of_calls: usize,
    pub(crate) wait_duration_in_open: Duration,
    pub(crate) permitted_calls_in_half_open: usize,
    pub(crate) event_listeners: EventListeners<CircuitBreakerEvent>,
}

impl CircuitBreakerConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    /// The policy this breaker belongs to.
    pub fn name(&self) -> &PolicyName {
        &self.name
    }
}

/// Builder for [`CircuitBreakerConfig`].
pub struct CircuitBreakerConfigBuilder {
    name: PolicyName,
    failure_rate_threshold: f64,
    sliding_window_size: usize,
    minimum_number_of_calls: Option<usize>,
    wait_duration_in_open: Duration,
    permitted_calls_in_half_open: usize,
    event_listeners: EventListeners<CircuitBreakerEvent>,
}

impl CircuitBreakerConfigBuilder {
    /// Creates a builder with default values.
    pub fn new() -> Self {
        Self {
            name: PolicyName::new("<unnamed>"),
            failure_rate_threshold: 0.5,
            sliding_window_size: 100,
            minimum_number_of_calls: None,
            wait_duration_in_open: Duration::from_secs(30),
            permitted_calls_in_half_open: 1,
            event_listeners: EventListeners::new(),
        }
    }

    /// Names the policy this breaker protects.
    ///
    /// Default: `<unnamed>`
    pub fn name(mut self, name: impl Into<PolicyName>) -> Self {
        self.name = name.into();
        self
    }

    /// Failure rate (0.0–1.0) at or above which the circuit opens.
    ///
    /// Values outside the range are clamped. Default: 0.5
    pub fn failure_rate_threshold(mut self, rate: f64) -> Self {
        self.failure_rate_threshold = rate.clamp(0.0, 1.0);
        self
    }

    /// Number of most recent outcomes the failure rate is computed over.
    ///
    /// Default: 100
    pub fn sliding_window_size(mut self, size: usize) -> Self {
        self.sliding_window_size = size.max(1);
        self
    }

    /// Number of recorded calls required before the failure rate is evaluated.
    ///
    /// Capped at the window size, since the window never holds more outcomes than that.
    /// Default: the window size.
    pub fn minimum_number_of_calls(mut self, n: usize) -> Self {
        self.minimum_number_of_calls = Some(n);
        self
    }

    /// Cool-down the circuit stays open before admitting trial calls.
    ///
    /// Default: 30 seconds
    pub fn wait_duration_in_open(mut self, duration: Duration) -> Self {
        self.wait_duration_in_open = duration;
        self
    }

    /// Number of successful trial calls that close a half-open circuit.
    ///
    /// Default: 1
    pub fn permitted_calls_in_half_open(mut self, n: usize) -> Self {
        self.permitted_calls_in_half_open = n.max(1);
        self
    }

    /// Registers a callback invoked on every state transition with `(from, to)`.
    ///
    /// ```rust
    /// use storefront_resilience_circuitbreaker::{CircuitBreakerConfig, CircuitState};
    ///
    /// let layer = CircuitBreakerConfig::builder()
    ///     .name("price")
    ///     .on_state_transition(|from, to| {
    ///         if to == CircuitState::Open {
    ///             eprintln!("price breaker tripped (was {})", from);
    ///         }
    ///     })
    ///     .build();
    /// ```
    pub fn on_state_transition<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState, CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::StateTransition {
                    from_state,
                    to_state,
                    ..
                } = event
                {
                    f(*from_state, *to_state);
                }
            });
        self
    }

    /// Registers a callback invoked when a call is admitted, with the state it was
    /// admitted in.
    pub fn on_call_permitted<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::CallPermitted { state, .. } = event {
                    f(*state);
                }
            });
        self
    }

    /// Registers a callback invoked when a call is rejected without reaching the
    /// operation.
    pub fn on_call_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners
            .add(move |event: &CircuitBreakerEvent| {
                if matches!(event, CircuitBreakerEvent::CallRejected { .. }) {
                    f();
                }
            });
        self
    }

    /// Registers a callback invoked for each recorded success.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::SuccessRecorded { state, .. } = event {
                    f(*state);
                }
            });
        self
    }

    /// Registers a callback invoked for each recorded failure.
    pub fn on_failure<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::FailureRecorded { state, .. } = event {
                    f(*state);
                }
            });
        self
    }

    pub(crate) fn into_config(self) -> CircuitBreakerConfig {
        let minimum_number_of_calls = self
            .minimum_number_of_calls
            .unwrap_or(self.sliding_window_size)
            .clamp(1, self.sliding_window_size);

        CircuitBreakerConfig {
            name: self.name,
            failure_rate_threshold: self.failure_rate_threshold,
            sliding_window_size: self.sliding_window_size,
            minimum_number_of_calls,
            wait_duration_in_open: self.wait_duration_in_open,
            permitted_calls_in_half_open: self.permitted_calls_in_half_open,
            event_listeners: self.event_listeners,
        }
    }

    /// Builds the layer. Every service produced by the layer shares one circuit.
    pub fn build(self) -> CircuitBreakerLayer {
        CircuitBreakerLayer::new(self.into_config())
    }
}

impl Default for CircuitBreakerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
