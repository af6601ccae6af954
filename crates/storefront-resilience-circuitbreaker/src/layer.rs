use crate::circuit::{Circuit, CircuitMetrics, CircuitState};
use crate::config::{CircuitBreakerConfig, CircuitBreakerConfigBuilder};
use crate::CircuitBreaker;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use storefront_resilience_core::PolicyName;
use tower::Layer;

/// State shared by every service a [`CircuitBreakerLayer`] produces.
pub(crate) struct Shared {
    pub(crate) config: CircuitBreakerConfig,
    circuit: Mutex<Circuit>,
    state: Arc<AtomicU8>,
}

impl Shared {
    pub(crate) fn lock(&self) -> MutexGuard<'_, Circuit> {
        self.circuit.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` on the locked circuit, then publishes the events it raised.
    ///
    /// Hooks run after the guard is dropped, so a hook may read the breaker again.
    pub(crate) fn update<T>(&self, f: impl FnOnce(&mut Circuit, &CircuitBreakerConfig) -> T) -> T {
        let (result, events) = {
            let mut circuit = self.lock();
            let result = f(&mut circuit, &self.config);
            (result, circuit.take_events())
        };
        for event in &events {
            self.config.event_listeners.emit(event);
        }
        result
    }
}

/// A Tower layer applying one policy's circuit breaker.
///
/// The layer owns the circuit: wrapping several services (or the same operation many
/// times) with one layer makes them all count against, and be gated by, the same
/// sliding window. This is what makes the breaker per-policy rather than per-call.
///
/// ```rust
/// use storefront_resilience_circuitbreaker::{CircuitBreakerLayer, CircuitState};
/// use tower::{Layer, service_fn};
/// use storefront_resilience_core::ResilienceError;
///
/// let layer = CircuitBreakerLayer::builder()
///     .name("merchandise")
///     .failure_rate_threshold(0.5)
///     .sliding_window_size(20)
///     .build();
///
/// let _svc = layer.layer(service_fn(|sku: u64| async move {
///     Ok::<_, ResilienceError>(sku)
/// }));
/// assert_eq!(layer.state(), CircuitState::Closed);
/// ```
#[derive(Clone)]
pub struct CircuitBreakerLayer {
    pub(crate) shared: Arc<Shared>,
}

impl CircuitBreakerLayer {
    pub(crate) fn new(config: CircuitBreakerConfig) -> Self {
        let state = Arc::new(AtomicU8::new(CircuitState::Closed as u8));
        Self {
            shared: Arc::new(Shared {
                config,
                circuit: Mutex::new(Circuit::new(Arc::clone(&state))),
                state,
            }),
        }
    }

    /// Creates a new configuration builder.
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    /// The policy this breaker belongs to.
    pub fn name(&self) -> &PolicyName {
        &self.shared.config.name
    }

    /// Current state, read lock-free.
    ///
    /// An open circuit whose cool-down has elapsed still reports `Open` until the next
    /// call is admitted as a trial.
    pub fn state(&self) -> CircuitState {
        CircuitState::from_u8(self.shared.state.load(Ordering::Acquire))
    }

    /// Returns true if the circuit is open.
    pub fn is_open(&self) -> bool {
        self.state() == CircuitState::Open
    }

    /// Snapshot of the sliding window.
    pub fn metrics(&self) -> CircuitMetrics {
        self.shared.lock().metrics()
    }

    /// Forces the circuit open.
    pub fn force_open(&self) {
        self.shared
            .update(|circuit, config| circuit.force(CircuitState::Open, config));
    }

    /// Forces the circuit closed.
    pub fn force_closed(&self) {
        self.shared
            .update(|circuit, config| circuit.force(CircuitState::Closed, config));
    }

    /// Closes the circuit and clears the window.
    pub fn reset(&self) {
        self.shared.update(|circuit, config| circuit.reset(config));
    }
}

impl<S> Layer<S> for CircuitBreakerLayer {
    type Service = CircuitBreaker<S>;

    fn layer(&self, service: S) -> Self::Service {
        CircuitBreaker::new(service, Arc::clone(&self.shared))
    }
}

impl std::fmt::Debug for CircuitBreakerLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreakerLayer")
            .field("policy", &self.shared.config.name)
            .field("state", &self.state())
            .finish()
    }
}
