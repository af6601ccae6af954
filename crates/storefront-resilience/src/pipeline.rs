use crate::config::{BackoffKind, PolicyConfig};
use crate::PipelineError;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use storefront_resilience_bulkhead::BulkheadLayer;
use storefront_resilience_circuitbreaker::{CircuitBreakerLayer, CircuitMetrics, CircuitState};
use storefront_resilience_core::{PolicyName, ResilienceError};
use storefront_resilience_retry::{
    ExponentialBackoff, ExponentialRandomBackoff, FixedInterval, RetryLayer,
};
use storefront_resilience_timelimiter::TimeLimiterLayer;
use tower::util::{BoxCloneService, Oneshot};
use tower::{service_fn, ServiceBuilder, ServiceExt};

type TransitionHook = Arc<dyn Fn(&PolicyName, CircuitState, CircuitState) + Send + Sync>;
type RetryHook = Arc<dyn Fn(&PolicyName, usize) + Send + Sync>;
type TimeoutHook = Arc<dyn Fn(&PolicyName, Duration) + Send + Sync>;

/// Hooks the builder installs on every policy's layers.
#[derive(Default)]
struct Hooks {
    on_state_transition: Vec<TransitionHook>,
    on_retry: Vec<RetryHook>,
    on_timeout: Vec<TimeoutHook>,
}

/// Registry of named policies, built once at startup.
///
/// Each policy owns one limiter, one retry configuration, one circuit breaker and one
/// timeout. Every operation decorated under a policy name shares that policy's permits
/// and breaker window, regardless of which client or key it was made for.
///
/// ```rust
/// use storefront_resilience::{PolicyConfig, ResiliencePipeline};
/// use storefront_resilience_core::ResilienceError;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pipeline = ResiliencePipeline::builder()
///     .policy("price", PolicyConfig::default())
///     .build()?;
///
/// let lookup = pipeline.decorate("price", || async { Ok::<_, ResilienceError>(1999_u32) })?;
/// assert_eq!(lookup.call().await, Ok(1999));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ResiliencePipeline {
    policies: Arc<HashMap<PolicyName, PolicyHandle>>,
}

impl ResiliencePipeline {
    pub fn builder() -> ResiliencePipelineBuilder {
        ResiliencePipelineBuilder::default()
    }

    /// Builds a pipeline from a name → settings map.
    pub fn from_configs<I, N>(configs: I) -> Result<Self, PipelineError>
    where
        I: IntoIterator<Item = (N, PolicyConfig)>,
        N: Into<PolicyName>,
    {
        configs
            .into_iter()
            .fold(Self::builder(), |builder, (name, config)| {
                builder.policy(name, config)
            })
            .build()
    }

    /// Looks up a policy.
    pub fn policy(&self, name: &str) -> Result<PolicyHandle, PipelineError> {
        self.policies
            .get(name)
            .cloned()
            .ok_or_else(|| PipelineError::UnknownPolicy(PolicyName::new(name)))
    }

    /// Wraps `operation` with the named policy.
    pub fn decorate<T, F, Fut>(
        &self,
        policy: &str,
        operation: F,
    ) -> Result<Decorated<T>, PipelineError>
    where
        F: Fn() -> Fut + Clone + Send + 'static,
        Fut: Future<Output = Result<T, ResilienceError>> + Send + 'static,
        T: Send + 'static,
    {
        Ok(self.policy(policy)?.decorate(operation))
    }

    /// Current breaker state of a policy, or `None` for an unknown name.
    pub fn circuit_state(&self, policy: &str) -> Option<CircuitState> {
        self.policies.get(policy).map(PolicyHandle::circuit_state)
    }

    /// Registered policy names, sorted.
    pub fn policy_names(&self) -> Vec<PolicyName> {
        let mut names: Vec<_> = self.policies.keys().cloned().collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for ResiliencePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResiliencePipeline")
            .field("policies", &self.policy_names())
            .finish()
    }
}

/// Builder for [`ResiliencePipeline`].
#[derive(Default)]
pub struct ResiliencePipelineBuilder {
    policies: Vec<(PolicyName, PolicyConfig)>,
    hooks: Hooks,
}

impl ResiliencePipelineBuilder {
    /// Registers a policy. A later registration with the same name replaces the earlier one.
    pub fn policy(mut self, name: impl Into<PolicyName>, config: PolicyConfig) -> Self {
        let name = name.into();
        self.policies.retain(|(existing, _)| *existing != name);
        self.policies.push((name, config));
        self
    }

    /// Observes breaker transitions of every policy as `(policy, from, to)`.
    pub fn on_state_transition<F>(mut self, f: F) -> Self
    where
        F: Fn(&PolicyName, CircuitState, CircuitState) + Send + Sync + 'static,
    {
        self.hooks.on_state_transition.push(Arc::new(f));
        self
    }

    /// Observes every retry as `(policy, failed_attempt)`.
    pub fn on_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(&PolicyName, usize) + Send + Sync + 'static,
    {
        self.hooks.on_retry.push(Arc::new(f));
        self
    }

    /// Observes every abandoned attempt as `(policy, timeout)`.
    pub fn on_timeout<F>(mut self, f: F) -> Self
    where
        F: Fn(&PolicyName, Duration) + Send + Sync + 'static,
    {
        self.hooks.on_timeout.push(Arc::new(f));
        self
    }

    /// Validates every policy and builds its layers.
    pub fn build(self) -> Result<ResiliencePipeline, PipelineError> {
        let mut policies = HashMap::with_capacity(self.policies.len());
        for (name, config) in self.policies {
            config.validate(&name)?;
            let handle = PolicyHandle::new(name.clone(), config, &self.hooks);

            #[cfg(feature = "tracing")]
            tracing::debug!(policy = %name, "registered resilience policy");

            policies.insert(name, handle);
        }
        Ok(ResiliencePipeline {
            policies: Arc::new(policies),
        })
    }
}

/// One policy's layers. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct PolicyHandle {
    inner: Arc<PolicyLayers>,
}

struct PolicyLayers {
    name: PolicyName,
    config: PolicyConfig,
    bulkhead: BulkheadLayer,
    retry: RetryLayer<ResilienceError>,
    breaker: CircuitBreakerLayer,
    timeout: TimeLimiterLayer,
}

impl PolicyHandle {
    fn new(name: PolicyName, config: PolicyConfig, hooks: &Hooks) -> Self {
        let bulkhead = BulkheadLayer::builder()
            .name(name.clone())
            .max_concurrent_calls(config.max_concurrent_calls)
            .max_wait_duration(config.max_wait)
            .build();

        let mut retry = RetryLayer::builder()
            .name(name.clone())
            .max_attempts(config.max_attempts)
            .retry_on(ResilienceError::is_transient);
        retry = match config.backoff {
            BackoffKind::Fixed => retry.backoff(FixedInterval::new(config.retry_delay)),
            BackoffKind::Exponential if config.backoff_jitter > 0.0 => {
                let mut backoff =
                    ExponentialRandomBackoff::new(config.retry_delay, config.backoff_jitter)
                        .multiplier(config.backoff_multiplier);
                if let Some(max) = config.max_retry_delay {
                    backoff = backoff.max_interval(max);
                }
                retry.backoff(backoff)
            }
            BackoffKind::Exponential => {
                let mut backoff = ExponentialBackoff::new(config.retry_delay)
                    .multiplier(config.backoff_multiplier);
                if let Some(max) = config.max_retry_delay {
                    backoff = backoff.max_interval(max);
                }
                retry.backoff(backoff)
            }
        };
        for hook in &hooks.on_retry {
            let hook = Arc::clone(hook);
            let policy = name.clone();
            retry = retry.on_retry(move |attempt, _| hook(&policy, attempt));
        }

        let mut breaker = CircuitBreakerLayer::builder()
            .name(name.clone())
            .failure_rate_threshold(config.failure_rate_threshold)
            .sliding_window_size(config.sliding_window_size)
            .minimum_number_of_calls(config.minimum_number_of_calls)
            .wait_duration_in_open(config.wait_duration_in_open)
            .permitted_calls_in_half_open(config.permitted_calls_in_half_open);
        for hook in &hooks.on_state_transition {
            let hook = Arc::clone(hook);
            let policy = name.clone();
            breaker = breaker.on_state_transition(move |from, to| hook(&policy, from, to));
        }

        let mut timeout = TimeLimiterLayer::builder()
            .name(name.clone())
            .timeout_duration(config.timeout);
        for hook in &hooks.on_timeout {
            let hook = Arc::clone(hook);
            let policy = name.clone();
            timeout = timeout.on_timeout(move |after| hook(&policy, after));
        }

        Self {
            inner: Arc::new(PolicyLayers {
                name,
                config,
                bulkhead,
                retry: retry.build(),
                breaker: breaker.build(),
                timeout: timeout.build(),
            }),
        }
    }

    pub fn name(&self) -> &PolicyName {
        &self.inner.name
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.inner.config
    }

    /// Wraps `operation` as limiter → retry → circuit breaker → timeout → operation.
    ///
    /// `operation` is invoked once per attempt, so it must build a fresh future each time.
    pub fn decorate<T, F, Fut>(&self, operation: F) -> Decorated<T>
    where
        F: Fn() -> Fut + Clone + Send + 'static,
        Fut: Future<Output = Result<T, ResilienceError>> + Send + 'static,
        T: Send + 'static,
    {
        let layers = &self.inner;
        let service = ServiceBuilder::new()
            .layer(layers.bulkhead.clone())
            .layer(layers.retry.clone())
            .layer(layers.breaker.clone())
            .layer(layers.timeout.clone())
            .service(service_fn(move |()| operation()));

        Decorated {
            policy: layers.name.clone(),
            service: BoxCloneService::new(service),
        }
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.inner.breaker.state()
    }

    pub fn circuit_metrics(&self) -> CircuitMetrics {
        self.inner.breaker.metrics()
    }

    pub fn force_open(&self) {
        self.inner.breaker.force_open();
    }

    pub fn force_closed(&self) {
        self.inner.breaker.force_closed();
    }

    /// Closes the breaker and clears its window.
    pub fn reset(&self) {
        self.inner.breaker.reset();
    }

    /// Calls currently holding a limiter permit.
    pub fn in_flight(&self) -> usize {
        self.inner.bulkhead.in_flight()
    }
}

impl std::fmt::Debug for PolicyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyHandle")
            .field("name", &self.inner.name)
            .field("circuit_state", &self.circuit_state())
            .finish()
    }
}

/// An operation wrapped by a policy.
///
/// Calling it runs the full pipeline once; it can be called repeatedly and cloned freely.
pub struct Decorated<T> {
    policy: PolicyName,
    service: BoxCloneService<(), T, ResilienceError>,
}

impl<T> Decorated<T> {
    /// Runs the decorated operation.
    pub fn call(&self) -> Oneshot<BoxCloneService<(), T, ResilienceError>, ()> {
        self.service.clone().oneshot(())
    }

    pub fn policy(&self) -> &PolicyName {
        &self.policy
    }

    /// The underlying Tower service, for composition with other middleware.
    pub fn into_service(self) -> BoxCloneService<(), T, ResilienceError> {
        self.service
    }
}

impl<T> Clone for Decorated<T> {
    fn clone(&self) -> Self {
        Self {
            policy: self.policy.clone(),
            service: self.service.clone(),
        }
    }
}
