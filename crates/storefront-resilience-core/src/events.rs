//! Event hooks for the resilience patterns.
//!
//! Each pattern publishes a typed event enum (breaker transitions, retries, rejections,
//! timeouts) tagged with the [`PolicyName`] that produced it. Builders register closures
//! through `on_*` methods; the pipeline's logging and transition hooks are built on them.

use crate::PolicyName;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// An event published by one policy's pattern instance.
pub trait ResilienceEvent: Send + Sync + fmt::Debug {
    /// Stable snake_case name, e.g. `"state_transition"`.
    fn kind(&self) -> &'static str;

    fn policy(&self) -> &PolicyName;
}

type Hook<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Hooks registered for one event type, run in registration order.
pub struct EventListeners<E> {
    hooks: Vec<Hook<E>>,
}

impl<E: ResilienceEvent> EventListeners<E> {
    pub fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    pub fn add<F>(&mut self, hook: F)
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.hooks.push(Arc::new(hook));
    }

    /// Runs every hook. A panicking hook is skipped; the call that raised the event and
    /// the remaining hooks are unaffected.
    pub fn emit(&self, event: &E) {
        for hook in &self.hooks {
            if catch_unwind(AssertUnwindSafe(|| hook(event))).is_err() {
                #[cfg(feature = "tracing")]
                tracing::error!(
                    policy = %event.policy(),
                    event = event.kind(),
                    "event hook panicked"
                );
            }
        }
    }
}

impl<E: ResilienceEvent> Default for EventListeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for EventListeners<E> {
    fn clone(&self) -> Self {
        Self {
            hooks: self.hooks.clone(),
        }
    }
}

impl<E> fmt::Debug for EventListeners<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListeners")
            .field("hooks", &self.hooks.len())
            .finish()
    }
}
