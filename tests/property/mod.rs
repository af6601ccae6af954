mod breaker;
mod retry;

use tokio::runtime::{Builder, Runtime};

/// A single-threaded runtime with paused time, one per generated case.
pub(crate) fn paused_runtime() -> Runtime {
    Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap()
}
