use std::time::Duration;

/// Computes the delay before a retry.
pub trait IntervalFunction: Send + Sync {
    /// Delay before retry number `retry` (0 for the first retry).
    fn next_interval(&self, retry: usize) -> Duration;
}

/// Same delay before every retry.
#[derive(Debug, Clone)]
pub struct FixedInterval {
    duration: Duration,
}

impl FixedInterval {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

impl IntervalFunction for FixedInterval {
    fn next_interval(&self, _retry: usize) -> Duration {
        self.duration
    }
}

/// Delay growing by `multiplier` after each retry, optionally capped.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial_interval: Duration,
    multiplier: f64,
    max_interval: Option<Duration>,
}

impl ExponentialBackoff {
    /// Exponential backoff with a multiplier of 2.0.
    pub fn new(initial_interval: Duration) -> Self {
        Self {
            initial_interval,
            multiplier: 2.0,
            max_interval: None,
        }
    }

    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier.max(1.0);
        self
    }

    pub fn max_interval(mut self, max_interval: Duration) -> Self {
        self.max_interval = Some(max_interval);
        self
    }

    fn interval(&self, retry: usize) -> Duration {
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let scaled = self.initial_interval.as_secs_f64() * self.multiplier.powi(exponent);
        let capped = match self.max_interval {
            Some(max) => scaled.min(max.as_secs_f64()),
            None => scaled,
        };
        Duration::try_from_secs_f64(capped).unwrap_or(Duration::MAX)
    }
}

impl IntervalFunction for ExponentialBackoff {
    fn next_interval(&self, retry: usize) -> Duration {
        self.interval(retry)
    }
}

/// Exponential backoff with each delay jittered by `randomization_factor`.
///
/// A factor of 0.5 spreads each delay between 50% and 150% of the exponential value,
/// so fan-out calls that failed together do not retry in lockstep.
#[derive(Debug, Clone)]
pub struct ExponentialRandomBackoff {
    base: ExponentialBackoff,
    randomization_factor: f64,
}

impl ExponentialRandomBackoff {
    pub fn new(initial_interval: Duration, randomization_factor: f64) -> Self {
        Self {
            base: ExponentialBackoff::new(initial_interval),
            randomization_factor: randomization_factor.clamp(0.0, 1.0),
        }
    }

    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.base = self.base.multiplier(multiplier);
        self
    }

    pub fn max_interval(mut self, max_interval: Duration) -> Self {
        self.base = self.base.max_interval(max_interval);
        self
    }
}

impl IntervalFunction for ExponentialRandomBackoff {
    fn next_interval(&self, retry: usize) -> Duration {
        use rand::Rng;

        let interval = self.base.interval(retry).as_secs_f64();
        let delta = interval * self.randomization_factor;
        if delta <= 0.0 {
            return Duration::from_secs_f64(interval);
        }
        let jittered = rand::rng().random_range((interval - delta)..=(interval + delta));
        Duration::try_from_secs_f64(jittered.max(0.0)).unwrap_or(Duration::MAX)
    }
}

/// Delay computed by a closure.
pub struct FnInterval<F> {
    f: F,
}

impl<F> FnInterval<F>
where
    F: Fn(usize) -> Duration + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> IntervalFunction for FnInterval<F>
where
    F: Fn(usize) -> Duration + Send + Sync,
{
    fn next_interval(&self, retry: usize) -> Duration {
        (self.f)(retry)
    }
}
