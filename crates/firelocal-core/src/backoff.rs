//! Exponential back-off for retrying failed requests.
//!
//! The parameters are the well-known defaults of the Google HTTP client's
//! `ExponentialBackOff`: start at 500ms, grow by 1.5x per attempt with ±50%
//! jitter, cap each wait at one minute, and give up once 15 minutes have
//! passed since the first attempt.

use std::time::{Duration, Instant};

use rand::Rng;

/// Maximum number of retries per request, matching the HTTP client default.
pub const DEFAULT_MAX_RETRIES: u32 = 10;

#[derive(Debug, Clone)]
pub struct ExponentialBackOff {
    initial_interval: Duration,
    randomization_factor: f64,
    multiplier: f64,
    max_interval: Duration,
    max_elapsed_time: Duration,
    current_interval: Duration,
    started_at: Instant,
}

impl ExponentialBackOff {
    pub const DEFAULT_INITIAL_INTERVAL: Duration = Duration::from_millis(500);
    pub const DEFAULT_RANDOMIZATION_FACTOR: f64 = 0.5;
    pub const DEFAULT_MULTIPLIER: f64 = 1.5;
    pub const DEFAULT_MAX_INTERVAL: Duration = Duration::from_secs(60);
    pub const DEFAULT_MAX_ELAPSED_TIME: Duration = Duration::from_secs(15 * 60);

    pub fn new() -> Self {
        Self {
            initial_interval: Self::DEFAULT_INITIAL_INTERVAL,
            randomization_factor: Self::DEFAULT_RANDOMIZATION_FACTOR,
            multiplier: Self::DEFAULT_MULTIPLIER,
            max_interval: Self::DEFAULT_MAX_INTERVAL,
            max_elapsed_time: Self::DEFAULT_MAX_ELAPSED_TIME,
            current_interval: Self::DEFAULT_INITIAL_INTERVAL,
            started_at: Instant::now(),
        }
    }

    /// Sets the initial interval (also resets the current interval).
    pub fn with_initial_interval(mut self, interval: Duration) -> Self {
        self.initial_interval = interval;
        self.current_interval = interval;
        self
    }

    /// Sets the jitter applied around each interval, in `[0, 1)`.
    pub fn with_randomization_factor(mut self, factor: f64) -> Self {
        self.randomization_factor = factor.clamp(0.0, 1.0);
        self
    }

    pub fn with_max_elapsed_time(mut self, elapsed: Duration) -> Self {
        self.max_elapsed_time = elapsed;
        self
    }

    /// Start over from the initial interval and restart the elapsed clock.
    pub fn reset(&mut self) {
        self.current_interval = self.initial_interval;
        self.started_at = Instant::now();
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn current_interval(&self) -> Duration {
        self.current_interval
    }

    /// Delay before the next attempt, or `None` once the elapsed time budget
    /// is spent.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if self.elapsed() > self.max_elapsed_time {
            return None;
        }
        let delay = randomized_interval(
            self.randomization_factor,
            rand::thread_rng().gen::<f64>(),
            self.current_interval,
        );
        self.increment_current_interval();
        Some(delay)
    }

    fn increment_current_interval(&mut self) {
        let next = self.current_interval.as_secs_f64() * self.multiplier;
        self.current_interval = if next >= self.max_interval.as_secs_f64() {
            self.max_interval
        } else {
            Duration::from_secs_f64(next)
        };
    }
}

impl Default for ExponentialBackOff {
    fn default() -> Self {
        Self::new()
    }
}

/// Pick a delay uniformly from `[interval - delta, interval + delta]` where
/// `delta = factor * interval`. `random` is in `[0, 1)`.
fn randomized_interval(factor: f64, random: f64, interval: Duration) -> Duration {
    let interval = interval.as_secs_f64();
    let delta = factor * interval;
    let min = interval - delta;
    let max = interval + delta;
    Duration::from_secs_f64(min + random * (max - min))
}

/// How a request is retried after an I/O failure.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: ExponentialBackOff,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff: ExponentialBackOff) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    /// A fresh back-off sequence for one request.
    pub fn start(&self) -> ExponentialBackOff {
        let mut backoff = self.backoff.clone();
        backoff.reset();
        backoff
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, ExponentialBackOff::new())
    }
}
