//! Politeness policy
//!
//! Decides when a host may be fetched again after a fetch finished. The
//! frontier stores whatever instant the policy returns; it never computes
//! delays itself.

use rand::Rng;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::PolitenessConfig;

/// What happened on the last fetch of a host
#[derive(Debug, Clone, Copy)]
pub struct FetchObservation {
    /// When the fetch finished
    pub finished_at: Instant,

    /// How long the fetch took
    pub latency: Duration,

    pub success: bool,

    /// Consecutive failures including this fetch, 0 after a success
    pub retry_count: u32,
}

impl FetchObservation {
    pub fn success(finished_at: Instant, latency: Duration) -> Self {
        Self {
            finished_at,
            latency,
            success: true,
            retry_count: 0,
        }
    }

    pub fn failure(finished_at: Instant, latency: Duration, retry_count: u32) -> Self {
        Self {
            finished_at,
            latency,
            success: false,
            retry_count,
        }
    }
}

/// Computes the next permissible fetch time for a host
pub trait PolitenessPolicy: Send + Sync {
    fn next_fetch_at(&self, observation: &FetchObservation) -> Instant;

    /// Whether a path-query that failed `retry_count` times should be dropped
    fn should_give_up(&self, retry_count: u32) -> bool;
}

/// Latency-proportional delay on success, exponential backoff on failure
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    /// Lower bound for the delay after a success
    pub min_delay: Duration,

    /// Upper bound for the delay after a success
    pub max_delay: Duration,

    /// Success delay as a multiple of the observed latency
    pub latency_factor: f64,

    /// Delay after the first failure
    pub backoff_base: Duration,

    /// Growth per consecutive failure (default: 2.0)
    pub backoff_multiplier: f64,

    /// Caps exponential growth
    pub max_backoff: Duration,

    pub max_retries: u32,

    /// Fraction of the delay added as random jitter, 0 disables it
    pub jitter: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(30_000),
            latency_factor: 10.0,
            backoff_base: Duration::from_millis(5000),
            backoff_multiplier: 2.0,
            max_backoff: Duration::from_secs(600),
            max_retries: 3,
            jitter: 0.0,
        }
    }
}

impl From<&PolitenessConfig> for BackoffPolicy {
    fn from(config: &PolitenessConfig) -> Self {
        Self {
            min_delay: Duration::from_millis(config.min_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            latency_factor: config.latency_factor,
            backoff_base: Duration::from_millis(config.backoff_base_ms),
            backoff_multiplier: config.backoff_multiplier,
            max_backoff: Duration::from_millis(config.max_backoff_ms),
            max_retries: config.max_retries,
            jitter: config.jitter,
        }
    }
}

impl BackoffPolicy {
    /// Policy with a fixed delay after every fetch
    pub fn fixed(delay: Duration) -> Self {
        Self {
            min_delay: delay,
            max_delay: delay,
            backoff_base: delay,
            backoff_multiplier: 1.0,
            max_backoff: delay,
            ..Default::default()
        }
    }

    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    /// Delay after a successful fetch that took `latency`
    pub fn success_delay(&self, latency: Duration) -> Duration {
        let scaled = latency.mul_f64(self.latency_factor.max(0.0));
        scaled.clamp(self.min_delay, self.max_delay.max(self.min_delay))
    }

    /// Delay after the `retry_count`-th consecutive failure
    pub fn failure_delay(&self, retry_count: u32) -> Duration {
        if retry_count == 0 {
            return self.backoff_base.min(self.max_backoff);
        }

        let exponential = self.backoff_base.as_millis() as f64
            * self.backoff_multiplier.powi((retry_count - 1) as i32);
        let capped = exponential.min(self.max_backoff.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }

    fn jittered(&self, delay: Duration) -> Duration {
        if self.jitter <= 0.0 || delay.is_zero() {
            return delay;
        }
        let extra = rand::thread_rng().gen_range(0.0..self.jitter);
        delay + delay.mul_f64(extra)
    }
}

impl PolitenessPolicy for BackoffPolicy {
    fn next_fetch_at(&self, observation: &FetchObservation) -> Instant {
        let delay = if observation.success {
            self.success_delay(observation.latency)
        } else {
            self.failure_delay(observation.retry_count)
        };
        observation.finished_at + self.jittered(delay)
    }

    fn should_give_up(&self, retry_count: u32) -> bool {
        retry_count > self.max_retries
    }
}
