//! Exponential backoff for retrying transient request failures

use std::time::Duration;

use rand::Rng;

#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Growth factor per retry
    pub multiplier: f64,
    /// Retries after the first attempt
    pub max_retries: usize,
    /// Randomization of each delay (0.0 to 1.0)
    pub jitter_factor: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
            max_retries: 3,
            jitter_factor: 0.1,
        }
    }
}

impl BackoffConfig {
    pub fn with_max_retries(max_retries: usize) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Retries without waiting, for tests
    pub fn immediate(max_retries: usize) -> Self {
        Self {
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            multiplier: 1.0,
            max_retries,
            jitter_factor: 0.0,
        }
    }
}

pub struct ExponentialBackoff {
    config: BackoffConfig,
    current_attempt: usize,
    current_delay: Duration,
}

impl ExponentialBackoff {
    pub fn with_config(config: BackoffConfig) -> Self {
        Self {
            current_delay: config.initial_delay,
            current_attempt: 0,
            config,
        }
    }

    /// Delay before the next retry, or `None` once the budget is spent
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.current_attempt >= self.config.max_retries {
            return None;
        }

        let delay = self.delay_with_jitter();

        self.current_attempt += 1;
        self.current_delay = std::cmp::min(
            Duration::from_secs_f64(self.current_delay.as_secs_f64() * self.config.multiplier),
            self.config.max_delay,
        );

        Some(delay)
    }

    fn delay_with_jitter(&self) -> Duration {
        if self.config.jitter_factor == 0.0 {
            return self.current_delay;
        }

        let jitter = rand::thread_rng().gen_range(0.0..1.0) * self.config.jitter_factor;
        let multiplier = 1.0 + (jitter - self.config.jitter_factor / 2.0);

        Duration::from_secs_f64(self.current_delay.as_secs_f64() * multiplier)
    }

    pub fn attempt_number(&self) -> usize {
        self.current_attempt
    }
}
