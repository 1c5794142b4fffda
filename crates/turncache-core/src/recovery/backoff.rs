//! Delay schedule between retries of a storage call

use super::retry::RetryConfig;
use std::time::Duration;

/// Share of a delay added on top of it as jitter, at most
const JITTER_RATIO: f64 = 0.2;

/// Exponential delay schedule derived from a [`RetryConfig`].
///
/// Delay for retry `n` (0-indexed) is `initial_delay * multiplier^n`, capped
/// at `max_delay`, plus up to 20% jitter when enabled. Jitter never pushes
/// the delay past the cap by more than that 20%.
#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    multiplier: f64,
    jitter: bool,
}

impl Backoff {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            initial: config.initial_delay,
            max: config.max_delay.max(config.initial_delay),
            multiplier: config.backoff_multiplier.max(1.0),
            jitter: config.jitter,
        }
    }

    pub fn delay(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let scaled = self.initial.as_secs_f64() * self.multiplier.powi(exponent);
        let capped = scaled.min(self.max.as_secs_f64());

        let jittered = if self.jitter {
            capped * (1.0 + JITTER_RATIO * unit_random())
        } else {
            capped
        };
        Duration::from_secs_f64(jittered)
    }
}

/// Uniform value in `[0, 1]`, taken from the random bits of a v4 uuid
fn unit_random() -> f64 {
    let bits = (uuid::Uuid::new_v4().as_u128() >> 64) as u32;
    f64::from(bits) / f64::from(u32::MAX)
}
