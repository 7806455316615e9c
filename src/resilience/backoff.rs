//! Exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;

use crate::config::RetryConfig;

/// Share of the delay that jitter may add on top.
const JITTER_FACTOR: f64 = 0.25;

/// Delay before the `retry`-th retry (0 for the first), without jitter.
pub fn exponential_delay(retry: u32, config: &RetryConfig) -> Duration {
    let max_ms = config.max_delay_ms as f64;
    let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
    let delay_ms = config.initial_delay_ms as f64 * config.backoff_multiplier.powi(exponent);

    if !delay_ms.is_finite() || delay_ms >= max_ms {
        return config.max_delay();
    }
    Duration::from_millis(delay_ms.max(0.0) as u64)
}

/// Delay before the `retry`-th retry, with jitter when enabled.
pub fn calculate_backoff(retry: u32, config: &RetryConfig) -> Duration {
    let delay = exponential_delay(retry, config);
    if !config.use_jitter {
        return delay;
    }

    let jitter_range = (delay.as_millis() as f64 * JITTER_FACTOR) as u64;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..=jitter_range)
    } else {
        0
    };

    (delay + Duration::from_millis(jitter)).min(config.max_delay())
}

/// Merge a server `Retry-After` hint into a computed delay.
pub fn with_retry_after(delay: Duration, retry_after: Option<Duration>, config: &RetryConfig) -> Duration {
    match retry_after {
        Some(hint) => delay.max(hint).min(config.max_delay()),
        None => delay,
    }
}
