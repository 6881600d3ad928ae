//! Exponential backoff with jitter.

use std::time::Duration;
use rand::Rng;

/// Delay policy between retry attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub base_ms: u64,
    pub max_ms: u64,
}

impl Backoff {
    pub fn new(base_ms: u64, max_ms: u64) -> Self {
        Self { base_ms, max_ms }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay(&self, retry: u32) -> Duration {
        calculate_backoff(retry, self.base_ms, self.max_ms)
    }
}

/// `base * 2^(retry-1)`, capped at `max`, plus up to 10% jitter.
pub fn calculate_backoff(retry: u32, base_ms: u64, max_ms: u64) -> Duration {
    if retry == 0 || base_ms == 0 {
        return Duration::ZERO;
    }

    let factor = 2u64.saturating_pow(retry - 1);
    let capped_delay = base_ms.saturating_mul(factor).min(max_ms);

    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}
