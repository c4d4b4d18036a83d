//! Exponential backoff

use serde::{Deserialize, Serialize};

/// Retry delay policy
///
/// `delay = min(max_ms, base_ms * 2^min(count - 1, cap_exponent))`, where
/// `count` is the number of consecutive failures including the latest one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BackoffPolicy {
    /// Delay after the first failure
    pub base_ms: u32,
    /// Upper bound on any delay
    pub max_ms: u32,
    /// Largest doubling exponent
    pub cap_exponent: u8,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl BackoffPolicy {
    /// 5 s base, 60 s ceiling, at most 2^4 growth
    pub const DEFAULT: BackoffPolicy = BackoffPolicy {
        base_ms: 5_000,
        max_ms: 60_000,
        cap_exponent: 4,
    };

    /// Largest accepted `cap_exponent`
    pub const MAX_CAP_EXPONENT: u8 = 16;

    /// Delay before the next attempt after `consecutive_failures` failures
    ///
    /// Zero failures waits `base_ms` like the first one.
    pub fn delay_ms(&self, consecutive_failures: u32) -> u32 {
        let cap = self.cap_exponent.min(Self::MAX_CAP_EXPONENT) as u32;
        let exponent = consecutive_failures.saturating_sub(1).min(cap);
        self.base_ms
            .saturating_mul(1u32 << exponent)
            .min(self.max_ms)
    }
}
