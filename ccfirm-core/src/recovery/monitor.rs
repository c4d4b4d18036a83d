//! Link health monitor
//!
//! Counts consecutive network join failures. With a configured threshold the
//! monitor eventually gives up on the stored credentials so the user can
//! re-enter them; without one the device keeps retrying forever.

/// What to do after a failed join
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkVerdict {
    /// Back off and try again
    Retry,
    /// Discard credentials and return to provisioning
    ClearCredentials,
}

/// Consecutive join failure counter
#[derive(Debug, Clone, Default)]
pub struct LinkMonitor {
    consecutive_failures: u8,
}

impl LinkMonitor {
    /// Create a monitor with no recorded failures
    pub const fn new() -> Self {
        Self {
            consecutive_failures: 0,
        }
    }

    /// Record a successful join
    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
    }

    /// Record a failed join and decide what happens next
    ///
    /// Reaching `threshold` resets the counter along with the verdict.
    pub fn record_failure(&mut self, threshold: Option<u8>) -> LinkVerdict {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        match threshold {
            Some(limit) if limit > 0 && self.consecutive_failures >= limit => {
                self.consecutive_failures = 0;
                LinkVerdict::ClearCredentials
            }
            _ => LinkVerdict::Retry,
        }
    }

    /// Failures since the last successful join
    pub fn consecutive_failures(&self) -> u8 {
        self.consecutive_failures
    }
}
