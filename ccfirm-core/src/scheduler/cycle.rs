//! Refresh cycle bookkeeping
//!
//! Owned by the orchestrator and mutated only from the steady-state loop.

use crate::zone::Tier;

/// A set of tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TierSet(u8);

impl TierSet {
    /// No tiers
    pub const EMPTY: TierSet = TierSet(0);

    /// Every tier
    pub const ALL: TierSet = TierSet(0b111);

    /// Add a tier
    pub fn insert(&mut self, tier: Tier) {
        self.0 |= 1 << tier.index();
    }

    /// Whether a tier is in the set
    pub fn contains(self, tier: Tier) -> bool {
        self.0 & (1 << tier.index()) != 0
    }

    /// Whether the set is empty
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Refresh and error history
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RefreshCycleState {
    /// When the last full refresh completed (None: never drawn)
    pub last_full_refresh_at: Option<u64>,
    /// Partial refreshes since that full refresh
    pub partial_refresh_count_since_full: u16,
    /// Failed cycles since the last successful render
    pub consecutive_error_count: u32,
    /// When the last failure happened
    pub last_error_at: Option<u64>,
    /// When each tier was last evaluated
    pub tier_checked_at: [Option<u64>; 3],
    /// Next plan must be full (screen content is in doubt)
    pub force_full: bool,
}

impl RefreshCycleState {
    /// Fresh state: nothing drawn, no errors
    pub const fn new() -> Self {
        Self {
            last_full_refresh_at: None,
            partial_refresh_count_since_full: 0,
            consecutive_error_count: 0,
            last_error_at: None,
            tier_checked_at: [None; 3],
            force_full: false,
        }
    }

    /// Whether any draw has completed since boot
    pub fn ever_drawn(&self) -> bool {
        self.last_full_refresh_at.is_some()
    }

    /// Record a completed full refresh
    pub fn record_full_refresh(&mut self, now: u64) {
        self.last_full_refresh_at = Some(now);
        self.partial_refresh_count_since_full = 0;
        self.force_full = false;
    }

    /// Record `count` completed partial refreshes
    pub fn record_partial_refreshes(&mut self, count: u16) {
        self.partial_refresh_count_since_full =
            self.partial_refresh_count_since_full.saturating_add(count);
    }

    /// Mark tiers as evaluated at `now`
    pub fn mark_checked(&mut self, tiers: TierSet, now: u64) {
        for tier in Tier::ALL {
            if tiers.contains(tier) {
                self.tier_checked_at[tier.index()] = Some(now);
            }
        }
    }

    /// Record a failed connect or cycle
    pub fn record_failure(&mut self, now: u64) {
        self.consecutive_error_count = self.consecutive_error_count.saturating_add(1);
        self.last_error_at = Some(now);
    }

    /// Record a successful render
    pub fn record_success(&mut self) {
        self.consecutive_error_count = 0;
    }
}
