//! Cycle planner
//!
//! Pure functions of time, zone state and refresh history. A full plan
//! redraws every zone and clears ghosting; a partial plan redraws only zones
//! whose tier is due and whose content changed, most urgent tier first.

use heapless::Vec;

use crate::config::RefreshSettings;
use crate::fetch::ChangeSet;
use crate::scheduler::cycle::{RefreshCycleState, TierSet};
use crate::zone::{Tier, ZoneRegistry, MAX_ZONES};

/// Panel refresh waveform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RefreshKind {
    /// Fast per-zone refresh; accumulates ghosting
    Partial,
    /// Whole-panel refresh; clears ghosting
    Full,
}

/// Zones to draw this cycle, in application order
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RefreshPlan {
    pub kind: RefreshKind,
    /// Registry indices
    pub zones: Vec<usize, MAX_ZONES>,
    /// Tiers this plan covers; marked checked once it is rendered
    pub tiers: TierSet,
}

impl RefreshPlan {
    /// Whether there is nothing to draw
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

/// Whether the next plan must be a full refresh
pub fn needs_full(now: u64, cycle: &RefreshCycleState, settings: &RefreshSettings) -> bool {
    let Some(last_full) = cycle.last_full_refresh_at else {
        return true;
    };
    cycle.force_full
        || now.saturating_sub(last_full) >= settings.full_refresh_interval_ms as u64
        || cycle.partial_refresh_count_since_full >= settings.max_partial_before_full
}

fn tier_remaining_ms(
    now: u64,
    tier: Tier,
    cycle: &RefreshCycleState,
    settings: &RefreshSettings,
) -> u64 {
    match cycle.tier_checked_at[tier.index()] {
        None => 0,
        Some(checked) => {
            let interval = settings.tier_interval_ms(tier.index()) as u64;
            interval.saturating_sub(now.saturating_sub(checked))
        }
    }
}

/// Tiers whose interval has elapsed
pub fn due_tiers(now: u64, cycle: &RefreshCycleState, settings: &RefreshSettings) -> TierSet {
    let mut due = TierSet::EMPTY;
    for tier in Tier::ALL {
        if tier_remaining_ms(now, tier, cycle, settings) == 0 {
            due.insert(tier);
        }
    }
    due
}

/// Milliseconds until the next tier or full refresh falls due (0: now)
pub fn next_due_in_ms(now: u64, cycle: &RefreshCycleState, settings: &RefreshSettings) -> u64 {
    if needs_full(now, cycle, settings) {
        return 0;
    }
    let full_remaining = cycle.last_full_refresh_at.map_or(0, |last| {
        (settings.full_refresh_interval_ms as u64).saturating_sub(now.saturating_sub(last))
    });
    Tier::ALL
        .iter()
        .map(|&tier| tier_remaining_ms(now, tier, cycle, settings))
        .fold(full_remaining, u64::min)
}

/// Plan one refresh cycle
pub fn plan_cycle(
    now: u64,
    registry: &ZoneRegistry,
    cycle: &RefreshCycleState,
    changes: &ChangeSet,
    settings: &RefreshSettings,
) -> RefreshPlan {
    if needs_full(now, cycle, settings) {
        return RefreshPlan {
            kind: RefreshKind::Full,
            zones: (0..registry.len()).collect(),
            tiers: TierSet::ALL,
        };
    }

    let due = due_tiers(now, cycle, settings);
    let mut zones = Vec::new();
    for tier in Tier::ALL.into_iter().filter(|&tier| due.contains(tier)) {
        for index in 0..registry.len() {
            let in_tier = registry.get(index).is_some_and(|zone| zone.tier() == tier);
            if in_tier && changes.is_changed(index, registry.last_applied(index)) {
                // One entry per zone, never more than the registry holds
                let _ = zones.push(index);
            }
        }
    }
    RefreshPlan {
        kind: RefreshKind::Partial,
        zones,
        tiers: due,
    }
}
