//! Refresh scheduler
//!
//! Decides, once per wake, which zones to redraw and whether the panel needs
//! a ghost-clearing full refresh.

pub mod cycle;
pub mod planner;

pub use cycle::{RefreshCycleState, TierSet};
pub use planner::{due_tiers, needs_full, next_due_in_ms, plan_cycle, RefreshKind, RefreshPlan};
