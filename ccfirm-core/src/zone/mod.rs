//! Zone content model
//!
//! The screen is partitioned into named rectangles. Each zone has a refresh
//! tier and remembers the fingerprint of the last payload drawn into it.

pub mod registry;

pub use registry::{
    LayoutError, Tier, Zone, ZoneRegistry, CANONICAL_ARENA_LEN, CANONICAL_ZONES, MAX_ZONES,
    SCREEN_HEIGHT, SCREEN_WIDTH,
};
