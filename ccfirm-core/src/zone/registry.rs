//! Zone registry
//!
//! Canonical layout (800 × 480 panel):
//! ```text
//! ┌────────────────────────────────────────┐ y=0
//! │ header   (tier 1)                      │
//! ├────────────────────────────────────────┤ y=94  divider (tier 3)
//! │ summary  (tier 1)                      │ y=96
//! ├────────────────────────────────────────┤
//! │                                        │ y=132
//! │ legs     (tier 2)                      │
//! │                                        │
//! ├────────────────────────────────────────┤ y=448
//! │ footer   (tier 3)                      │
//! └────────────────────────────────────────┘ y=480
//! ```

use heapless::Vec;

use ccfirm_protocol::api::{validate_segment, MAX_ZONE_ID_LEN};
use ccfirm_protocol::bitmap::encoded_len;
use ccfirm_protocol::Fingerprint;

use crate::traits::Region;

/// Panel width of the reference board
pub const SCREEN_WIDTH: u16 = 800;

/// Panel height of the reference board
pub const SCREEN_HEIGHT: u16 = 480;

/// Maximum zones in a layout
pub const MAX_ZONES: usize = 8;

/// Refresh cadence class
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Tier {
    /// Time-critical content (departures, clock)
    Critical = 1,
    /// Content that changes a few times an hour
    Content = 2,
    /// Near-static chrome
    Static = 3,
}

impl Tier {
    /// All tiers in priority order
    pub const ALL: [Tier; 3] = [Tier::Critical, Tier::Content, Tier::Static];

    /// 0-based index for per-tier tables
    pub const fn index(self) -> usize {
        self as usize - 1
    }
}

/// A named screen rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Zone {
    id: &'static str,
    region: Region,
    tier: Tier,
}

impl Zone {
    /// Create a zone
    pub const fn new(id: &'static str, x: u16, y: u16, width: u16, height: u16, tier: Tier) -> Self {
        Self {
            id,
            region: Region::new(x, y, width, height),
            tier,
        }
    }

    /// Stable identifier, also the URL path segment
    pub fn id(&self) -> &'static str {
        self.id
    }

    /// Screen rectangle
    pub fn region(&self) -> Region {
        self.region
    }

    /// Refresh tier
    pub fn tier(&self) -> Tier {
        self.tier
    }

    /// Payload buffer capacity: a full-size 1-bit bitmap of this zone
    pub const fn capacity(&self) -> usize {
        encoded_len(self.region.width, self.region.height)
    }
}

/// The reference dashboard layout, already in registry order
pub const CANONICAL_ZONES: [Zone; 5] = [
    Zone::new("header", 0, 0, 800, 94, Tier::Critical),
    Zone::new("divider", 0, 94, 800, 2, Tier::Static),
    Zone::new("summary", 0, 96, 800, 28, Tier::Critical),
    Zone::new("legs", 0, 132, 800, 316, Tier::Content),
    Zone::new("footer", 0, 448, 800, 32, Tier::Static),
];

/// Errors from layout validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LayoutError {
    /// No zones at all
    Empty,
    /// More than [`MAX_ZONES`] zones
    TooManyZones,
    /// Id is empty, too long, or not a valid path segment
    InvalidId(u8),
    /// Two zones share an id
    DuplicateId(u8),
    /// Zone has zero width or height
    EmptyZone(u8),
    /// Zone extends past the screen edge
    OutOfBounds(u8),
    /// Two zones share pixels
    Overlap(u8, u8),
}

#[derive(Debug, Clone)]
struct ZoneSlot {
    zone: Zone,
    last_applied: Option<Fingerprint>,
}

/// Ordered, validated zone table
///
/// Zones are kept sorted top-to-bottom, then left-to-right. Shapes never
/// change after construction; only the per-zone applied fingerprint does.
#[derive(Debug, Clone)]
pub struct ZoneRegistry {
    screen: Region,
    slots: Vec<ZoneSlot, MAX_ZONES>,
}

impl Default for ZoneRegistry {
    fn default() -> Self {
        Self::canonical()
    }
}

impl ZoneRegistry {
    /// The reference layout on the reference panel
    pub fn canonical() -> Self {
        let mut slots = Vec::new();
        for zone in CANONICAL_ZONES {
            // CANONICAL_ZONES.len() < MAX_ZONES
            let _ = slots.push(ZoneSlot {
                zone,
                last_applied: None,
            });
        }
        Self {
            screen: Region::new(0, 0, SCREEN_WIDTH, SCREEN_HEIGHT),
            slots,
        }
    }

    /// Validate and sort a custom layout
    ///
    /// Error indices refer to positions in `zones` as given.
    pub fn new(screen_width: u16, screen_height: u16, zones: &[Zone]) -> Result<Self, LayoutError> {
        if zones.is_empty() {
            return Err(LayoutError::Empty);
        }
        if zones.len() > MAX_ZONES {
            return Err(LayoutError::TooManyZones);
        }
        let screen = Region::new(0, 0, screen_width, screen_height);

        for (i, zone) in zones.iter().enumerate() {
            let index = i as u8;
            if zone.id.len() > MAX_ZONE_ID_LEN || validate_segment(zone.id).is_err() {
                return Err(LayoutError::InvalidId(index));
            }
            if zone.region.is_empty() {
                return Err(LayoutError::EmptyZone(index));
            }
            if !screen.contains(&zone.region) {
                return Err(LayoutError::OutOfBounds(index));
            }
            for (j, other) in zones[..i].iter().enumerate() {
                if other.id == zone.id {
                    return Err(LayoutError::DuplicateId(index));
                }
                if other.region.overlaps(&zone.region) {
                    return Err(LayoutError::Overlap(j as u8, index));
                }
            }
        }

        let mut slots: Vec<ZoneSlot, MAX_ZONES> = zones
            .iter()
            .map(|&zone| ZoneSlot {
                zone,
                last_applied: None,
            })
            .collect();
        slots.sort_unstable_by_key(|slot| (slot.zone.region.y, slot.zone.region.x));

        Ok(Self { screen, slots })
    }

    /// Whole-screen rectangle
    pub fn screen(&self) -> Region {
        self.screen
    }

    /// Number of zones
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the layout has no zones (never true for a constructed registry)
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Zone at a registry index
    pub fn get(&self, index: usize) -> Option<&Zone> {
        self.slots.get(index).map(|slot| &slot.zone)
    }

    /// All zones in registry order
    pub fn all_zones(&self) -> impl Iterator<Item = &Zone> + '_ {
        self.slots.iter().map(|slot| &slot.zone)
    }

    /// Zones of one tier in registry order
    pub fn zones_for_tier(&self, tier: Tier) -> impl Iterator<Item = &Zone> + '_ {
        self.all_zones().filter(move |zone| zone.tier == tier)
    }

    /// Registry index of a zone id
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.slots.iter().position(|slot| slot.zone.id == id)
    }

    /// Fingerprint of the payload last drawn into a zone
    pub fn last_applied(&self, index: usize) -> Option<Fingerprint> {
        self.slots.get(index).and_then(|slot| slot.last_applied)
    }

    /// Record a successful draw
    pub fn record_applied(&mut self, index: usize, fingerprint: Fingerprint) {
        if let Some(slot) = self.slots.get_mut(index) {
            slot.last_applied = Some(fingerprint);
        }
    }

    /// Forget every applied fingerprint (the screen content is unknown)
    pub fn clear_applied(&mut self) {
        for slot in self.slots.iter_mut() {
            slot.last_applied = None;
        }
    }

    /// Arena bytes needed to buffer every zone at once
    pub fn buffer_len(&self) -> usize {
        self.all_zones().map(Zone::capacity).sum()
    }
}

/// Arena bytes needed by the canonical layout
pub const CANONICAL_ARENA_LEN: usize = {
    let mut total = 0;
    let mut i = 0;
    while i < CANONICAL_ZONES.len() {
        total += CANONICAL_ZONES[i].capacity();
        i += 1;
    }
    total
};
