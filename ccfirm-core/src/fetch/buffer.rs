//! Zone buffer arena
//!
//! A single caller-provided byte arena is carved into one slot per zone at
//! boot. Slot capacity is the size of a full-zone bitmap, so a valid payload
//! always fits and anything larger is rejected without touching the
//! neighbouring slot.

use heapless::Vec;

use crate::zone::{ZoneRegistry, MAX_ZONES};

/// Errors from arena allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BufferError {
    /// The arena cannot hold every zone of the layout
    Exhausted { required: usize, available: usize },
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    offset: usize,
    capacity: usize,
    len: usize,
    ready: bool,
}

/// Per-zone payload buffers carved from one arena
pub struct ZoneBuffers<'a> {
    arena: &'a mut [u8],
    slots: Vec<Slot, MAX_ZONES>,
}

impl<'a> ZoneBuffers<'a> {
    /// Wrap an arena; no slots exist until [`ZoneBuffers::allocate`]
    pub fn new(arena: &'a mut [u8]) -> Self {
        Self {
            arena,
            slots: Vec::new(),
        }
    }

    /// Carve one slot per zone, in registry order
    ///
    /// Re-allocating discards every buffered payload.
    pub fn allocate(&mut self, registry: &ZoneRegistry) -> Result<(), BufferError> {
        let required = registry.buffer_len();
        if required > self.arena.len() {
            self.slots.clear();
            return Err(BufferError::Exhausted {
                required,
                available: self.arena.len(),
            });
        }

        self.slots.clear();
        let mut offset = 0;
        for zone in registry.all_zones() {
            let capacity = zone.capacity();
            // Registry never holds more than MAX_ZONES zones
            let _ = self.slots.push(Slot {
                offset,
                capacity,
                len: 0,
                ready: false,
            });
            offset += capacity;
        }
        debug!(
            "Zone buffers: {} of {} arena bytes in {} slots",
            required,
            self.arena.len(),
            self.slots.len()
        );
        Ok(())
    }

    /// Whether slots have been carved
    pub fn is_allocated(&self) -> bool {
        !self.slots.is_empty()
    }

    /// Capacity of a zone's slot
    pub fn capacity(&self, index: usize) -> Option<usize> {
        self.slots.get(index).map(|slot| slot.capacity)
    }

    /// Hand out a slot for writing
    ///
    /// The slot is emptied first, so a failed fetch never leaves a stale or
    /// half-written payload marked as displayable.
    pub fn writable(&mut self, index: usize) -> Option<&mut [u8]> {
        let slot = self.slots.get_mut(index)?;
        slot.len = 0;
        slot.ready = false;
        self.arena.get_mut(slot.offset..slot.offset + slot.capacity)
    }

    /// Mark the first `len` bytes of a slot as a validated payload
    pub fn commit(&mut self, index: usize, len: usize) {
        if let Some(slot) = self.slots.get_mut(index) {
            if len <= slot.capacity {
                slot.len = len;
                slot.ready = true;
            }
        }
    }

    /// Validated payload of a zone, if one is buffered
    pub fn payload(&self, index: usize) -> Option<&[u8]> {
        let slot = self.slots.get(index)?;
        if !slot.ready {
            return None;
        }
        self.arena.get(slot.offset..slot.offset + slot.len)
    }
}
