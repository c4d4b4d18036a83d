//! E-paper panel trait
//!
//! The panel driver owns the framebuffer. The core only sets pixels and asks
//! for a refresh; it never sees controller commands or busy pins.

use ccfirm_protocol::Bitmap;

/// Rectangle in panel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Region {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl Region {
    /// Create a region
    pub const fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge
    pub const fn right(&self) -> u32 {
        self.x as u32 + self.width as u32
    }

    /// Exclusive bottom edge
    pub const fn bottom(&self) -> u32 {
        self.y as u32 + self.height as u32
    }

    /// Zero width or height
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether two regions share at least one pixel
    pub fn overlaps(&self, other: &Region) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && (self.x as u32) < other.right()
            && (other.x as u32) < self.right()
            && (self.y as u32) < other.bottom()
            && (other.y as u32) < self.bottom()
    }

    /// Whether `other` lies entirely inside this region
    pub fn contains(&self, other: &Region) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}

/// Two-colour e-paper panel
///
/// Calls may block for the duration of a refresh but must always return.
pub trait EpdPanel {
    /// Wake the controller and run its init handshake
    fn init(&mut self) -> impl core::future::Future<Output = ()>;

    /// Set one framebuffer pixel; out-of-range coordinates are ignored
    fn set_pixel(&mut self, x: u16, y: u16, dark: bool);

    /// Push the whole framebuffer with a full (ghost-clearing) waveform
    fn apply_full_refresh(&mut self) -> impl core::future::Future<Output = ()>;

    /// Push one region with the fast partial waveform
    fn apply_partial_refresh(&mut self, region: Region)
        -> impl core::future::Future<Output = ()>;
}

/// Helper trait for drawing into the framebuffer
pub trait EpdPanelExt: EpdPanel {
    /// Fill a region with one colour
    fn fill_region(&mut self, region: Region, dark: bool) {
        for y in region.y..region.y.saturating_add(region.height) {
            for x in region.x..region.x.saturating_add(region.width) {
                self.set_pixel(x, y, dark);
            }
        }
    }

    /// Draw a dark border `thickness` pixels wide inside a region
    fn draw_frame(&mut self, region: Region, thickness: u16) {
        for dy in 0..region.height {
            for dx in 0..region.width {
                let edge = dx < thickness
                    || dy < thickness
                    || dx >= region.width.saturating_sub(thickness)
                    || dy >= region.height.saturating_sub(thickness);
                if edge {
                    self.set_pixel(region.x + dx, region.y + dy, true);
                }
            }
        }
    }

    /// Copy a bitmap into a region, clipped to the region
    ///
    /// Region pixels the bitmap does not cover are drawn light.
    fn blit(&mut self, region: Region, bitmap: &Bitmap<'_>) {
        for dy in 0..region.height {
            for dx in 0..region.width {
                self.set_pixel(region.x + dx, region.y + dy, bitmap.is_dark(dx, dy));
            }
        }
    }
}

// Blanket implementation for all EpdPanel types
impl<T: EpdPanel> EpdPanelExt for T {}
