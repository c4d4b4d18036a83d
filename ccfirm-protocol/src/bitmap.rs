//! 1-bit BMP zone payloads
//!
//! Payload format:
//! - FILE HEADER (14 bytes): `BM` tag, file size, pixel data offset
//! - DIB HEADER (40+ bytes): width, height (positive = bottom-up rows),
//!   planes, bits per pixel (must be 1), compression (must be 0)
//! - PALETTE (2 × 4 bytes, optional): decides which bit value is dark
//! - PIXEL ROWS: MSB-first, each row padded to a 4-byte stride
//!
//! Parsing only checks the header and that every pixel row lies inside the
//! payload; it never copies pixel data.

/// Length of the headers written by [`write_header`] (file + DIB + palette)
pub const BMP_HEADER_LEN: usize = 14 + 40 + 8;

/// Format tag at the start of every zone payload
pub const FORMAT_TAG: [u8; 2] = *b"BM";

const FILE_HEADER_LEN: usize = 14;
const MIN_DIB_LEN: usize = 40;

/// Errors from bitmap header validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BitmapError {
    /// Fewer bytes than the fixed headers
    TooShort,
    /// Payload does not start with `BM`
    BadTag,
    /// Not a 1 bit-per-pixel image
    UnsupportedDepth(u16),
    /// Compressed pixel data
    Compressed,
    /// Zero or out-of-range width/height
    BadDimensions,
    /// Pixel rows extend past the end of the payload
    Truncated,
    /// Output buffer too small for the header
    BufferTooSmall,
}

/// A validated, borrowed 1-bit bitmap
#[derive(Debug, Clone, Copy)]
pub struct Bitmap<'a> {
    data: &'a [u8],
    width: u16,
    height: u16,
    bottom_up: bool,
    stride: usize,
    pixels_at: usize,
    dark_bit: u8,
}

impl<'a> Bitmap<'a> {
    /// Validate a payload and borrow it as a bitmap
    pub fn parse(data: &'a [u8]) -> Result<Self, BitmapError> {
        if data.len() < FILE_HEADER_LEN + MIN_DIB_LEN {
            return Err(BitmapError::TooShort);
        }
        if data[..2] != FORMAT_TAG {
            return Err(BitmapError::BadTag);
        }

        let pixels_at = read_u32(data, 10) as usize;
        let dib_len = read_u32(data, 14) as usize;
        let width = read_i32(data, 18);
        let height = read_i32(data, 22);
        let bpp = read_u16(data, 28);
        let compression = read_u32(data, 30);

        if bpp != 1 {
            return Err(BitmapError::UnsupportedDepth(bpp));
        }
        if compression != 0 {
            return Err(BitmapError::Compressed);
        }
        if dib_len < MIN_DIB_LEN {
            return Err(BitmapError::TooShort);
        }
        // Bounded by the payload, so offsets below cannot overflow
        if dib_len > data.len() - FILE_HEADER_LEN {
            return Err(BitmapError::Truncated);
        }
        let palette_at = FILE_HEADER_LEN + dib_len;
        if width <= 0 || width > u16::MAX as i32 || height == 0 || height == i32::MIN {
            return Err(BitmapError::BadDimensions);
        }
        let abs_height = height.unsigned_abs();
        if abs_height > u16::MAX as u32 {
            return Err(BitmapError::BadDimensions);
        }

        let width = width as u16;
        let height_px = abs_height as u16;
        let stride = row_stride(width);
        let end = stride
            .checked_mul(height_px as usize)
            .and_then(|len| len.checked_add(pixels_at))
            .ok_or(BitmapError::Truncated)?;
        if pixels_at < palette_at || end > data.len() {
            return Err(BitmapError::Truncated);
        }

        // Palette follows the DIB header when the pixel offset leaves room
        let dark_bit = if pixels_at - palette_at >= 8 {
            let luma = |i: usize| -> u32 {
                let entry = &data[palette_at + i * 4..palette_at + i * 4 + 3];
                entry.iter().map(|&c| c as u32).sum()
            };
            if luma(1) < luma(0) {
                1
            } else {
                0
            }
        } else {
            0
        };

        Ok(Self {
            data,
            width,
            height: height_px,
            bottom_up: height > 0,
            stride,
            pixels_at,
            dark_bit,
        })
    }

    /// Width in pixels
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Whether the pixel at (x, y), counted from the top-left, is dark
    ///
    /// Out-of-range coordinates read as light.
    pub fn is_dark(&self, x: u16, y: u16) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let row = if self.bottom_up {
            self.height - 1 - y
        } else {
            y
        };
        let index = self.pixels_at + row as usize * self.stride + (x / 8) as usize;
        let bit = (self.data[index] >> (7 - (x % 8))) & 1;
        bit == self.dark_bit
    }
}

/// Bytes per pixel row, padded to four bytes
pub const fn row_stride(width: u16) -> usize {
    (width as usize).div_ceil(32) * 4
}

/// Total payload size of a `width` × `height` bitmap with [`write_header`]
pub const fn encoded_len(width: u16, height: u16) -> usize {
    BMP_HEADER_LEN + row_stride(width) * height as usize
}

/// Write a top-down 1-bit header with a black/white palette (index 0 dark)
///
/// Returns the header length; pixel rows start right after it.
pub fn write_header(out: &mut [u8], width: u16, height: u16) -> Result<usize, BitmapError> {
    if out.len() < BMP_HEADER_LEN {
        return Err(BitmapError::BufferTooSmall);
    }
    if width == 0 || height == 0 {
        return Err(BitmapError::BadDimensions);
    }
    let header = &mut out[..BMP_HEADER_LEN];
    header.fill(0);
    header[..2].copy_from_slice(&FORMAT_TAG);
    header[2..6].copy_from_slice(&(encoded_len(width, height) as u32).to_le_bytes());
    header[10..14].copy_from_slice(&(BMP_HEADER_LEN as u32).to_le_bytes());
    header[14..18].copy_from_slice(&(MIN_DIB_LEN as u32).to_le_bytes());
    header[18..22].copy_from_slice(&(width as i32).to_le_bytes());
    header[22..26].copy_from_slice(&(-(height as i32)).to_le_bytes());
    header[26..28].copy_from_slice(&1u16.to_le_bytes());
    header[28..30].copy_from_slice(&1u16.to_le_bytes());
    // Palette: index 0 black, index 1 white
    header[58..61].copy_from_slice(&[0xFF, 0xFF, 0xFF]);
    Ok(BMP_HEADER_LEN)
}

fn read_u16(data: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([data[at], data[at + 1]])
}

fn read_u32(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

fn read_i32(data: &[u8], at: usize) -> i32 {
    read_u32(data, at) as i32
}
