//! Content fingerprints
//!
//! A fingerprint is the CRC-32 (IEEE 802.3) of a zone payload. The service
//! publishes the same value in the manifest, so the device can tell whether a
//! zone changed before fetching it.

use heapless::String;

/// Hex-encoded fingerprint length
pub const FINGERPRINT_HEX_LEN: usize = 8;

/// Short content fingerprint of a zone payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Fingerprint(pub u32);

impl Fingerprint {
    /// Fingerprint a complete payload
    pub fn of(data: &[u8]) -> Self {
        Self(!crc32_update(0xFFFF_FFFF, data))
    }

    /// Raw CRC value
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Lower-case, zero-padded hex form used on the wire
    pub fn to_hex(self) -> String<FINGERPRINT_HEX_LEN> {
        const DIGITS: &[u8; 16] = b"0123456789abcdef";
        let mut out = String::new();
        for shift in (0..8).rev() {
            let nibble = ((self.0 >> (shift * 4)) & 0xF) as usize;
            // Capacity is exactly eight digits
            let _ = out.push(DIGITS[nibble] as char);
        }
        out
    }

    /// Parse the wire form (exactly eight hex digits, either case)
    pub fn from_hex(text: &str) -> Option<Self> {
        if text.len() != FINGERPRINT_HEX_LEN {
            return None;
        }
        let mut value: u32 = 0;
        for byte in text.bytes() {
            let nibble = match byte {
                b'0'..=b'9' => byte - b'0',
                b'a'..=b'f' => byte - b'a' + 10,
                b'A'..=b'F' => byte - b'A' + 10,
                _ => return None,
            };
            value = (value << 4) | nibble as u32;
        }
        Some(Self(value))
    }
}

/// Simple CRC32 update function (IEEE 802.3 polynomial)
pub(crate) fn crc32_update(crc: u32, data: &[u8]) -> u32 {
    const POLY: u32 = 0xEDB88320;
    let mut crc = crc;

    for &byte in data {
        crc ^= byte as u32;
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ POLY;
            } else {
                crc >>= 1;
            }
        }
    }

    crc
}
