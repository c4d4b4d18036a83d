//! Pairing codes
//!
//! The device shows a short code through its configuration channel; the user
//! enters it in the service's setup wizard, and the device polls
//! `/api/pair/{code}` until the service hands back a token.

use heapless::String;

use crate::fingerprint::crc32_update;

/// Characters in a pairing code
pub const PAIRING_CODE_LEN: usize = 6;

/// Code alphabet without look-alike characters (no I, L, O, 0, 1)
pub const PAIRING_ALPHABET: &[u8; 31] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// A pairing code
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PairingCode(String<PAIRING_CODE_LEN>);

impl PairingCode {
    /// Derive a code from the device identity and the pairing attempt
    ///
    /// Every attempt yields a fresh code, and a given device/attempt pair
    /// always yields the same one.
    pub fn derive(device_id: &[u8], attempt: u32) -> Self {
        let crc = crc32_update(0xFFFF_FFFF, device_id);
        let mut state = !crc32_update(crc, &attempt.to_le_bytes()) | 1;

        let mut code = String::new();
        for _ in 0..PAIRING_CODE_LEN {
            // xorshift32
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let ch = PAIRING_ALPHABET[(state % PAIRING_ALPHABET.len() as u32) as usize];
            // Capacity is exactly PAIRING_CODE_LEN
            let _ = code.push(ch as char);
        }
        Self(code)
    }

    /// The code as text
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}
