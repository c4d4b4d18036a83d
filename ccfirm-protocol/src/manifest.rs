//! Zone manifest parsing
//!
//! The manifest lists the current fingerprint of every zone, one per line:
//!
//! ```text
//! header   1c291ca3
//! summary  7f00a2b4
//! ```
//!
//! Blank lines and lines starting with `#` are ignored. The parser borrows
//! the response body and yields entries lazily.

use core::str::Lines;

use crate::api::validate_segment;
use crate::fingerprint::Fingerprint;

/// One manifest line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManifestEntry<'a> {
    /// Zone identifier
    pub zone_id: &'a str,
    /// Fingerprint of the zone's current payload
    pub fingerprint: Fingerprint,
}

/// Errors from manifest parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ManifestError {
    /// Body is not valid UTF-8
    NotUtf8,
    /// Line (1-based) does not have the form `<id> <fingerprint>`
    MalformedLine(u16),
}

/// Lazy manifest line parser
#[derive(Debug, Clone)]
pub struct ManifestParser<'a> {
    lines: Lines<'a>,
    line_no: u16,
}

impl<'a> ManifestParser<'a> {
    /// Create a parser over a response body
    pub fn new(body: &'a [u8]) -> Result<Self, ManifestError> {
        let text = core::str::from_utf8(body).map_err(|_| ManifestError::NotUtf8)?;
        Ok(Self {
            lines: text.lines(),
            line_no: 0,
        })
    }

    fn parse_line(line: &'a str, line_no: u16) -> Result<ManifestEntry<'a>, ManifestError> {
        let mut parts = line.split_whitespace();
        let (Some(zone_id), Some(hex), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(ManifestError::MalformedLine(line_no));
        };
        validate_segment(zone_id).map_err(|_| ManifestError::MalformedLine(line_no))?;
        let fingerprint =
            Fingerprint::from_hex(hex).ok_or(ManifestError::MalformedLine(line_no))?;
        Ok(ManifestEntry {
            zone_id,
            fingerprint,
        })
    }
}

impl<'a> Iterator for ManifestParser<'a> {
    type Item = Result<ManifestEntry<'a>, ManifestError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = self.lines.next()?;
            self.line_no = self.line_no.saturating_add(1);
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            return Some(Self::parse_line(line, self.line_no));
        }
    }
}
