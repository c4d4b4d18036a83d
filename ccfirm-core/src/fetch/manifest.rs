//! Manifest change detection
//!
//! Before a partial cycle the device fetches the zone manifest and compares
//! each published fingerprint with the one last drawn. Zones the manifest
//! does not mention stay unknown, and unknown counts as changed.

use ccfirm_protocol::api::manifest_url;
use ccfirm_protocol::{Fingerprint, ManifestParser, StatusClass};

use crate::fetch::fetcher::{FetchError, ZoneRequest};
use crate::traits::{Network, Request};
use crate::zone::{ZoneRegistry, MAX_ZONES};

/// Scratch buffer size for the manifest body
pub const MANIFEST_BUFFER_LEN: usize = 512;

/// Fingerprints observed on the service, by registry index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChangeSet {
    observed: [Option<Fingerprint>; MAX_ZONES],
}

impl Default for ChangeSet {
    fn default() -> Self {
        Self::unknown()
    }
}

impl ChangeSet {
    /// Nothing observed: every zone counts as changed
    pub const fn unknown() -> Self {
        Self {
            observed: [None; MAX_ZONES],
        }
    }

    /// Record the service's fingerprint for a zone
    pub fn observe(&mut self, index: usize, fingerprint: Fingerprint) {
        if let Some(slot) = self.observed.get_mut(index) {
            *slot = Some(fingerprint);
        }
    }

    /// Fingerprint published for a zone, if known
    pub fn observed(&self, index: usize) -> Option<Fingerprint> {
        self.observed.get(index).copied().flatten()
    }

    /// Whether a zone's content differs from what is on screen
    pub fn is_changed(&self, index: usize, last_applied: Option<Fingerprint>) -> bool {
        match (self.observed(index), last_applied) {
            (Some(observed), Some(applied)) => observed != applied,
            _ => true,
        }
    }
}

/// Fetch and parse the manifest
///
/// Ids not in the registry are ignored. A malformed manifest is a contract
/// violation; the caller treats every due zone as changed.
pub async fn fetch_manifest<N: Network>(
    net: &mut N,
    registry: &ZoneRegistry,
    request: &ZoneRequest<'_>,
    scratch: &mut [u8],
) -> Result<ChangeSet, FetchError> {
    let url = manifest_url(request.endpoint).map_err(|_| FetchError::InvalidRequest)?;
    let get = Request {
        url: &url,
        token: request.token,
        if_none_match: None,
        timeout: request.timeout,
    };
    let response = net.get(&get, scratch).await?;

    if StatusClass::classify(response.status) != StatusClass::Success {
        return Err(FetchError::HttpError(response.status));
    }
    if response.overflowed || response.body_len > scratch.len() {
        return Err(FetchError::TooLarge);
    }

    let parser = ManifestParser::new(&scratch[..response.body_len])
        .map_err(|_| FetchError::InvalidFormat)?;
    let mut changes = ChangeSet::unknown();
    for entry in parser {
        let entry = entry.map_err(|e| {
            warn!("Malformed manifest: {}", e);
            FetchError::InvalidFormat
        })?;
        match registry.index_of(entry.zone_id) {
            Some(index) => changes.observe(index, entry.fingerprint),
            None => debug!("Manifest lists unknown zone {}", entry.zone_id),
        }
    }
    Ok(changes)
}
