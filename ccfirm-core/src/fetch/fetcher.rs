//! Zone fetcher
//!
//! Exactly one GET per zone. The body streams into the zone's arena slot; the
//! slot only becomes displayable after the length and bitmap header checks
//! pass. The fetcher never touches refresh state.

use ccfirm_protocol::api::zone_url;
use ccfirm_protocol::{Bitmap, Fingerprint, StatusClass};

use crate::fetch::buffer::ZoneBuffers;
use crate::traits::{Network, NetworkError, Request, RequestTimeout};
use crate::zone::Zone;

/// Why a zone fetch failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FetchError {
    /// No complete response within the request timeout
    Timeout,
    /// Non-success status
    HttpError(u16),
    /// Declared or actual body larger than the zone capacity
    TooLarge,
    /// Body is not a 1-bit bitmap that fits the zone
    InvalidFormat,
    /// Link-level failure or truncated body
    Transport,
    /// URL could not be built or no buffer slot exists
    InvalidRequest,
}

impl FetchError {
    /// Whether the same request may succeed on a later attempt
    pub fn is_retryable(self) -> bool {
        match self {
            FetchError::Timeout | FetchError::Transport => true,
            FetchError::HttpError(code) => StatusClass::classify(code).is_retryable(),
            FetchError::TooLarge | FetchError::InvalidFormat | FetchError::InvalidRequest => false,
        }
    }

    /// Whether the service says the device is not (or no longer) configured
    pub fn requires_provisioning(self) -> bool {
        matches!(
            self,
            FetchError::HttpError(code) if StatusClass::classify(code) == StatusClass::NotConfigured
        )
    }

    /// Whether the service broke the payload contract
    pub fn is_contract_violation(self) -> bool {
        matches!(self, FetchError::TooLarge | FetchError::InvalidFormat)
    }
}

impl From<NetworkError> for FetchError {
    fn from(e: NetworkError) -> Self {
        match e {
            NetworkError::Timeout => FetchError::Timeout,
            NetworkError::JoinFailed | NetworkError::Disconnected | NetworkError::Transport => {
                FetchError::Transport
            }
        }
    }
}

/// Outcome of one zone fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FetchStatus {
    /// Payload buffered and validated
    Ok(Fingerprint),
    /// Service confirmed the last applied payload is current
    NotModified,
    /// Nothing buffered
    Failed(FetchError),
}

/// Result of fetching one zone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FetchResult {
    /// Registry index of the zone
    pub zone_index: usize,
    pub status: FetchStatus,
    /// Payload bytes buffered (0 unless `Ok`)
    pub byte_length: usize,
}

impl FetchResult {
    fn failed(zone_index: usize, error: FetchError) -> Self {
        Self {
            zone_index,
            status: FetchStatus::Failed(error),
            byte_length: 0,
        }
    }

    /// `Ok` or `NotModified`
    pub fn is_success(&self) -> bool {
        !matches!(self.status, FetchStatus::Failed(_))
    }

    /// The failure, if any
    pub fn error(&self) -> Option<FetchError> {
        match self.status {
            FetchStatus::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Request parameters shared by every zone fetch of a cycle
#[derive(Debug, Clone, Copy)]
pub struct ZoneRequest<'a> {
    /// Service base URL
    pub endpoint: &'a str,
    /// Pairing token, if paired
    pub token: Option<&'a str>,
    pub timeout: RequestTimeout,
}

/// Fetch one zone into its buffer slot
///
/// `known` is the fingerprint of the payload currently on screen; when set,
/// the request is conditional and may come back `NotModified`, either from a
/// 304 or from a full body whose fingerprint matches.
pub async fn fetch_zone<N: Network>(
    net: &mut N,
    zone: &Zone,
    zone_index: usize,
    known: Option<Fingerprint>,
    request: &ZoneRequest<'_>,
    buffers: &mut ZoneBuffers<'_>,
) -> FetchResult {
    let url = match zone_url(request.endpoint, zone.id()) {
        Ok(url) => url,
        Err(e) => {
            warn!("Zone {}: bad URL: {}", zone.id(), e);
            return FetchResult::failed(zone_index, FetchError::InvalidRequest);
        }
    };
    let Some(slot) = buffers.writable(zone_index) else {
        warn!("Zone {}: no buffer slot", zone.id());
        return FetchResult::failed(zone_index, FetchError::InvalidRequest);
    };
    let capacity = slot.len();

    let get = Request {
        url: &url,
        token: request.token,
        if_none_match: known,
        timeout: request.timeout,
    };
    let response = match net.get(&get, slot).await {
        Ok(response) => response,
        Err(e) => {
            debug!("Zone {}: request failed: {}", zone.id(), e);
            return FetchResult::failed(zone_index, e.into());
        }
    };

    match StatusClass::classify(response.status) {
        StatusClass::Success => {}
        StatusClass::NotModified if known.is_some() => {
            trace!("Zone {}: not modified", zone.id());
            return FetchResult {
                zone_index,
                status: FetchStatus::NotModified,
                byte_length: 0,
            };
        }
        _ => {
            return FetchResult::failed(zone_index, FetchError::HttpError(response.status));
        }
    }

    let declared_too_large = response
        .content_length
        .is_some_and(|declared| declared > capacity);
    if response.overflowed || declared_too_large || response.body_len > capacity {
        warn!(
            "Zone {}: payload exceeds {} byte capacity",
            zone.id(),
            capacity
        );
        return FetchResult::failed(zone_index, FetchError::TooLarge);
    }
    if response
        .content_length
        .is_some_and(|declared| declared != response.body_len)
    {
        debug!("Zone {}: body truncated", zone.id());
        return FetchResult::failed(zone_index, FetchError::Transport);
    }

    let payload = &slot[..response.body_len];
    let region = zone.region();
    let valid = match Bitmap::parse(payload) {
        Ok(bitmap) => bitmap.width() <= region.width && bitmap.height() <= region.height,
        Err(e) => {
            warn!("Zone {}: invalid bitmap: {}", zone.id(), e);
            false
        }
    };
    if !valid {
        return FetchResult::failed(zone_index, FetchError::InvalidFormat);
    }

    let fingerprint = Fingerprint::of(payload);
    if known == Some(fingerprint) {
        // Full body but same bytes as on screen
        trace!("Zone {}: unchanged", zone.id());
        return FetchResult {
            zone_index,
            status: FetchStatus::NotModified,
            byte_length: 0,
        };
    }
    let byte_length = payload.len();
    buffers.commit(zone_index, byte_length);
    trace!("Zone {}: {} bytes", zone.id(), byte_length);
    FetchResult {
        zone_index,
        status: FetchStatus::Ok(fingerprint),
        byte_length,
    }
}
