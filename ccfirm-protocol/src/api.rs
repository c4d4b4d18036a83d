//! Endpoint paths, headers and status classification
//!
//! URLs are assembled into fixed-capacity strings; anything that would not
//! fit is a structured [`UrlError`], never a reallocation.

use heapless::String;

/// Maximum length of the remote endpoint base URL
pub const MAX_ENDPOINT_LEN: usize = 128;

/// Maximum length of a zone identifier
pub const MAX_ZONE_ID_LEN: usize = 16;

/// Maximum length of a pairing token
pub const MAX_TOKEN_LEN: usize = 64;

/// Maximum length of any request URL
pub const MAX_URL_LEN: usize = MAX_ENDPOINT_LEN + 32;

/// Fixed-capacity request URL
pub type Url = String<MAX_URL_LEN>;

/// Per-zone bitmap path prefix
pub const ZONE_PATH: &str = "/api/zone/";

/// Zone manifest path
pub const MANIFEST_PATH: &str = "/api/zones";

/// Pairing poll path prefix
pub const PAIR_PATH: &str = "/api/pair/";

/// Header carrying the pairing token on content requests
pub const TOKEN_HEADER: &str = "X-Device-Token";

/// Conditional request header carrying the last applied fingerprint
pub const IF_NONE_MATCH_HEADER: &str = "If-None-Match";

/// User agent sent with every request
pub const USER_AGENT: &str = concat!("ccfirm/", env!("CARGO_PKG_VERSION"));

/// Status codes with a protocol meaning
pub const STATUS_OK: u16 = 200;
pub const STATUS_ACCEPTED: u16 = 202;
pub const STATUS_NOT_MODIFIED: u16 = 304;
pub const STATUS_UNAUTHORIZED: u16 = 401;
/// The service has no configuration for this device yet
pub const STATUS_NOT_CONFIGURED: u16 = 428;

/// How the device should treat a response status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StatusClass {
    /// 2xx other than 202: body is usable
    Success,
    /// 202: request accepted, result not ready (pairing pending)
    Pending,
    /// 304: content unchanged since the supplied fingerprint
    NotModified,
    /// 428 or 401: device must (re-)enter provisioning
    NotConfigured,
    /// Other 4xx
    ClientError,
    /// 5xx
    ServerError,
    /// Anything else (1xx, other 3xx, out of range)
    Unexpected,
}

impl StatusClass {
    /// Classify a status code without looking at the body
    pub fn classify(status: u16) -> Self {
        match status {
            STATUS_ACCEPTED => StatusClass::Pending,
            200..=299 => StatusClass::Success,
            STATUS_NOT_MODIFIED => StatusClass::NotModified,
            STATUS_NOT_CONFIGURED | STATUS_UNAUTHORIZED => StatusClass::NotConfigured,
            400..=499 => StatusClass::ClientError,
            500..=599 => StatusClass::ServerError,
            _ => StatusClass::Unexpected,
        }
    }

    /// Whether retrying the same request later can succeed
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            StatusClass::Pending
                | StatusClass::ClientError
                | StatusClass::ServerError
                | StatusClass::Unexpected
        )
    }
}

/// Errors building a request URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UrlError {
    /// Endpoint is empty or not an http(s) URL
    InvalidEndpoint,
    /// Endpoint exceeds [`MAX_ENDPOINT_LEN`]
    EndpointTooLong,
    /// Path segment contains characters outside `[A-Za-z0-9_-]`
    InvalidSegment,
    /// Assembled URL exceeds [`MAX_URL_LEN`]
    TooLong,
}

/// Check that an endpoint is a bounded http(s) base URL
pub fn validate_endpoint(endpoint: &str) -> Result<(), UrlError> {
    if endpoint.len() > MAX_ENDPOINT_LEN {
        return Err(UrlError::EndpointTooLong);
    }
    let rest = endpoint
        .strip_prefix("https://")
        .or_else(|| endpoint.strip_prefix("http://"))
        .ok_or(UrlError::InvalidEndpoint)?;
    if rest.trim_end_matches('/').is_empty() || rest.bytes().any(|b| b.is_ascii_whitespace()) {
        return Err(UrlError::InvalidEndpoint);
    }
    Ok(())
}

/// Check a single path segment (zone id or pairing code)
pub fn validate_segment(segment: &str) -> Result<(), UrlError> {
    if segment.is_empty()
        || !segment
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    {
        return Err(UrlError::InvalidSegment);
    }
    Ok(())
}

/// URL of one zone bitmap
pub fn zone_url(endpoint: &str, zone_id: &str) -> Result<Url, UrlError> {
    validate_segment(zone_id)?;
    join(endpoint, ZONE_PATH, zone_id)
}

/// URL of the zone manifest
pub fn manifest_url(endpoint: &str) -> Result<Url, UrlError> {
    join(endpoint, MANIFEST_PATH, "")
}

/// URL polled while waiting for pairing confirmation
pub fn pairing_url(endpoint: &str, code: &str) -> Result<Url, UrlError> {
    validate_segment(code)?;
    join(endpoint, PAIR_PATH, code)
}

fn join(endpoint: &str, path: &str, segment: &str) -> Result<Url, UrlError> {
    validate_endpoint(endpoint)?;
    let base = endpoint.trim_end_matches('/');

    let mut url = Url::new();
    url.push_str(base).map_err(|_| UrlError::TooLong)?;
    url.push_str(path).map_err(|_| UrlError::TooLong)?;
    url.push_str(segment).map_err(|_| UrlError::TooLong)?;
    Ok(url)
}

/// Check a pairing token: printable ASCII without spaces, bounded length
pub fn validate_token(token: &str) -> bool {
    !token.is_empty()
        && token.len() <= MAX_TOKEN_LEN
        && token.bytes().all(|b| b.is_ascii_graphic())
}
