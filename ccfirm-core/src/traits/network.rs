//! Network link trait
//!
//! Abstracts the radio join and a single bounded GET. The transport (TCP,
//! TLS, HTTP framing) belongs to the board crate; the core only sees status
//! codes and body bytes.

use heapless::{String, Vec};

use ccfirm_protocol::Fingerprint;

use crate::config::{NetworkIdentity, MAX_SSID_LEN};

/// Networks kept from one scan
pub const MAX_SCAN_RESULTS: usize = 10;

/// SSIDs found by a scan
pub type ScanList = Vec<String<MAX_SSID_LEN>, MAX_SCAN_RESULTS>;

/// Timeout for a single network operation
///
/// Always strictly positive and at most [`RequestTimeout::MAX_MS`]; there is
/// no way to construct an unbounded request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RequestTimeout(u32);

impl RequestTimeout {
    /// Upper bound for any single request
    pub const MAX_MS: u32 = 60_000;

    /// Default request timeout
    pub const DEFAULT: RequestTimeout = RequestTimeout(30_000);

    /// Create a timeout, rejecting zero and anything above [`Self::MAX_MS`]
    pub const fn from_ms(ms: u32) -> Option<Self> {
        if ms == 0 || ms > Self::MAX_MS {
            None
        } else {
            Some(Self(ms))
        }
    }

    /// Timeout in milliseconds
    pub const fn as_ms(self) -> u32 {
        self.0
    }
}

/// One GET request
#[derive(Debug, Clone, Copy)]
pub struct Request<'a> {
    /// Absolute URL
    pub url: &'a str,
    /// Pairing token for the token header, if paired
    pub token: Option<&'a str>,
    /// Fingerprint for the conditional request header
    pub if_none_match: Option<Fingerprint>,
    /// Bound on the whole exchange
    pub timeout: RequestTimeout,
}

/// Result of a completed exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Response {
    /// HTTP status code
    pub status: u16,
    /// Declared body length, if the server sent one
    pub content_length: Option<usize>,
    /// Bytes written into the body buffer
    pub body_len: usize,
    /// The body did not fit and was cut at the buffer length
    pub overflowed: bool,
}

/// Errors from the network link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NetworkError {
    /// Operation exceeded its timeout
    Timeout,
    /// Radio join or association failed
    JoinFailed,
    /// Link is down
    Disconnected,
    /// Connection, TLS or framing failure
    Transport,
}

/// Network link
pub trait Network {
    /// Join the network, bounded by `timeout`
    fn connect(
        &mut self,
        identity: &NetworkIdentity,
        timeout: RequestTimeout,
    ) -> impl core::future::Future<Output = Result<(), NetworkError>>;

    /// Whether the link is currently up
    fn is_connected(&self) -> bool;

    /// Leave the network
    fn disconnect(&mut self);

    /// Perform a GET and stream the body into `body`
    ///
    /// Implementations must never write past `body.len()`. When the declared
    /// length already exceeds the buffer they may skip reading the body and
    /// report `overflowed`.
    fn get(
        &mut self,
        request: &Request<'_>,
        body: &mut [u8],
    ) -> impl core::future::Future<Output = Result<Response, NetworkError>>;

    /// List visible networks into `out`, strongest first, bounded by `timeout`
    ///
    /// Implementations stop once `out` is full. Hidden networks may appear
    /// as empty names and the same name may repeat.
    fn scan(
        &mut self,
        out: &mut ScanList,
        timeout: RequestTimeout,
    ) -> impl core::future::Future<Output = Result<(), NetworkError>>;
}
