//! Local configuration channel trait
//!
//! A short-range link (BLE GATT service on the reference board) through which
//! the user writes network credentials. Writes are one-way: secrets can be
//! set but never read back. The device publishes a non-secret status.

use heapless::String;

use ccfirm_protocol::api::MAX_ENDPOINT_LEN;
use ccfirm_protocol::PairingCode;

use crate::config::{MAX_PASSPHRASE_LEN, MAX_SSID_LEN};
use crate::traits::ScanList;

/// A field written by the user
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChannelWrite {
    Ssid(String<MAX_SSID_LEN>),
    Passphrase(String<MAX_PASSPHRASE_LEN>),
    Endpoint(String<MAX_ENDPOINT_LEN>),
}

/// Status published to the user
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChannelStatus {
    /// Networks visible when provisioning started, to pick the SSID from
    Networks(ScanList),
    /// Waiting for SSID, passphrase and endpoint
    AwaitingCredentials,
    /// Credentials complete, joining the network
    Joining,
    /// Joined; enter this code in the setup wizard
    AwaitingPairing(PairingCode),
    /// Pairing complete
    Paired,
    /// Join or pairing failed; the flow restarts
    Failed,
}

/// Configuration channel
///
/// All methods are non-blocking.
pub trait ConfigChannel {
    /// Start advertising and accepting writes
    fn open(&mut self);

    /// Stop advertising
    fn close(&mut self);

    /// Take the next pending write, if any
    fn poll_write(&mut self) -> Option<ChannelWrite>;

    /// Publish the current status
    fn publish(&mut self, status: &ChannelStatus);

    /// Take a pending factory reset request (long press or channel command)
    ///
    /// Polled once per orchestrator tick in every state.
    fn take_reset_request(&mut self) -> bool {
        false
    }
}
