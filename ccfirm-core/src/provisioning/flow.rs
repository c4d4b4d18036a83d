//! Provisioning states and decisions

use heapless::String;

use ccfirm_protocol::api::{validate_endpoint, validate_token};
use ccfirm_protocol::{PairingCode, StatusClass};

use crate::config::{DeviceCredentials, Endpoint, NetworkIdentity, PairingToken};
use crate::config::{MAX_PASSPHRASE_LEN, MAX_SSID_LEN};
use crate::traits::{ChannelWrite, ScanList};

/// Channel writes consumed per poll
pub const MAX_WRITES_PER_POLL: usize = 8;

/// Fields written so far on the configuration channel
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CredentialDraft {
    ssid: Option<String<MAX_SSID_LEN>>,
    passphrase: Option<String<MAX_PASSPHRASE_LEN>>,
    endpoint: Option<Endpoint>,
}

impl core::fmt::Debug for CredentialDraft {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CredentialDraft")
            .field("ssid", &self.ssid)
            .field("has_passphrase", &self.passphrase.is_some())
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for CredentialDraft {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "CredentialDraft(ssid={}, passphrase={}, endpoint={})",
            self.ssid.is_some(),
            self.passphrase.is_some(),
            self.endpoint.is_some()
        )
    }
}

impl CredentialDraft {
    /// Apply one user write; later writes replace earlier ones
    ///
    /// An endpoint that is not a valid base URL is dropped.
    pub fn apply(&mut self, write: ChannelWrite) {
        match write {
            ChannelWrite::Ssid(ssid) => self.ssid = Some(ssid),
            ChannelWrite::Passphrase(passphrase) => self.passphrase = Some(passphrase),
            ChannelWrite::Endpoint(endpoint) => {
                if validate_endpoint(&endpoint).is_ok() {
                    self.endpoint = Some(endpoint);
                } else {
                    warn!("Ignoring invalid endpoint write");
                }
            }
        }
    }

    /// Identity and endpoint, once every required field is present
    pub fn complete(&self, default_endpoint: Option<&Endpoint>) -> Option<(NetworkIdentity, Endpoint)> {
        let ssid = self.ssid.as_ref().filter(|ssid| !ssid.is_empty())?;
        let passphrase = self.passphrase.as_ref()?;
        let endpoint = self.endpoint.as_ref().or(default_endpoint)?;
        Some((
            NetworkIdentity {
                ssid: ssid.clone(),
                passphrase: passphrase.clone(),
            },
            endpoint.clone(),
        ))
    }
}

/// A joined device waiting for the user to confirm its pairing code
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PairingSession {
    /// When pairing started
    pub since: u64,
    /// When the pairing endpoint was last polled
    pub last_poll_at: Option<u64>,
    pub code: PairingCode,
    pub network: NetworkIdentity,
    pub endpoint: Endpoint,
}

impl PairingSession {
    /// Start a session now
    pub fn new(now: u64, code: PairingCode, network: NetworkIdentity, endpoint: Endpoint) -> Self {
        Self {
            since: now,
            last_poll_at: None,
            code,
            network,
            endpoint,
        }
    }

    /// Whether the absolute pairing timeout has passed
    pub fn timed_out(&self, now: u64, timeout_ms: u32) -> bool {
        now.saturating_sub(self.since) >= timeout_ms as u64
    }

    /// Milliseconds until the next poll is due (0: poll now)
    pub fn poll_due_in(&self, now: u64, interval_ms: u32) -> u64 {
        match self.last_poll_at {
            None => 0,
            Some(last) => (interval_ms as u64).saturating_sub(now.saturating_sub(last)),
        }
    }
}

/// Provisioning sub-state
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProvisioningState {
    /// Nothing known; open the configuration channel
    NoCredentials,
    /// Channel open, collecting fields
    AwaitingNetworkCredentials { since: u64, draft: CredentialDraft },
    /// Joined, polling for pairing confirmation
    AwaitingPairing(PairingSession),
    /// Complete; persist once and go online
    Provisioned(DeviceCredentials),
}

/// Interpretation of one pairing poll
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PairingPoll {
    /// Service confirmed the code and issued a token
    Paired(PairingToken),
    /// Not confirmed yet
    Pending,
    /// Unexpected status or unusable token; keep polling
    Failed(u16),
}

/// Interpret a pairing endpoint response
///
/// A success body is the token itself, optionally surrounded by whitespace.
pub fn interpret_pairing_response(status: u16, body: &[u8]) -> PairingPoll {
    match StatusClass::classify(status) {
        StatusClass::Success => {}
        StatusClass::Pending => return PairingPoll::Pending,
        _ => return PairingPoll::Failed(status),
    }
    let token = core::str::from_utf8(body).map(str::trim).unwrap_or("");
    if !validate_token(token) {
        return PairingPoll::Failed(status);
    }
    match PairingToken::try_from(token) {
        Ok(token) => PairingPoll::Paired(token),
        Err(_) => PairingPoll::Failed(status),
    }
}

/// Drop hidden and repeated names from a scan, keeping the first of each
pub fn tidy_networks(found: &ScanList) -> ScanList {
    let mut networks = ScanList::new();
    for ssid in found.iter().filter(|ssid| !ssid.is_empty()) {
        if !networks.contains(ssid) {
            // Never longer than `found`
            let _ = networks.push(ssid.clone());
        }
    }
    networks
}
