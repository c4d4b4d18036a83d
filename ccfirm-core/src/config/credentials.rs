//! Device credentials
//!
//! Network identity, remote endpoint and pairing token, each persisted under
//! its own storage key. A device without a readable identity and endpoint is
//! factory-fresh as far as the orchestrator is concerned.

use heapless::String;
use serde::{Deserialize, Serialize};

use ccfirm_hal::{FlashError, FlashStorage, StorageKey};
use ccfirm_protocol::api::{validate_endpoint, validate_token, MAX_ENDPOINT_LEN, MAX_TOKEN_LEN};

/// Maximum SSID length (802.11 limit)
pub const MAX_SSID_LEN: usize = 32;

/// Maximum WPA passphrase length
pub const MAX_PASSPHRASE_LEN: usize = 64;

/// Largest serialized credential record
const MAX_RECORD_SIZE: usize = 160;

/// Remote endpoint base URL
pub type Endpoint = String<MAX_ENDPOINT_LEN>;

/// Pairing token issued by the service
pub type PairingToken = String<MAX_TOKEN_LEN>;

/// Network identity
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkIdentity {
    pub ssid: String<MAX_SSID_LEN>,
    pub passphrase: String<MAX_PASSPHRASE_LEN>,
}

// Manual impls keep the passphrase out of logs
impl core::fmt::Debug for NetworkIdentity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NetworkIdentity")
            .field("ssid", &self.ssid)
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for NetworkIdentity {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "NetworkIdentity(ssid={})", self.ssid.as_str())
    }
}

/// Everything the device needs to reach and authenticate with the service
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceCredentials {
    pub network: NetworkIdentity,
    pub endpoint: Endpoint,
    pub pairing_token: Option<PairingToken>,
}

/// Errors from credential persistence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CredentialsError {
    /// A required key is absent
    Missing,
    /// A stored value does not decode or fails validation
    Corrupted,
    /// Postcard encode failed
    Serialize,
    /// Flash access failed
    Flash(FlashError),
}

impl From<FlashError> for CredentialsError {
    fn from(e: FlashError) -> Self {
        match e {
            FlashError::NotFound => CredentialsError::Missing,
            FlashError::Corrupted => CredentialsError::Corrupted,
            other => CredentialsError::Flash(other),
        }
    }
}

/// Load credentials from flash
///
/// The pairing token is optional; identity and endpoint are required.
pub async fn load_credentials<S: FlashStorage>(
    storage: &mut S,
) -> Result<DeviceCredentials, CredentialsError> {
    let mut buffer = [0u8; MAX_RECORD_SIZE];

    let len = storage.read(StorageKey::NetworkIdentity, &mut buffer).await?;
    let network: NetworkIdentity =
        postcard::from_bytes(&buffer[..len]).map_err(|_| CredentialsError::Corrupted)?;
    if network.ssid.is_empty() {
        return Err(CredentialsError::Corrupted);
    }

    let len = storage.read(StorageKey::RemoteEndpoint, &mut buffer).await?;
    let endpoint: Endpoint =
        postcard::from_bytes(&buffer[..len]).map_err(|_| CredentialsError::Corrupted)?;
    validate_endpoint(&endpoint).map_err(|_| CredentialsError::Corrupted)?;

    let pairing_token = match storage.read(StorageKey::PairingToken, &mut buffer).await {
        Ok(len) => {
            let token: PairingToken =
                postcard::from_bytes(&buffer[..len]).map_err(|_| CredentialsError::Corrupted)?;
            if !validate_token(&token) {
                return Err(CredentialsError::Corrupted);
            }
            Some(token)
        }
        Err(FlashError::NotFound) => None,
        Err(e) => return Err(e.into()),
    };

    debug!("Loaded credentials for ssid {}", network.ssid.as_str());
    Ok(DeviceCredentials {
        network,
        endpoint,
        pairing_token,
    })
}

/// Save credentials to flash
///
/// A credential set without a token removes any previously stored one.
pub async fn save_credentials<S: FlashStorage>(
    storage: &mut S,
    credentials: &DeviceCredentials,
) -> Result<(), CredentialsError> {
    let mut buffer = [0u8; MAX_RECORD_SIZE];

    let bytes = postcard::to_slice(&credentials.network, &mut buffer)
        .map_err(|_| CredentialsError::Serialize)?;
    storage.write(StorageKey::NetworkIdentity, bytes).await?;

    let bytes = postcard::to_slice(&credentials.endpoint, &mut buffer)
        .map_err(|_| CredentialsError::Serialize)?;
    storage.write(StorageKey::RemoteEndpoint, bytes).await?;

    match &credentials.pairing_token {
        Some(token) => {
            let bytes =
                postcard::to_slice(token, &mut buffer).map_err(|_| CredentialsError::Serialize)?;
            storage.write(StorageKey::PairingToken, bytes).await?;
        }
        None => storage.remove(StorageKey::PairingToken).await?,
    }

    info!("Saved credentials to flash");
    Ok(())
}

/// Remove every credential key
pub async fn clear_credentials<S: FlashStorage>(storage: &mut S) -> Result<(), CredentialsError> {
    for key in StorageKey::CREDENTIALS {
        storage.remove(key).await?;
    }
    info!("Cleared stored credentials");
    Ok(())
}
