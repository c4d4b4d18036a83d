//! Refresh and timing settings
//!
//! Every timing policy of the orchestrator lives here. Defaults match the
//! reference dashboard; a board may persist overrides under
//! [`StorageKey::DeviceSettings`].

use heapless::String;
use serde::{Deserialize, Serialize};

use ccfirm_hal::{FlashError, FlashStorage, StorageKey};
use ccfirm_protocol::api::{validate_endpoint, MAX_ENDPOINT_LEN};

use crate::recovery::BackoffPolicy;
use crate::traits::RequestTimeout;

/// Current settings layout version
pub const SETTINGS_VERSION: u8 = 1;

/// Largest serialized settings record
pub const MAX_SETTINGS_SIZE: usize = 256;

/// Longest accepted render settle delay
pub const MAX_SETTLE_MS: u32 = 1_000;

/// Longest accepted boot ceiling
pub const MAX_BOOT_CEILING_MS: u32 = 30_000;

/// Errors from settings validation and persistence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SettingsError {
    /// Record written by a different layout version
    Version(u8),
    /// A tier interval is zero
    TierInterval,
    /// Full refresh interval is zero
    FullRefreshInterval,
    /// Partial refresh limit is zero
    PartialLimit,
    /// HTTP or connect timeout outside `RequestTimeout` bounds
    Timeout,
    /// Boot ceiling is zero or too long
    BootCeiling,
    /// Backoff base is zero, max below base, or cap exponent too large
    Backoff,
    /// Provisioning, pairing or poll timer is zero or inconsistent
    ProvisioningTimer,
    /// Settle delay too long
    Settle,
    /// Idle sleep cap is zero
    IdleSleep,
    /// Default endpoint is not a valid base URL
    Endpoint,
    /// Postcard encode/decode failed
    Serialize,
    /// Flash access failed
    Flash(FlashError),
}

impl From<FlashError> for SettingsError {
    fn from(e: FlashError) -> Self {
        SettingsError::Flash(e)
    }
}

/// Refresh and timing settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RefreshSettings {
    /// Layout version ([`SETTINGS_VERSION`])
    pub version: u8,
    /// Re-check interval for tiers 1, 2 and 3
    pub tier_intervals_ms: [u32; 3],
    /// Forced full refresh interval
    pub full_refresh_interval_ms: u32,
    /// Partial refreshes allowed before a full one
    pub max_partial_before_full: u16,
    /// Timeout for each HTTP exchange
    pub http_timeout_ms: u32,
    /// Timeout for a network join
    pub connect_timeout_ms: u32,
    /// Wall-clock ceiling for the boot sequence
    pub boot_ceiling_ms: u32,
    /// Retry delay policy
    pub backoff: BackoffPolicy,
    /// How long to wait for credentials on the configuration channel
    pub provisioning_timeout_ms: u32,
    /// Configuration channel poll cadence
    pub channel_poll_ms: u32,
    /// Pairing endpoint poll cadence
    pub pairing_poll_ms: u32,
    /// How long to wait for pairing confirmation
    pub pairing_timeout_ms: u32,
    /// Pause between consecutive partial refreshes
    pub settle_ms: u32,
    /// Longest single idle sleep
    pub idle_max_sleep_ms: u32,
    /// Join failures before stored credentials are discarded (None: never)
    pub connect_failures_before_reset: Option<u8>,
    /// Endpoint used when the user does not write one
    pub default_endpoint: Option<String<MAX_ENDPOINT_LEN>>,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            tier_intervals_ms: [60_000, 120_000, 300_000],
            full_refresh_interval_ms: 600_000,
            max_partial_before_full: 30,
            http_timeout_ms: 30_000,
            connect_timeout_ms: 30_000,
            boot_ceiling_ms: 5_000,
            backoff: BackoffPolicy::DEFAULT,
            provisioning_timeout_ms: 300_000,
            channel_poll_ms: 250,
            pairing_poll_ms: 5_000,
            pairing_timeout_ms: 600_000,
            settle_ms: 50,
            idle_max_sleep_ms: 60_000,
            connect_failures_before_reset: None,
            default_endpoint: None,
        }
    }
}

impl RefreshSettings {
    /// Check every field against its accepted range
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.version != SETTINGS_VERSION {
            return Err(SettingsError::Version(self.version));
        }
        if self.tier_intervals_ms.contains(&0) {
            return Err(SettingsError::TierInterval);
        }
        if self.full_refresh_interval_ms == 0 {
            return Err(SettingsError::FullRefreshInterval);
        }
        if self.max_partial_before_full == 0 {
            return Err(SettingsError::PartialLimit);
        }
        if RequestTimeout::from_ms(self.http_timeout_ms).is_none()
            || RequestTimeout::from_ms(self.connect_timeout_ms).is_none()
        {
            return Err(SettingsError::Timeout);
        }
        if self.boot_ceiling_ms == 0 || self.boot_ceiling_ms > MAX_BOOT_CEILING_MS {
            return Err(SettingsError::BootCeiling);
        }
        let backoff = &self.backoff;
        if backoff.base_ms == 0
            || backoff.max_ms < backoff.base_ms
            || backoff.cap_exponent > BackoffPolicy::MAX_CAP_EXPONENT
        {
            return Err(SettingsError::Backoff);
        }
        if self.provisioning_timeout_ms == 0
            || self.channel_poll_ms == 0
            || self.pairing_poll_ms == 0
            || self.pairing_poll_ms >= self.pairing_timeout_ms
        {
            return Err(SettingsError::ProvisioningTimer);
        }
        if self.settle_ms > MAX_SETTLE_MS {
            return Err(SettingsError::Settle);
        }
        if self.idle_max_sleep_ms == 0 {
            return Err(SettingsError::IdleSleep);
        }
        if let Some(endpoint) = &self.default_endpoint {
            validate_endpoint(endpoint).map_err(|_| SettingsError::Endpoint)?;
        }
        Ok(())
    }

    /// Interval for a tier index (0-based)
    pub fn tier_interval_ms(&self, tier_index: usize) -> u32 {
        self.tier_intervals_ms
            .get(tier_index)
            .copied()
            .unwrap_or(self.full_refresh_interval_ms)
    }

    /// HTTP timeout, falling back to the default if out of range
    pub fn http_timeout(&self) -> RequestTimeout {
        RequestTimeout::from_ms(self.http_timeout_ms).unwrap_or(RequestTimeout::DEFAULT)
    }

    /// Join timeout, falling back to the default if out of range
    pub fn connect_timeout(&self) -> RequestTimeout {
        RequestTimeout::from_ms(self.connect_timeout_ms).unwrap_or(RequestTimeout::DEFAULT)
    }
}

/// Load settings from flash, falling back to defaults
///
/// A missing record is normal on a fresh device; anything unreadable or
/// invalid is logged and replaced by the defaults.
pub async fn load_settings<S: FlashStorage>(storage: &mut S) -> RefreshSettings {
    match load_settings_inner(storage).await {
        Ok(settings) => {
            debug!("Loaded refresh settings from flash");
            settings
        }
        Err(SettingsError::Flash(FlashError::NotFound)) => {
            debug!("No stored settings, using defaults");
            RefreshSettings::default()
        }
        Err(e) => {
            warn!("Failed to load settings: {}, using defaults", e);
            RefreshSettings::default()
        }
    }
}

async fn load_settings_inner<S: FlashStorage>(
    storage: &mut S,
) -> Result<RefreshSettings, SettingsError> {
    let mut buffer = [0u8; MAX_SETTINGS_SIZE];
    let len = storage.read(StorageKey::DeviceSettings, &mut buffer).await?;
    let settings: RefreshSettings =
        postcard::from_bytes(&buffer[..len]).map_err(|_| SettingsError::Serialize)?;
    settings.validate()?;
    Ok(settings)
}

/// Validate and save settings to flash
pub async fn save_settings<S: FlashStorage>(
    storage: &mut S,
    settings: &RefreshSettings,
) -> Result<(), SettingsError> {
    settings.validate()?;
    let mut buffer = [0u8; MAX_SETTINGS_SIZE];
    let bytes = postcard::to_slice(settings, &mut buffer).map_err(|_| SettingsError::Serialize)?;
    debug!("Saving {} bytes of settings to flash", bytes.len());
    storage.write(StorageKey::DeviceSettings, bytes).await?;
    info!("Saved refresh settings");
    Ok(())
}
