//! Boot, halt and factory reset

use ccfirm_hal::FlashStorage;

use crate::config::{clear_credentials, load_credentials, load_settings, CredentialsError};
use crate::fetch::BufferError;
use crate::orchestrator::{DeviceContext, Indicator};
use crate::provisioning::ProvisioningState;
use crate::recovery::LinkMonitor;
use crate::scheduler::RefreshCycleState;
use crate::state::{HaltReason, State, Transition};
use crate::traits::{Clock, ConfigChannel, EpdPanel, Network};

/// How often a halted device wakes to check for a reset request
pub const HALT_RECHECK_MS: u32 = 60_000;

impl<'a, P, N, S, C, K> DeviceContext<'a, P, N, S, C, K>
where
    P: EpdPanel,
    N: Network,
    S: FlashStorage,
    C: ConfigChannel,
    K: Clock,
{
    /// Panel handshake, buffer allocation, settings and credential load
    ///
    /// Never touches the network. Bounded by the boot ceiling: if it passes
    /// before credentials are in hand, boot gives up on them and provisions.
    pub(crate) async fn boot(&mut self) -> Transition {
        let started = self.clock.now_ms();
        info!("Boot");

        self.panel.init().await;

        if let Err(BufferError::Exhausted {
            required,
            available,
        }) = self.buffers.allocate(&self.registry)
        {
            error!(
                "Zone buffers need {} bytes, arena has {}",
                required, available
            );
            self.show_indicator(Indicator::Halted).await;
            return Transition::now(State::Halted(HaltReason::BufferExhausted));
        }

        self.settings = load_settings(&mut self.storage).await;
        let ceiling = started.saturating_add(self.settings.boot_ceiling_ms as u64);
        let provision = Transition::now(State::Provisioning(ProvisioningState::NoCredentials));

        if self.clock.now_ms() >= ceiling {
            warn!("Boot ceiling reached before credential load");
            self.credentials = None;
            return provision;
        }

        let loaded = load_credentials(&mut self.storage).await;
        if self.clock.now_ms() >= ceiling {
            warn!("Boot ceiling reached during credential load");
            self.credentials = None;
            return provision;
        }

        match loaded {
            Ok(credentials) => {
                info!(
                    "Boot complete in {} ms",
                    self.clock.now_ms().saturating_sub(started)
                );
                self.credentials = Some(credentials);
                Transition::now(State::NetworkConnect)
            }
            Err(CredentialsError::Missing) => {
                info!("No stored credentials");
                self.credentials = None;
                provision
            }
            Err(e) => {
                warn!("Stored credentials unusable: {}", e);
                self.credentials = None;
                provision
            }
        }
    }

    /// Stay halted; only a factory reset leaves
    pub(crate) fn halted(&mut self, reason: HaltReason) -> Transition {
        trace!("Halted: {}", reason);
        Transition::after(State::Halted(reason), HALT_RECHECK_MS)
    }

    /// Forget credentials and refresh history, then boot again
    pub(crate) async fn factory_reset(&mut self) -> Transition {
        warn!("Factory reset");
        if let Err(e) = clear_credentials(&mut self.storage).await {
            error!("Failed to clear credentials: {}", e);
        }
        self.net.disconnect();
        self.channel.close();
        self.credentials = None;
        self.cycle = RefreshCycleState::new();
        self.link = LinkMonitor::new();
        self.registry.clear_applied();
        self.pairing_attempt = 0;
        Transition::now(State::Boot)
    }
}
