//! Orchestrator
//!
//! Single cooperative control loop. Each [`Orchestrator::tick`] runs exactly
//! one state transition and returns the sleep it wants before the next one;
//! [`Orchestrator::run`] alternates ticks and sleeps forever.
//!
//! ```text
//!            ┌───────────────────────────── factory reset ◄──── any state
//!            ▼
//!          Boot ──► Provisioning ──► NetworkConnect ──► Fetch ──► Render
//!            │            ▲                │  ▲           │          │
//!            ▼            │ not configured │  │           ▼          ▼
//!         Halted          └────────────────┤  └──────── Error      Idle
//!                                          ▼                         │
//!                                        Error ◄─────────────────────┘
//! ```
//!
//! All mutable device state lives in [`DeviceContext`]; transition functions
//! take it by `&mut` and return the next state.

mod boot;
mod cycle;
mod indicator;
mod provision;

#[cfg(test)]
mod scenarios;

pub use indicator::Indicator;

use ccfirm_hal::FlashStorage;

use crate::config::{DeviceCredentials, RefreshSettings};
use crate::fetch::{ZoneBuffers, MANIFEST_BUFFER_LEN};
use crate::recovery::LinkMonitor;
use crate::scheduler::RefreshCycleState;
use crate::state::State;
use crate::traits::{Clock, ConfigChannel, EpdPanel, Network};
use crate::zone::ZoneRegistry;

/// Device identifier length (radio MAC address)
pub const DEVICE_ID_LEN: usize = 6;

/// Board peripherals handed to the orchestrator
pub struct Peripherals<P, N, S, C, K> {
    pub panel: P,
    pub net: N,
    pub storage: S,
    pub channel: C,
    pub clock: K,
}

/// Everything the state machine reads or mutates
pub struct DeviceContext<'a, P, N, S, C, K> {
    pub(crate) panel: P,
    pub(crate) net: N,
    pub(crate) storage: S,
    pub(crate) channel: C,
    pub(crate) clock: K,
    pub(crate) device_id: [u8; DEVICE_ID_LEN],
    pub(crate) settings: RefreshSettings,
    pub(crate) registry: ZoneRegistry,
    pub(crate) buffers: ZoneBuffers<'a>,
    pub(crate) credentials: Option<DeviceCredentials>,
    pub(crate) cycle: RefreshCycleState,
    pub(crate) link: LinkMonitor,
    /// Manifest and pairing response bodies
    pub(crate) scratch: [u8; MANIFEST_BUFFER_LEN],
    /// Indicator currently on screen
    pub(crate) indicator: Option<Indicator>,
    pub(crate) pairing_attempt: u32,
}

impl<'a, P, N, S, C, K> DeviceContext<'a, P, N, S, C, K> {
    /// Active settings (defaults until boot loads the stored ones)
    pub fn settings(&self) -> &RefreshSettings {
        &self.settings
    }

    /// Zone layout and applied fingerprints
    pub fn registry(&self) -> &ZoneRegistry {
        &self.registry
    }

    /// Refresh and error history
    pub fn cycle(&self) -> &RefreshCycleState {
        &self.cycle
    }

    /// Credentials in use, if provisioned
    pub fn credentials(&self) -> Option<&DeviceCredentials> {
        self.credentials.as_ref()
    }

    /// Indicator currently on screen
    pub fn indicator(&self) -> Option<Indicator> {
        self.indicator
    }
}

/// The device state machine
pub struct Orchestrator<'a, P, N, S, C, K> {
    ctx: DeviceContext<'a, P, N, S, C, K>,
    state: State,
    reset_requested: bool,
}

impl<'a, P, N, S, C, K> Orchestrator<'a, P, N, S, C, K>
where
    P: EpdPanel,
    N: Network,
    S: FlashStorage,
    C: ConfigChannel,
    K: Clock,
{
    /// Create an orchestrator in `Boot`
    ///
    /// `arena` backs every zone buffer; boot halts if it is smaller than
    /// [`ZoneRegistry::buffer_len`].
    pub fn new(
        peripherals: Peripherals<P, N, S, C, K>,
        registry: ZoneRegistry,
        arena: &'a mut [u8],
        device_id: [u8; DEVICE_ID_LEN],
    ) -> Self {
        let Peripherals {
            panel,
            net,
            storage,
            channel,
            clock,
        } = peripherals;
        Self {
            ctx: DeviceContext {
                panel,
                net,
                storage,
                channel,
                clock,
                device_id,
                settings: RefreshSettings::default(),
                registry,
                buffers: ZoneBuffers::new(arena),
                credentials: None,
                cycle: RefreshCycleState::new(),
                link: LinkMonitor::new(),
                scratch: [0; MANIFEST_BUFFER_LEN],
                indicator: None,
                pairing_attempt: 0,
            },
            state: State::Boot,
            reset_requested: false,
        }
    }

    /// Current state
    pub fn state(&self) -> &State {
        &self.state
    }

    /// Device context
    pub fn context(&self) -> &DeviceContext<'a, P, N, S, C, K> {
        &self.ctx
    }

    /// Clear credentials and reboot the state machine on the next tick
    pub fn request_factory_reset(&mut self) {
        self.reset_requested = true;
    }

    /// Run one transition; returns the requested sleep in milliseconds
    pub async fn tick(&mut self) -> u32 {
        let reset =
            core::mem::take(&mut self.reset_requested) | self.ctx.channel.take_reset_request();
        if reset {
            let transition = self.ctx.factory_reset().await;
            self.state = transition.next;
            return transition.sleep_ms;
        }

        let state = core::mem::replace(&mut self.state, State::Boot);
        let from = state.name();
        let transition = match state {
            State::Boot => self.ctx.boot().await,
            State::Provisioning(step) => self.ctx.provision(step).await,
            State::NetworkConnect => self.ctx.network_connect().await,
            State::Fetch => self.ctx.fetch().await,
            State::Render(job) => self.ctx.render(job).await,
            State::Idle => self.ctx.idle(),
            State::Error(kind) => self.ctx.error(kind).await,
            State::Halted(reason) => self.ctx.halted(reason),
        };

        if transition.next.name() != from {
            debug!("{} -> {}", from, transition.next.name());
        }
        self.state = transition.next;
        transition.sleep_ms
    }

    /// Tick forever, sleeping between ticks as requested
    pub async fn run(&mut self) {
        info!("Orchestrator running");
        loop {
            let sleep_ms = self.tick().await;
            if sleep_ms > 0 {
                self.ctx.clock.delay_ms(sleep_ms).await;
            }
        }
    }
}
