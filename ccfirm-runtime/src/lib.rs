//! Embassy runtime glue
//!
//! Binds the board-agnostic orchestrator to `embassy-time`: a monotonic
//! clock, a network wrapper that enforces request timeouts even when the
//! radio driver does not, and the top-level dashboard task body.
//!
//! The board crate provides the time driver, the panel, radio, flash and
//! configuration channel, then awaits [`run_dashboard`] from its main task.

#![no_std]
#![deny(unsafe_code)]

use embassy_time::{with_timeout, Duration, Instant, Timer};

use ccfirm_core::config::NetworkIdentity;
use ccfirm_core::orchestrator::DEVICE_ID_LEN;
use ccfirm_core::traits::{
    Clock, ConfigChannel, EpdPanel, Network, NetworkError, Request, RequestTimeout, Response,
    ScanList,
};
use ccfirm_core::zone::ZoneRegistry;
use ccfirm_core::{Orchestrator, Peripherals};
use ccfirm_hal::FlashStorage;

/// Milliseconds since the time driver started
#[derive(Debug, Default, Clone, Copy)]
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    fn now_ms(&self) -> u64 {
        Instant::now().as_millis()
    }

    async fn delay_ms(&mut self, ms: u32) {
        Timer::after_millis(ms as u64).await;
    }
}

/// Network wrapper that abandons an operation once its timeout elapses
pub struct TimedNetwork<N> {
    inner: N,
}

impl<N: Network> TimedNetwork<N> {
    pub fn new(inner: N) -> Self {
        Self { inner }
    }

    /// Unwrap the radio driver
    pub fn into_inner(self) -> N {
        self.inner
    }
}

fn deadline(timeout: RequestTimeout) -> Duration {
    Duration::from_millis(timeout.as_ms() as u64)
}

impl<N: Network> Network for TimedNetwork<N> {
    async fn connect(
        &mut self,
        identity: &NetworkIdentity,
        timeout: RequestTimeout,
    ) -> Result<(), NetworkError> {
        match with_timeout(deadline(timeout), self.inner.connect(identity, timeout)).await {
            Ok(result) => result,
            Err(_) => {
                // Leave the radio idle rather than half-joined
                self.inner.disconnect();
                Err(NetworkError::Timeout)
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    fn disconnect(&mut self) {
        self.inner.disconnect();
    }

    async fn get(&mut self, request: &Request<'_>, body: &mut [u8]) -> Result<Response, NetworkError> {
        with_timeout(deadline(request.timeout), self.inner.get(request, body))
            .await
            .unwrap_or(Err(NetworkError::Timeout))
    }

    async fn scan(&mut self, out: &mut ScanList, timeout: RequestTimeout) -> Result<(), NetworkError> {
        with_timeout(deadline(timeout), self.inner.scan(out, timeout))
            .await
            .unwrap_or(Err(NetworkError::Timeout))
    }
}

/// Run the dashboard on the canonical layout; never returns
///
/// `arena` must hold at least [`ccfirm_core::zone::CANONICAL_ARENA_LEN`]
/// bytes, otherwise the device shows the halt mark and waits for a reset.
pub async fn run_dashboard<P, N, S, C>(
    panel: P,
    net: N,
    storage: S,
    channel: C,
    arena: &mut [u8],
    device_id: [u8; DEVICE_ID_LEN],
) where
    P: EpdPanel,
    N: Network,
    S: FlashStorage,
    C: ConfigChannel,
{
    #[cfg(feature = "defmt")]
    defmt::info!("Dashboard starting, device {=[u8]:x}", &device_id[..]);

    let peripherals = Peripherals {
        panel,
        net: TimedNetwork::new(net),
        storage,
        channel,
        clock: EmbassyClock,
    };
    let mut orchestrator =
        Orchestrator::new(peripherals, ZoneRegistry::canonical(), arena, device_id);
    orchestrator.run().await;
}
