//! State machine definition

use heapless::Vec;

use crate::fetch::FetchResult;
use crate::provisioning::ProvisioningState;
use crate::scheduler::RefreshPlan;
use crate::zone::MAX_ZONES;

/// Device states
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// Panel handshake, buffer allocation, settings and credential load
    Boot,
    /// Establishing network identity and pairing
    Provisioning(ProvisioningState),
    /// Joining the network with stored credentials
    NetworkConnect,
    /// Planning a cycle and fetching its zones
    Fetch,
    /// Drawing fetched zones
    Render(RenderJob),
    /// Sleeping until a tier falls due
    Idle,
    /// Backing off after a failure
    Error(ErrorKind),
    /// Unrecoverable without a factory reset
    Halted(HaltReason),
}

/// Recoverable failure classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ErrorKind {
    /// Network join failed
    ConnectFailed,
    /// No zone of a non-empty plan could be fetched
    CycleFailed,
    /// Nobody completed the credential form in time
    ProvisioningTimedOut,
}

/// Reasons the device stops
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HaltReason {
    /// The buffer arena cannot hold the zone layout
    BufferExhausted,
}

/// A fetched plan waiting to be drawn
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RenderJob {
    pub plan: RefreshPlan,
    /// One result per plan entry, same order
    pub results: Vec<FetchResult, MAX_ZONES>,
    /// When the plan was made
    pub planned_at: u64,
}

/// Outcome of one tick
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Transition {
    pub next: State,
    /// Sleep requested before the next tick
    pub sleep_ms: u32,
}

impl Transition {
    /// Move on without sleeping
    pub fn now(next: State) -> Self {
        Self { next, sleep_ms: 0 }
    }

    /// Move on after sleeping
    pub fn after(next: State, sleep_ms: u32) -> Self {
        Self { next, sleep_ms }
    }
}

impl State {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            State::Boot => "Boot",
            State::Provisioning(_) => "Provisioning",
            State::NetworkConnect => "NetworkConnect",
            State::Fetch => "Fetch",
            State::Render(_) => "Render",
            State::Idle => "Idle",
            State::Error(_) => "Error",
            State::Halted(_) => "Halted",
        }
    }

    /// Check if this is an error state
    pub fn is_error(&self) -> bool {
        matches!(self, State::Error(_))
    }

    /// Check if this is the steady-state loop (online, provisioned)
    pub fn is_steady(&self) -> bool {
        matches!(
            self,
            State::NetworkConnect | State::Fetch | State::Render(_) | State::Idle
        )
    }

    /// Check if only a factory reset leaves this state
    pub fn is_halted(&self) -> bool {
        matches!(self, State::Halted(_))
    }
}
