//! Board-agnostic core logic for the ccfirm dashboard firmware
//!
//! This crate contains all application logic that does not depend on a
//! specific panel, radio or board:
//!
//! - Device traits (e-paper panel, network link, configuration channel, clock)
//! - Zone registry and per-zone buffer arena
//! - Content fetcher and manifest change detection
//! - Refresh scheduler (tiers, partial/full policy)
//! - Backoff and link-failure policy
//! - Provisioning flow and the orchestrator state machine
//! - Configuration and credential persistence

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

mod fmt;

pub mod config;
pub mod fetch;
pub mod orchestrator;
pub mod provisioning;
pub mod recovery;
pub mod scheduler;
pub mod state;
pub mod traits;
pub mod zone;

#[cfg(test)]
pub(crate) mod testing;

pub use orchestrator::{DeviceContext, Orchestrator, Peripherals};
pub use state::{ErrorKind, HaltReason, State, Transition};
