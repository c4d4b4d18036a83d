//! Provisioning flow
//!
//! ```text
//! NoCredentials ─► AwaitingNetworkCredentials ─► AwaitingPairing ─► Provisioned
//!       ▲                     │ join failed             │ timeout
//!       └─────────────────────┴─────────────────────────┘
//! ```
//!
//! The types and decisions live here; the orchestrator drives the I/O.

pub mod flow;

pub use flow::{
    interpret_pairing_response, tidy_networks, CredentialDraft, PairingPoll, PairingSession,
    ProvisioningState, MAX_WRITES_PER_POLL,
};
