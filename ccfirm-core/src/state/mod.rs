//! Orchestrator state machine
//!
//! Defines the authoritative runtime behavior of the device. The state
//! machine is explicit and finite; every transition returns the next state.

pub mod machine;

pub use machine::{ErrorKind, HaltReason, RenderJob, State, Transition};
