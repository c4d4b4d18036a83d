//! Device abstraction traits
//!
//! These traits define the interface between the orchestrator and the
//! board-specific panel driver, network stack and configuration channel.

pub mod channel;
pub mod clock;
pub mod display;
pub mod network;

pub use channel::{ChannelStatus, ChannelWrite, ConfigChannel};
pub use clock::Clock;
pub use display::{EpdPanel, EpdPanelExt, Region};
pub use network::{
    Network, NetworkError, Request, RequestTimeout, Response, ScanList, MAX_SCAN_RESULTS,
};
