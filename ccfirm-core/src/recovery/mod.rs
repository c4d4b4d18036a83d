//! Failure recovery policy
//!
//! Exponential backoff between retries and the link monitor that decides
//! when repeated join failures mean the stored credentials are bad.

pub mod backoff;
pub mod monitor;

pub use backoff::BackoffPolicy;
pub use monitor::{LinkMonitor, LinkVerdict};
