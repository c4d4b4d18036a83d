//! ccfirm Hardware Abstraction Layer
//!
//! This crate defines the persistence abstraction the firmware core is
//! written against, so the same orchestrator runs on any board that can
//! provide a NOR flash partition.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  ccfirm-core (orchestrator, provisioning)│
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  ccfirm-hal (this crate - FlashStorage) │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  NorFlashStorage<F: NorFlash>           │
//! │  (sequential-storage key/value map)     │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Traits
//!
//! - [`flash::FlashStorage`] - Persistent key/value storage

#![no_std]
#![deny(unsafe_code)]

pub mod flash;
#[cfg(feature = "sequential-storage")]
pub mod nor;

// Re-export key traits at crate root for convenience
pub use flash::{FlashError, FlashStorage, StorageKey};
#[cfg(feature = "sequential-storage")]
pub use nor::NorFlashStorage;
