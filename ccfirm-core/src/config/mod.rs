//! Configuration types
//!
//! Device settings and credentials, stored in flash as postcard binary data.

pub mod credentials;
pub mod settings;

pub use credentials::*;
pub use settings::*;
