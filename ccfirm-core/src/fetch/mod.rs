//! Content fetching
//!
//! One bounded request per zone, streamed into that zone's slice of a fixed
//! arena. Nothing is allocated after boot.

pub mod buffer;
pub mod fetcher;
pub mod manifest;

pub use buffer::{BufferError, ZoneBuffers};
pub use fetcher::{fetch_zone, FetchError, FetchResult, FetchStatus, ZoneRequest};
pub use manifest::{fetch_manifest, ChangeSet, MANIFEST_BUFFER_LEN};
