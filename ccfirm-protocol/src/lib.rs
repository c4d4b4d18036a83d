//! Remote Content Service Protocol
//!
//! This crate defines the HTTP contract between the dashboard device and the
//! remote content service. The service rasterises every zone into a 1-bit
//! bitmap; the device only fetches, validates and blits.
//!
//! # Endpoints
//!
//! ```text
//! GET <endpoint>/api/zone/{id}     1-bit BMP body for one zone
//! GET <endpoint>/api/zones         manifest: "<id> <fingerprint>" per line
//! GET <endpoint>/api/pair/{code}   200 + token once paired, 202 while pending
//! ```
//!
//! Zone bodies start with the `BM` format tag:
//! ```text
//! ┌──────────────┬──────────────┬─────────┬────────────────────────────┐
//! │ FILE HEADER  │ DIB HEADER   │ PALETTE │ PIXEL ROWS (4-byte stride) │
//! │ 14B          │ 40B          │ 8B      │ stride × height            │
//! └──────────────┴──────────────┴─────────┴────────────────────────────┘
//! ```

#![no_std]
#![deny(unsafe_code)]

pub mod api;
pub mod bitmap;
pub mod fingerprint;
pub mod manifest;
pub mod pairing;

pub use api::{StatusClass, UrlError, Url, MAX_ENDPOINT_LEN, MAX_URL_LEN};
pub use bitmap::{Bitmap, BitmapError, BMP_HEADER_LEN};
pub use fingerprint::Fingerprint;
pub use manifest::{ManifestEntry, ManifestError, ManifestParser};
pub use pairing::{PairingCode, PAIRING_CODE_LEN};
