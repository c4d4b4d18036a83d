//! Wear-levelled storage on NOR flash
//!
//! Uses sequential-storage for key-value storage in a dedicated flash
//! partition. Generic over any async `NorFlash`, so the board crate only
//! supplies the flash peripheral and the partition range.
//!
//! Implements the [`FlashStorage`] trait.

use core::ops::Range;

use embedded_storage_async::nor_flash::NorFlash;
use sequential_storage::cache::NoCache;
use sequential_storage::map;

use crate::flash::{FlashError, FlashStorage, StorageKey};

/// Scratch buffer size for sequential-storage item (de)serialisation
pub const ITEM_BUFFER_SIZE: usize = 512;

/// Marker stored in place of a removed value
///
/// A lone `0xFF` is never a complete postcard encoding, so it cannot collide
/// with a real credential or settings record.
const TOMBSTONE: [u8; 1] = [0xFF];

/// NOR flash storage implementation
///
/// Removal writes a tombstone instead of erasing, which avoids needing
/// multi-write support from the flash driver.
pub struct NorFlashStorage<F> {
    flash: F,
    range: Range<u32>,
}

impl<F: NorFlash> NorFlashStorage<F> {
    /// Create a new storage instance over `range`
    ///
    /// The range must be aligned to `F::ERASE_SIZE` and span at least two
    /// erase pages.
    pub fn new(flash: F, range: Range<u32>) -> Self {
        Self { flash, range }
    }

    /// Get the raw flash for low-level access
    pub fn flash(&mut self) -> &mut F {
        &mut self.flash
    }

    fn map_error<E>(err: sequential_storage::Error<E>) -> FlashError {
        match err {
            sequential_storage::Error::FullStorage => FlashError::Full,
            sequential_storage::Error::Corrupted { .. } => FlashError::Corrupted,
            _ => FlashError::Storage,
        }
    }
}

impl<F: NorFlash> FlashStorage for NorFlashStorage<F> {
    async fn read(&mut self, key: StorageKey, buffer: &mut [u8]) -> Result<usize, FlashError> {
        let mut data_buffer = [0u8; ITEM_BUFFER_SIZE];

        let result = map::fetch_item::<StorageKey, &[u8], _>(
            &mut self.flash,
            self.range.clone(),
            &mut NoCache::new(),
            &mut data_buffer,
            &key,
        )
        .await;

        match result {
            Ok(Some(data)) if data == TOMBSTONE.as_slice() => Err(FlashError::NotFound),
            Ok(Some(data)) => {
                let len = data.len();
                if buffer.len() < len {
                    return Err(FlashError::BufferTooSmall);
                }
                buffer[..len].copy_from_slice(data);
                Ok(len)
            }
            Ok(None) => Err(FlashError::NotFound),
            Err(e) => Err(Self::map_error(e)),
        }
    }

    async fn write(&mut self, key: StorageKey, data: &[u8]) -> Result<(), FlashError> {
        if data.len() + 16 > ITEM_BUFFER_SIZE {
            return Err(FlashError::BufferTooSmall);
        }
        let mut data_buffer = [0u8; ITEM_BUFFER_SIZE];

        map::store_item(
            &mut self.flash,
            self.range.clone(),
            &mut NoCache::new(),
            &mut data_buffer,
            &key,
            &data,
        )
        .await
        .map_err(Self::map_error)
    }

    async fn remove(&mut self, key: StorageKey) -> Result<(), FlashError> {
        if !self.exists(key).await {
            return Ok(());
        }
        self.write(key, &TOMBSTONE).await
    }

    async fn exists(&mut self, key: StorageKey) -> bool {
        let mut data_buffer = [0u8; ITEM_BUFFER_SIZE];

        matches!(
            map::fetch_item::<StorageKey, &[u8], _>(
                &mut self.flash,
                self.range.clone(),
                &mut NoCache::new(),
                &mut data_buffer,
                &key,
            )
            .await,
            Ok(Some(data)) if data != TOMBSTONE.as_slice()
        )
    }

    async fn erase_all(&mut self) -> Result<(), FlashError> {
        self.flash
            .erase(self.range.start, self.range.end)
            .await
            .map_err(|_| FlashError::Flash)
    }
}
