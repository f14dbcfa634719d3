//! Credential persistence in the last flash page.
//!
//! The node reserves the final 2 KiB page for provisioning data. Both
//! credentials live in one 128-byte record so a write is a read-modify-
//! erase-rewrite of that record; the length byte doubles as a presence
//! marker (0xFF reads as absent on erased flash).

use embassy_stm32::flash::{Blocking, Error as FlashError, Flash};

use node_core::store::{CredentialStore, PASSWORD_KEY, SSID_KEY, WIFI_NAMESPACE};

/// Total flash size of the STM32G0B1KE part.
const FLASH_SIZE: u32 = 512 * 1024;
/// Erase granularity.
const PAGE_SIZE: u32 = 2 * 1024;
/// Offset of the reserved credentials page.
const RESERVED_OFFSET: u32 = FLASH_SIZE - PAGE_SIZE;

/// Bytes of the page the record actually uses.
const RECORD_LEN: usize = 128;

/// Slot layout inside the record: a length byte then the value bytes.
const SSID_SLOT: usize = 0;
const PASSWORD_SLOT: usize = 64;
const SLOT_VALUE_CAP: usize = 63;

const ABSENT: u8 = 0xFF;

/// Errors raised by the flash-backed store.
#[derive(Debug)]
pub enum FlashStoreError {
    /// Underlying flash driver failure.
    Flash(FlashError),
    /// Key outside the provisioning namespace.
    UnknownKey,
    /// Value does not fit its slot.
    ValueTooLong,
}

impl From<FlashError> for FlashStoreError {
    fn from(error: FlashError) -> Self {
        FlashStoreError::Flash(error)
    }
}

/// [`CredentialStore`] backed by the reserved flash page.
pub struct FlashStore<'d> {
    flash: Flash<'d, Blocking>,
}

impl<'d> FlashStore<'d> {
    pub fn new(flash: Flash<'d, Blocking>) -> Self {
        Self { flash }
    }

    fn slot_offset(namespace: &str, key: &str) -> Result<usize, FlashStoreError> {
        if namespace != WIFI_NAMESPACE {
            return Err(FlashStoreError::UnknownKey);
        }
        match key {
            _ if key == SSID_KEY => Ok(SSID_SLOT),
            _ if key == PASSWORD_KEY => Ok(PASSWORD_SLOT),
            _ => Err(FlashStoreError::UnknownKey),
        }
    }

    fn read_record(&mut self) -> Result<[u8; RECORD_LEN], FlashStoreError> {
        let mut record = [0u8; RECORD_LEN];
        self.flash.blocking_read(RESERVED_OFFSET, &mut record)?;
        Ok(record)
    }
}

impl CredentialStore for FlashStore<'_> {
    type Error = FlashStoreError;

    fn put(&mut self, namespace: &str, key: &str, value: &[u8]) -> Result<(), Self::Error> {
        let slot = Self::slot_offset(namespace, key)?;
        if value.len() > SLOT_VALUE_CAP {
            return Err(FlashStoreError::ValueTooLong);
        }
        let len = u8::try_from(value.len()).map_err(|_| FlashStoreError::ValueTooLong)?;

        let mut record = self.read_record()?;
        record[slot] = len;
        record[slot + 1..slot + 1 + SLOT_VALUE_CAP].fill(0);
        record[slot + 1..slot + 1 + value.len()].copy_from_slice(value);

        self.flash
            .blocking_erase(RESERVED_OFFSET, RESERVED_OFFSET + PAGE_SIZE)?;
        self.flash.blocking_write(RESERVED_OFFSET, &record)?;
        Ok(())
    }

    fn get(
        &mut self,
        namespace: &str,
        key: &str,
        buf: &mut [u8],
    ) -> Result<Option<usize>, Self::Error> {
        let slot = Self::slot_offset(namespace, key)?;
        let record = self.read_record()?;

        let len = record[slot];
        if len == ABSENT || usize::from(len) > SLOT_VALUE_CAP {
            return Ok(None);
        }

        let take = usize::from(len).min(buf.len());
        buf[..take].copy_from_slice(&record[slot + 1..slot + 1 + take]);
        Ok(Some(take))
    }
}
