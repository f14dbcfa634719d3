//! Durable key-value persistence seam.
//!
//! Storage is an external collaborator: the core only fixes the namespace
//! and key names plus the access contract. Implementations are expected to
//! scope an open/close of the underlying store around each call; the core
//! never holds a handle across operations. Durability guarantees are the
//! collaborator's concern, not this crate's.

use core::fmt;

use heapless::{String, Vec};

use crate::provisioning::{MAX_PASSWORD_LEN, MAX_SSID_LEN, StoredCredentials};

/// Namespace holding provisioning data.
pub const WIFI_NAMESPACE: &str = "wifi";

/// Key under which the ssid is persisted.
pub const SSID_KEY: &str = "ssid";

/// Key under which the password is persisted.
pub const PASSWORD_KEY: &str = "password";

/// Durable key-value persistence consulted by the control handler.
pub trait CredentialStore {
    /// Implementation-specific failure type.
    type Error: fmt::Debug;

    /// Persists `value` under `namespace`/`key`, replacing any previous
    /// value.
    ///
    /// # Errors
    ///
    /// Returns the implementation's error when the write cannot complete;
    /// previously stored values must survive a failed write.
    fn put(&mut self, namespace: &str, key: &str, value: &[u8]) -> Result<(), Self::Error>;

    /// Copies the stored value into `buf` and returns its length, or `None`
    /// when the key is absent.
    ///
    /// Reads take `&mut self` so implementations can drive exclusive
    /// hardware such as a flash controller.
    ///
    /// # Errors
    ///
    /// Returns the implementation's error when the read cannot complete.
    fn get(
        &mut self,
        namespace: &str,
        key: &str,
        buf: &mut [u8],
    ) -> Result<Option<usize>, Self::Error>;
}

/// Persists a committed credential pair under the wifi namespace.
///
/// # Errors
///
/// Propagates the store's error; when the ssid write succeeds but the
/// password write fails the store may hold a mixed pair, which the next
/// successful commit repairs.
pub fn save_credentials<S: CredentialStore>(
    store: &mut S,
    credentials: &StoredCredentials,
) -> Result<(), S::Error> {
    store.put(WIFI_NAMESPACE, SSID_KEY, &credentials.ssid)?;
    store.put(WIFI_NAMESPACE, PASSWORD_KEY, &credentials.password)
}

/// Loads previously committed credentials; absent keys read back as empty.
///
/// # Errors
///
/// Propagates the store's error.
pub fn load_credentials<S: CredentialStore>(store: &mut S) -> Result<StoredCredentials, S::Error> {
    let mut credentials = StoredCredentials::default();

    let mut ssid_buf = [0u8; MAX_SSID_LEN];
    if let Some(len) = store.get(WIFI_NAMESPACE, SSID_KEY, &mut ssid_buf)? {
        let take = len.min(MAX_SSID_LEN);
        // Capacity matches the buffer, the copy cannot fail.
        let _ = credentials.ssid.extend_from_slice(&ssid_buf[..take]);
    }

    let mut password_buf = [0u8; MAX_PASSWORD_LEN];
    if let Some(len) = store.get(WIFI_NAMESPACE, PASSWORD_KEY, &mut password_buf)? {
        let take = len.min(MAX_PASSWORD_LEN);
        let _ = credentials.password.extend_from_slice(&password_buf[..take]);
    }

    Ok(credentials)
}

/// Upper bound on entries the in-memory store retains.
pub const MEMORY_STORE_CAPACITY: usize = 8;

const MAX_KEY_LEN: usize = 12;
const MAX_VALUE_LEN: usize = MAX_PASSWORD_LEN;

/// In-memory [`CredentialStore`] used by tests and the emulator.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: Vec<Entry, MEMORY_STORE_CAPACITY>,
}

#[derive(Clone, Debug)]
struct Entry {
    namespace: String<MAX_KEY_LEN>,
    key: String<MAX_KEY_LEN>,
    value: Vec<u8, MAX_VALUE_LEN>,
}

/// Errors raised by the in-memory store.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MemoryStoreError {
    /// Store already holds [`MEMORY_STORE_CAPACITY`] entries.
    StoreFull,
    /// Namespace or key exceeds the fixed slot width.
    KeyTooLong,
    /// Value exceeds the fixed slot width.
    ValueTooLong,
}

impl fmt::Display for MemoryStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryStoreError::StoreFull => f.write_str("memory store full"),
            MemoryStoreError::KeyTooLong => f.write_str("namespace or key too long"),
            MemoryStoreError::ValueTooLong => f.write_str("value too long"),
        }
    }
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when no entries are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CredentialStore for MemoryStore {
    type Error = MemoryStoreError;

    fn put(&mut self, namespace: &str, key: &str, value: &[u8]) -> Result<(), Self::Error> {
        let mut stored: Vec<u8, MAX_VALUE_LEN> = Vec::new();
        stored
            .extend_from_slice(value)
            .map_err(|_| MemoryStoreError::ValueTooLong)?;

        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|entry| entry.namespace == namespace && entry.key == key)
        {
            entry.value = stored;
            return Ok(());
        }

        let entry = Entry {
            namespace: String::try_from(namespace).map_err(|_| MemoryStoreError::KeyTooLong)?,
            key: String::try_from(key).map_err(|_| MemoryStoreError::KeyTooLong)?,
            value: stored,
        };
        self.entries
            .push(entry)
            .map_err(|_| MemoryStoreError::StoreFull)
    }

    fn get(
        &mut self,
        namespace: &str,
        key: &str,
        buf: &mut [u8],
    ) -> Result<Option<usize>, Self::Error> {
        let Some(entry) = self
            .entries
            .iter()
            .find(|entry| entry.namespace == namespace && entry.key == key)
        else {
            return Ok(None);
        };

        let len = entry.value.len().min(buf.len());
        buf[..len].copy_from_slice(&entry.value[..len]);
        Ok(Some(len))
    }
}
