//! Storage backends.
//!
//! A store maps [`StoreKey`]s (`/`-separated relative paths) to byte blobs.
//! Datasets and groups are written through the storage traits so the chunk
//! and metadata logic stays independent of where bytes live. The only
//! backend currently provided is the [`FilesystemStore`].

mod filesystem;

pub use filesystem::{FilesystemStore, FilesystemStoreCreateError};

use std::sync::Arc;

use bytes::Bytes;
use derive_more::{Display, From};
use thiserror::Error;

/// A store key, a relative path like `segmentation/raw/0.1.2`.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display)]
pub struct StoreKey(String);

/// An invalid store key.
#[derive(Debug, From, Error)]
#[error("invalid store key {_0}")]
pub struct StoreKeyError(String);

impl StoreKey {
    /// Create a new store key.
    ///
    /// # Errors
    /// Returns [`StoreKeyError`] if `key` is empty, starts with `/`, or ends
    /// with `/`.
    pub fn new(key: impl Into<String>) -> Result<Self, StoreKeyError> {
        let key = key.into();
        if Self::validate(&key) {
            Ok(Self(key))
        } else {
            Err(StoreKeyError(key))
        }
    }

    /// Extracts a string slice of the key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validates a key. A key is a non-empty relative path with no leading or
    /// trailing `/`.
    #[must_use]
    pub fn validate(key: &str) -> bool {
        !key.is_empty() && !key.starts_with('/') && !key.ends_with('/') && !key.contains("//")
    }
}

/// A store prefix. Either empty (the root) or a relative path ending in `/`.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display)]
pub struct StorePrefix(String);

/// An invalid store prefix.
#[derive(Debug, From, Error)]
#[error("invalid store prefix {_0}")]
pub struct StorePrefixError(String);

impl StorePrefix {
    /// Create a new store prefix.
    ///
    /// # Errors
    /// Returns [`StorePrefixError`] if `prefix` is non-empty and does not end
    /// with `/`, or starts with `/`.
    pub fn new(prefix: impl Into<String>) -> Result<Self, StorePrefixError> {
        let prefix = prefix.into();
        if Self::validate(&prefix) {
            Ok(Self(prefix))
        } else {
            Err(StorePrefixError(prefix))
        }
    }

    /// The root prefix.
    #[must_use]
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Extracts a string slice of the prefix.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validates a prefix.
    #[must_use]
    pub fn validate(prefix: &str) -> bool {
        prefix.is_empty()
            || (prefix.ends_with('/') && !prefix.starts_with('/') && !prefix.contains("//"))
    }
}

/// The immediate children of a store prefix.
#[derive(Clone, Debug, Default)]
pub struct StoreListing {
    /// Keys directly under the prefix.
    pub keys: Vec<StoreKey>,
    /// Prefixes directly under the prefix.
    pub prefixes: Vec<StorePrefix>,
}

/// A storage error.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A write was attempted on read-only storage.
    #[error("storage is read-only")]
    ReadOnly,
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// An invalid store key.
    #[error(transparent)]
    InvalidKey(#[from] StoreKeyError),
    /// An invalid store prefix.
    #[error(transparent)]
    InvalidPrefix(#[from] StorePrefixError),
    /// Any other storage failure.
    #[error("{_0}")]
    Other(String),
}

/// Readable storage.
pub trait ReadableStorageTraits: Send + Sync {
    /// Retrieve the value at `key`, or [`None`] if it does not exist.
    ///
    /// # Errors
    /// Returns a [`StorageError`] on failures other than a missing key.
    fn get(&self, key: &StoreKey) -> Result<Option<Bytes>, StorageError>;

    /// Returns true if `key` exists.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if existence cannot be determined.
    fn exists(&self, key: &StoreKey) -> Result<bool, StorageError>;
}

/// Writable storage.
pub trait WritableStorageTraits: Send + Sync {
    /// Store `value` at `key`. The write is atomic: a concurrent reader sees
    /// either the previous value or `value`, never a mixture.
    ///
    /// # Errors
    /// Returns a [`StorageError`] on failure.
    fn set(&self, key: &StoreKey, value: &[u8]) -> Result<(), StorageError>;

    /// Erase the value at `key`. Succeeds if `key` does not exist.
    ///
    /// # Errors
    /// Returns a [`StorageError`] on failure.
    fn erase(&self, key: &StoreKey) -> Result<(), StorageError>;

    /// Erase all keys under `prefix`. Succeeds if there are none.
    ///
    /// # Errors
    /// Returns a [`StorageError`] on failure.
    fn erase_prefix(&self, prefix: &StorePrefix) -> Result<(), StorageError>;
}

/// Listable storage.
pub trait ListableStorageTraits: Send + Sync {
    /// List the keys and prefixes directly under `prefix`, sorted.
    ///
    /// # Errors
    /// Returns a [`StorageError`] on failure.
    fn list_dir(&self, prefix: &StorePrefix) -> Result<StoreListing, StorageError>;
}

/// Storage supporting reads, writes, and listing.
pub trait ReadableWritableStorageTraits:
    ReadableStorageTraits + WritableStorageTraits + ListableStorageTraits
{
}

impl<T: ReadableStorageTraits + WritableStorageTraits + ListableStorageTraits + ?Sized>
    ReadableWritableStorageTraits for T
{
}

/// An [`Arc`] wrapped readable, writable, and listable storage.
pub type ReadableWritableStorage = Arc<dyn ReadableWritableStorageTraits>;
