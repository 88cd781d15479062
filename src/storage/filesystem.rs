//! A filesystem store.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use walkdir::WalkDir;

use super::{
    ListableStorageTraits, ReadableStorageTraits, StorageError, StoreKey, StoreListing,
    StorePrefix, WritableStorageTraits,
};

/// Suffix of in-flight temporary files, skipped when listing.
const TMP_SUFFIX: &str = ".tmp__";

/// A filesystem store rooted at a base directory.
///
/// Store keys map directly to file paths below the base directory. Writes go
/// through a temporary file in the destination directory followed by a
/// rename, so concurrent readers of a key never observe a partial value.
#[derive(Debug)]
pub struct FilesystemStore {
    base_path: PathBuf,
    readonly: bool,
    files: Mutex<HashMap<StoreKey, Arc<RwLock<()>>>>,
    tmp_seq: AtomicU64,
}

/// A filesystem store creation error.
#[derive(Debug, Error)]
pub enum FilesystemStoreCreateError {
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// The base path is not valid UTF-8 or points to an existing file.
    #[error("invalid base path {}", .0.display())]
    InvalidBasePath(PathBuf),
}

impl FilesystemStore {
    /// Create a new filesystem store at `base_path`, creating the directory
    /// if it does not exist.
    ///
    /// # Errors
    /// Returns a [`FilesystemStoreCreateError`] if `base_path` is invalid or
    /// points to an existing file rather than a directory.
    pub fn new<P: AsRef<Path>>(base_path: P) -> Result<Self, FilesystemStoreCreateError> {
        let base_path = base_path.as_ref().to_path_buf();
        if base_path.to_str().is_none() {
            return Err(FilesystemStoreCreateError::InvalidBasePath(base_path));
        }

        let readonly = if base_path.exists() {
            if !base_path.is_dir() {
                return Err(FilesystemStoreCreateError::InvalidBasePath(base_path));
            }
            fs::metadata(&base_path)?.permissions().readonly()
        } else {
            fs::create_dir_all(&base_path)?;
            false
        };

        Ok(Self {
            base_path,
            readonly,
            files: Mutex::default(),
            tmp_seq: AtomicU64::new(0),
        })
    }

    /// The base directory of the store.
    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Maps a [`StoreKey`] to a filesystem path.
    #[must_use]
    pub fn key_to_fspath(&self, key: &StoreKey) -> PathBuf {
        self.base_path.join(key.as_str())
    }

    /// Maps a [`StorePrefix`] to a filesystem path.
    #[must_use]
    pub fn prefix_to_fspath(&self, prefix: &StorePrefix) -> PathBuf {
        self.base_path.join(prefix.as_str())
    }

    fn get_file_lock(&self, key: &StoreKey) -> Arc<RwLock<()>> {
        let mut files = self.files.lock();
        files.entry(key.clone()).or_default().clone()
    }

    fn tmp_path(&self, dest: &Path) -> PathBuf {
        let seq = self.tmp_seq.fetch_add(1, Ordering::Relaxed);
        let filename = dest
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        dest.with_file_name(format!(
            "{filename}.{}.{seq}{TMP_SUFFIX}",
            std::process::id()
        ))
    }
}

impl ReadableStorageTraits for FilesystemStore {
    fn get(&self, key: &StoreKey) -> Result<Option<Bytes>, StorageError> {
        let lock = self.get_file_lock(key);
        let _guard = lock.read();
        match fs::read(self.key_to_fspath(key)) {
            Ok(bytes) => Ok(Some(Bytes::from(bytes))),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn exists(&self, key: &StoreKey) -> Result<bool, StorageError> {
        Ok(self.key_to_fspath(key).is_file())
    }
}

impl WritableStorageTraits for FilesystemStore {
    fn set(&self, key: &StoreKey, value: &[u8]) -> Result<(), StorageError> {
        if self.readonly {
            return Err(StorageError::ReadOnly);
        }

        let path = self.key_to_fspath(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let lock = self.get_file_lock(key);
        let _guard = lock.write();
        let tmp_path = self.tmp_path(&path);
        fs::write(&tmp_path, value)?;
        if let Err(err) = fs::rename(&tmp_path, &path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(err.into());
        }
        Ok(())
    }

    fn erase(&self, key: &StoreKey) -> Result<(), StorageError> {
        if self.readonly {
            return Err(StorageError::ReadOnly);
        }

        let lock = self.get_file_lock(key);
        let _guard = lock.write();
        match fs::remove_file(self.key_to_fspath(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn erase_prefix(&self, prefix: &StorePrefix) -> Result<(), StorageError> {
        if self.readonly {
            return Err(StorageError::ReadOnly);
        }

        match fs::remove_dir_all(self.prefix_to_fspath(prefix)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

impl ListableStorageTraits for FilesystemStore {
    fn list_dir(&self, prefix: &StorePrefix) -> Result<StoreListing, StorageError> {
        let path = self.prefix_to_fspath(prefix);
        if !path.is_dir() {
            return Ok(StoreListing::default());
        }

        let mut listing = StoreListing::default();
        for entry in WalkDir::new(&path).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|err| StorageError::Other(err.to_string()))?;
            let name = entry.file_name().to_string_lossy();
            if name.ends_with(TMP_SUFFIX) {
                continue;
            }
            if entry.file_type().is_dir() {
                listing
                    .prefixes
                    .push(StorePrefix::new(format!("{}{name}/", prefix.as_str()))?);
            } else {
                listing
                    .keys
                    .push(StoreKey::new(format!("{}{name}", prefix.as_str()))?);
            }
        }
        Ok(listing)
    }
}
