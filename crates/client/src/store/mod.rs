//! Durable key/value storage for credentials and cached collections.
//!
//! The store is deliberately dumb: it maps [`StorageKey`]s to strings and
//! performs no validation. Everything above it (credentials, cache mirror)
//! owns the meaning of the values.
//!
//! # Backends
//!
//! - [`MemoryStore`] - process-local, for tests and throwaway sessions
//! - [`FileStore`] - JSON file on disk; every write is flushed before
//!   returning and every read observes changes made by other processes
//!
//! Batch writes (`set_all` / `remove_all` / `write_batch`) land as a single
//! write so no reader ever sees a half-applied batch.

mod credentials;
mod file;
mod memory;

pub use credentials::{CredentialSet, Credentials};
pub use file::FileStore;
pub use memory::MemoryStore;

use std::fmt;

use thiserror::Error;

/// Errors raised by storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file is not a JSON object of strings.
    #[error("Storage file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Collection kinds mirrored in the local cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    Products,
    Categories,
    Posts,
}

impl CollectionKind {
    /// Every mirrored kind; staleness purges all of them together.
    pub const ALL: [Self; 3] = [Self::Products, Self::Categories, Self::Posts];
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Products => "products",
            Self::Categories => "categories",
            Self::Posts => "posts",
        })
    }
}

/// Keys understood by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    AccessToken,
    RefreshToken,
    UserProfile,
    /// Shared freshness stamp for every cached collection (epoch millis).
    CacheUpdatedAt,
    Collection(CollectionKind),
}

impl StorageKey {
    /// The three credential keys, cleared together on logout.
    pub const CREDENTIALS: [Self; 3] = [Self::AccessToken, Self::RefreshToken, Self::UserProfile];

    /// Key name as persisted.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AccessToken => "chinchin_token",
            Self::RefreshToken => "chinchin_refresh_token",
            Self::UserProfile => "chinchin_user",
            Self::CacheUpdatedAt => "chinchin_cache_updated",
            Self::Collection(CollectionKind::Products) => "chinchin_products",
            Self::Collection(CollectionKind::Categories) => "chinchin_categories",
            Self::Collection(CollectionKind::Posts) => "chinchin_posts",
        }
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A durable string map.
///
/// Implementations must make each call atomic with respect to other calls on
/// the same store, and each write durable before returning.
pub trait KeyValueStore: Send + Sync {
    /// Read a value.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend cannot be read.
    fn get(&self, key: StorageKey) -> Result<Option<String>, StoreError>;

    /// Write a value.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend cannot be written.
    fn set(&self, key: StorageKey, value: &str) -> Result<(), StoreError> {
        self.set_all(&[(key, value)])
    }

    /// Delete a value. Deleting an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend cannot be written.
    fn remove(&self, key: StorageKey) -> Result<(), StoreError> {
        self.remove_all(&[key])
    }

    /// Write several values as one write.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend cannot be written; in that case
    /// none of the values are applied.
    fn set_all(&self, entries: &[(StorageKey, &str)]) -> Result<(), StoreError> {
        self.write_batch(entries, &[])
    }

    /// Delete several values as one write.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend cannot be written; in that case
    /// none of the keys are removed.
    fn remove_all(&self, keys: &[StorageKey]) -> Result<(), StoreError> {
        self.write_batch(&[], keys)
    }

    /// Delete `remove`, then write `set`, as one write. A key in both ends up
    /// set. Readers observe either the state before or the state after.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend cannot be written; in that case
    /// nothing is applied.
    fn write_batch(
        &self,
        set: &[(StorageKey, &str)],
        remove: &[StorageKey],
    ) -> Result<(), StoreError>;
}
