//! In-process store.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{KeyValueStore, StorageKey, StoreError};

/// Store backed by a `HashMap`; contents die with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<StorageKey, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<StorageKey, String>> {
        // A panic mid-write cannot leave a HashMap half-updated, so keep going.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: StorageKey) -> Result<Option<String>, StoreError> {
        Ok(self.entries().get(&key).cloned())
    }

    fn write_batch(
        &self,
        set: &[(StorageKey, &str)],
        remove: &[StorageKey],
    ) -> Result<(), StoreError> {
        let mut map = self.entries();
        for key in remove {
            map.remove(key);
        }
        for (key, value) in set {
            map.insert(*key, (*value).to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.get(StorageKey::AccessToken).unwrap(), None);

        store.set(StorageKey::AccessToken, "abc").unwrap();
        assert_eq!(
            store.get(StorageKey::AccessToken).unwrap().as_deref(),
            Some("abc")
        );

        store.remove(StorageKey::AccessToken).unwrap();
        assert_eq!(store.get(StorageKey::AccessToken).unwrap(), None);
    }

    #[test]
    fn test_remove_absent_is_ok() {
        let store = MemoryStore::new();
        assert!(store.remove_all(&StorageKey::CREDENTIALS).is_ok());
    }
}
