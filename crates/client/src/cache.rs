//! Local mirror of server collections for offline display.
//!
//! The mirror is best-effort: it is written after successful network calls and
//! read only when the network is unavailable. One freshness stamp covers every
//! collection, and once it is older than the TTL all collections are purged
//! together.
//!
//! # Write paths
//!
//! - [`CacheMirror::replace`] after a successful list fetch
//! - [`CacheMirror::patch`] after a successful create, update or delete
//!
//! Both restamp the freshness stamp in the same write and publish
//! [`Signal::StorageChanged`].

use std::sync::Arc;

use chinchin_core::EntityId;
use chrono::{DateTime, TimeDelta, Utc};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::signals::{Signal, SignalBus};
use crate::store::{CollectionKind, KeyValueStore, StorageKey, StoreError};

/// An incremental change to a cached collection.
#[derive(Debug, Clone, PartialEq)]
pub enum Patch {
    /// Append a newly created record.
    Insert(Value),
    /// Overlay the record's fields onto the cached record with the same id.
    Merge(Value),
    /// Drop the record with this id.
    Remove(EntityId),
}

/// Snapshot of what the mirror currently holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStatus {
    pub updated_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Record count per kind; `None` if the kind is not cached.
    pub counts: Vec<(CollectionKind, Option<usize>)>,
}

/// Reads and writes cached collections in a [`KeyValueStore`].
#[derive(Clone)]
pub struct CacheMirror {
    store: Arc<dyn KeyValueStore>,
    signals: SignalBus,
    ttl: TimeDelta,
}

impl CacheMirror {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, signals: SignalBus, ttl: TimeDelta) -> Self {
        Self {
            store,
            signals,
            ttl,
        }
    }

    #[must_use]
    pub const fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    /// Overwrite the collection for `kind` and stamp it fresh.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store cannot be written.
    #[instrument(skip(self, items), fields(count = items.len()))]
    pub fn replace(&self, kind: CollectionKind, items: &[Value]) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(items)?;
        self.write(kind, &encoded)?;
        debug!("cached collection replaced");
        Ok(())
    }

    /// Apply an incremental change to the collection for `kind`.
    ///
    /// Returns `Ok(false)` without writing if the collection is not cached or
    /// its stored JSON is unreadable; a patch never creates a collection.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store cannot be read or written.
    #[instrument(skip(self, patch))]
    pub fn patch(&self, kind: CollectionKind, patch: Patch) -> Result<bool, StoreError> {
        let Some(raw) = self.store.get(StorageKey::Collection(kind))? else {
            debug!("collection not cached, skipping patch");
            return Ok(false);
        };
        let mut items: Vec<Value> = match serde_json::from_str(&raw) {
            Ok(items) => items,
            Err(e) => {
                warn!(error = %e, "cached collection is corrupt, skipping patch");
                return Ok(false);
            }
        };

        apply(&mut items, patch);

        let encoded = serde_json::to_string(&items)?;
        self.write(kind, &encoded)?;
        Ok(true)
    }

    /// The cached collection for `kind`, after purging if the cache is stale.
    ///
    /// Corrupt JSON is logged and reported as absent.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store cannot be read.
    pub fn read(&self, kind: CollectionKind) -> Result<Option<Vec<Value>>, StoreError> {
        self.purge_if_stale()?;

        let Some(raw) = self.store.get(StorageKey::Collection(kind))? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(items) => Ok(Some(items)),
            Err(e) => {
                warn!(%kind, error = %e, "cached collection is corrupt");
                Ok(None)
            }
        }
    }

    /// When the cache was last written. An unreadable stamp reads as `None`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store cannot be read.
    pub fn updated_at(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self
            .store
            .get(StorageKey::CacheUpdatedAt)?
            .as_deref()
            .and_then(parse_stamp))
    }

    /// Purge everything if the cache is older than the TTL.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store cannot be read or written.
    pub fn purge_if_stale(&self) -> Result<bool, StoreError> {
        self.purge_if_stale_at(Utc::now())
    }

    /// [`purge_if_stale`](Self::purge_if_stale) against an explicit clock.
    ///
    /// With no stamp there is nothing to judge and nothing is purged. A stamp
    /// that cannot be parsed counts as stale.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store cannot be read or written.
    pub fn purge_if_stale_at(&self, now: DateTime<Utc>) -> Result<bool, StoreError> {
        let Some(raw) = self.store.get(StorageKey::CacheUpdatedAt)? else {
            return Ok(false);
        };

        let stale = match parse_stamp(&raw) {
            Some(updated) => now.signed_duration_since(updated) > self.ttl,
            None => {
                warn!(stamp = %raw, "cache stamp is unreadable");
                true
            }
        };
        if !stale {
            return Ok(false);
        }

        info!(ttl_days = self.ttl.num_days(), "cache expired, clearing cached collections");
        self.purge()?;
        Ok(true)
    }

    /// Remove every cached collection and the stamp in one write.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store cannot be written.
    pub fn purge(&self) -> Result<(), StoreError> {
        let mut keys: Vec<StorageKey> = CollectionKind::ALL
            .into_iter()
            .map(StorageKey::Collection)
            .collect();
        keys.push(StorageKey::CacheUpdatedAt);
        self.store.remove_all(&keys)?;
        self.signals.publish(Signal::StorageChanged);
        Ok(())
    }

    /// What is cached and until when.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store cannot be read.
    pub fn status(&self) -> Result<CacheStatus, StoreError> {
        let updated_at = self.updated_at()?;
        let mut counts = Vec::with_capacity(CollectionKind::ALL.len());
        for kind in CollectionKind::ALL {
            let count = self
                .store
                .get(StorageKey::Collection(kind))?
                .and_then(|raw| serde_json::from_str::<Vec<Value>>(&raw).ok())
                .map(|items| items.len());
            counts.push((kind, count));
        }
        Ok(CacheStatus {
            updated_at,
            expires_at: updated_at.map(|at| at + self.ttl),
            counts,
        })
    }

    fn write(&self, kind: CollectionKind, encoded: &str) -> Result<(), StoreError> {
        let stamp = Utc::now().timestamp_millis().to_string();
        self.store.set_all(&[
            (StorageKey::Collection(kind), encoded),
            (StorageKey::CacheUpdatedAt, &stamp),
        ])?;
        self.signals.publish(Signal::StorageChanged);
        Ok(())
    }
}

fn apply(items: &mut Vec<Value>, patch: Patch) {
    match patch {
        Patch::Insert(record) => items.push(record),
        Patch::Merge(record) => {
            let Some(id) = EntityId::of_record(&record) else {
                return;
            };
            let Value::Object(incoming) = record else {
                return;
            };
            for item in items.iter_mut().filter(|item| id.matches(item)) {
                if let Value::Object(existing) = item {
                    for (field, value) in &incoming {
                        existing.insert(field.clone(), value.clone());
                    }
                }
            }
        }
        Patch::Remove(id) => items.retain(|item| !id.matches(item)),
    }
}

/// Epoch milliseconds, optionally wrapped in JSON quotes.
fn parse_stamp(raw: &str) -> Option<DateTime<Utc>> {
    let millis = raw.trim().trim_matches('"').parse::<i64>().ok()?;
    DateTime::from_timestamp_millis(millis)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::store::MemoryStore;

    fn mirror() -> (Arc<MemoryStore>, SignalBus, CacheMirror) {
        let store = Arc::new(MemoryStore::new());
        let signals = SignalBus::new();
        let mirror = CacheMirror::new(store.clone(), signals.clone(), TimeDelta::days(7));
        (store, signals, mirror)
    }

    fn cached(store: &MemoryStore, kind: CollectionKind) -> Value {
        serde_json::from_str(&store.get(StorageKey::Collection(kind)).unwrap().unwrap()).unwrap()
    }

    #[test]
    fn test_replace_stamps_and_signals() {
        let (store, signals, mirror) = mirror();
        let mut rx = signals.subscribe();

        mirror
            .replace(CollectionKind::Products, &[json!({"id": 1})])
            .unwrap();

        assert_eq!(cached(&store, CollectionKind::Products), json!([{"id": 1}]));
        let age = Utc::now() - mirror.updated_at().unwrap().unwrap();
        assert!(age < TimeDelta::minutes(1));
        assert_eq!(rx.try_recv().unwrap(), Signal::StorageChanged);
    }

    #[test]
    fn test_patch_sequence() {
        let (store, _, mirror) = mirror();
        let kind = CollectionKind::Categories;
        mirror
            .replace(kind, &[json!({"id": 1, "name": "A"}), json!({"id": 2, "name": "B"})])
            .unwrap();

        mirror
            .patch(kind, Patch::Merge(json!({"id": 2, "name": "B2"})))
            .unwrap();
        assert_eq!(
            cached(&store, kind),
            json!([{"id": 1, "name": "A"}, {"id": 2, "name": "B2"}])
        );

        mirror.patch(kind, Patch::Remove(EntityId::from(1))).unwrap();
        assert_eq!(cached(&store, kind), json!([{"id": 2, "name": "B2"}]));

        mirror
            .patch(kind, Patch::Insert(json!({"id": 3, "name": "C"})))
            .unwrap();
        assert_eq!(
            cached(&store, kind),
            json!([{"id": 2, "name": "B2"}, {"id": 3, "name": "C"}])
        );
    }

    #[test]
    fn test_merge_keeps_unspecified_fields_and_matches_by_string() {
        let (store, _, mirror) = mirror();
        let kind = CollectionKind::Posts;
        mirror
            .replace(kind, &[json!({"id": 7, "title": "Old", "author": "Mai"})])
            .unwrap();

        mirror
            .patch(kind, Patch::Merge(json!({"id": "7", "title": "New"})))
            .unwrap();

        assert_eq!(
            cached(&store, kind),
            json!([{"id": "7", "title": "New", "author": "Mai"}])
        );
    }

    #[test]
    fn test_patch_never_creates_a_collection() {
        let (store, signals, mirror) = mirror();
        let mut rx = signals.subscribe();

        let applied = mirror
            .patch(CollectionKind::Products, Patch::Insert(json!({"id": 1})))
            .unwrap();

        assert!(!applied);
        assert_eq!(
            store.get(StorageKey::Collection(CollectionKind::Products)).unwrap(),
            None
        );
        assert_eq!(store.get(StorageKey::CacheUpdatedAt).unwrap(), None);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_corrupt_collection_aborts_only_the_patch() {
        let (store, _, mirror) = mirror();
        store
            .set(StorageKey::Collection(CollectionKind::Products), "[{broken")
            .unwrap();

        let applied = mirror
            .patch(CollectionKind::Products, Patch::Remove(EntityId::from(1)))
            .unwrap();

        assert!(!applied);
        assert_eq!(
            store
                .get(StorageKey::Collection(CollectionKind::Products))
                .unwrap()
                .as_deref(),
            Some("[{broken")
        );
        assert!(mirror.read(CollectionKind::Products).unwrap().is_none());
    }

    #[test]
    fn test_stale_purge_is_global_and_idempotent() {
        let (store, _, mirror) = mirror();
        for kind in CollectionKind::ALL {
            mirror.replace(kind, &[json!({"id": 1})]).unwrap();
        }
        let eight_days_later = Utc::now() + TimeDelta::days(8);

        assert!(mirror.purge_if_stale_at(eight_days_later).unwrap());
        for kind in CollectionKind::ALL {
            assert_eq!(store.get(StorageKey::Collection(kind)).unwrap(), None);
        }
        assert_eq!(store.get(StorageKey::CacheUpdatedAt).unwrap(), None);

        assert!(!mirror.purge_if_stale_at(eight_days_later).unwrap());
    }

    #[test]
    fn test_fresh_cache_survives_check() {
        let (_, _, mirror) = mirror();
        mirror.replace(CollectionKind::Posts, &[json!({"id": 1})]).unwrap();

        let six_days_later = Utc::now() + TimeDelta::days(6);
        assert!(!mirror.purge_if_stale_at(six_days_later).unwrap());
        assert_eq!(mirror.read(CollectionKind::Posts).unwrap().unwrap().len(), 1);
    }

    #[test]
    fn test_unreadable_stamp_is_stale() {
        let (store, _, mirror) = mirror();
        store
            .set_all(&[
                (StorageKey::Collection(CollectionKind::Posts), "[]"),
                (StorageKey::CacheUpdatedAt, "yesterday"),
            ])
            .unwrap();

        assert!(mirror.read(CollectionKind::Posts).unwrap().is_none());
        assert_eq!(store.get(StorageKey::CacheUpdatedAt).unwrap(), None);
    }

    #[test]
    fn test_quoted_stamp_is_accepted() {
        assert_eq!(
            parse_stamp("\"1700000000000\""),
            DateTime::from_timestamp_millis(1_700_000_000_000)
        );
    }

    #[test]
    fn test_status_counts() {
        let (_, _, mirror) = mirror();
        mirror
            .replace(CollectionKind::Products, &[json!({"id": 1}), json!({"id": 2})])
            .unwrap();

        let status = mirror.status().unwrap();
        assert!(status.updated_at.is_some());
        assert_eq!(
            status.expires_at.unwrap() - status.updated_at.unwrap(),
            TimeDelta::days(7)
        );
        assert!(status.counts.contains(&(CollectionKind::Products, Some(2))));
        assert!(status.counts.contains(&(CollectionKind::Posts, None)));
    }
}
