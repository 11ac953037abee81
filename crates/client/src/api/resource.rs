//! Generic CRUD over a [`Resource`].

use std::marker::PhantomData;

use chinchin_core::EntityId;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::{ChinChinClient, Resource};
use crate::cache::Patch;
use crate::error::ApiError;
use crate::executor::ApiRequest;
use crate::normalize::extract_list;

/// Where a listing came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Live,
    /// The live fetch failed; these are the last cached records.
    Cached,
}

/// Records plus their provenance.
#[derive(Debug, Clone)]
pub struct Listing<R> {
    pub items: Vec<R>,
    pub source: Source,
}

impl<R> Listing<R> {
    #[must_use]
    pub const fn is_offline(&self) -> bool {
        matches!(self.source, Source::Cached)
    }
}

/// CRUD operations for one resource kind.
pub struct ResourceApi<'a, R> {
    client: &'a ChinChinClient,
    _resource: PhantomData<fn() -> R>,
}

impl<'a, R: Resource> ResourceApi<'a, R> {
    pub(super) const fn new(client: &'a ChinChinClient) -> Self {
        Self {
            client,
            _resource: PhantomData,
        }
    }

    pub(super) const fn client(&self) -> &'a ChinChinClient {
        self.client
    }

    /// Fetch the whole collection and mirror it in the cache.
    ///
    /// Records that do not match `R` are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self), fields(resource = R::PATH))]
    pub async fn get_all(&self) -> Result<Vec<R>, ApiError> {
        let url = self.client.endpoints().collection(R::PATH);
        let payload = self.client.executor().execute(&ApiRequest::get(url)).await?;
        let raw = extract_list(payload);

        if let Some(kind) = R::CACHED
            && let Err(e) = self.client.cache().replace(kind, &raw)
        {
            warn!(%kind, error = %e, "failed to update cache");
        }

        Ok(decode_all(raw))
    }

    /// Like [`get_all`](Self::get_all), but falls back to the cached
    /// collection when the live fetch fails and a fresh copy is cached.
    ///
    /// # Errors
    ///
    /// Returns the live fetch's `ApiError` if nothing usable is cached.
    pub async fn get_all_or_cached(&self) -> Result<Listing<R>, ApiError> {
        let err = match self.get_all().await {
            Ok(items) => {
                return Ok(Listing {
                    items,
                    source: Source::Live,
                });
            }
            Err(err) => err,
        };

        match self.cached()? {
            Some(items) => {
                warn!(resource = R::PATH, error = %err, "serving cached records");
                Ok(Listing {
                    items,
                    source: Source::Cached,
                })
            }
            None => Err(err),
        }
    }

    /// Cached records, if this resource is mirrored and the cache is fresh.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Store` if the store cannot be read.
    pub fn cached(&self) -> Result<Option<Vec<R>>, ApiError> {
        let Some(kind) = R::CACHED else {
            return Ok(None);
        };
        Ok(self.client.cache().read(kind)?.map(decode_all))
    }

    /// Fetch one record.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Parse` if the body is not a valid record, or the
    /// request's `ApiError`.
    #[instrument(skip(self), fields(resource = R::PATH, %id))]
    pub async fn get_one(&self, id: &EntityId) -> Result<R, ApiError> {
        let url = self.client.endpoints().item(R::PATH, id);
        let payload = self.client.executor().execute(&ApiRequest::get(url)).await?;
        Ok(serde_json::from_value(payload)?)
    }

    /// Create a record. Returns the server's copy when it sent one back.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self, data), fields(resource = R::PATH))]
    pub async fn create<B: Serialize + ?Sized>(&self, data: &B) -> Result<Option<R>, ApiError> {
        let url = self.client.endpoints().collection(R::PATH);
        let created = self
            .client
            .executor()
            .execute(&ApiRequest::post(url, serde_json::to_value(data)?))
            .await?;

        if EntityId::of_record(&created).is_some() {
            self.patch_cache(Patch::Insert(created.clone()));
        }
        Ok(decode_optional(created))
    }

    /// Update a record; fields not sent are left as they are.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self, data), fields(resource = R::PATH, %id))]
    pub async fn update<B: Serialize + ?Sized>(
        &self,
        id: &EntityId,
        data: &B,
    ) -> Result<Option<R>, ApiError> {
        let url = self.client.endpoints().item(R::PATH, id);
        let updated = self
            .client
            .executor()
            .execute(&ApiRequest::put(url, serde_json::to_value(data)?))
            .await?;

        if EntityId::of_record(&updated).is_some() {
            self.patch_cache(Patch::Merge(updated.clone()));
        }
        Ok(decode_optional(updated))
    }

    /// Delete a record.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self), fields(resource = R::PATH, %id))]
    pub async fn delete(&self, id: &EntityId) -> Result<(), ApiError> {
        let url = self.client.endpoints().item(R::PATH, id);
        self.client
            .executor()
            .execute(&ApiRequest::delete(url))
            .await?;

        self.patch_cache(Patch::Remove(id.clone()));
        Ok(())
    }

    fn patch_cache(&self, patch: Patch) {
        let Some(kind) = R::CACHED else {
            return;
        };
        match self.client.cache().patch(kind, patch) {
            Ok(applied) => debug!(%kind, applied, "cache patched"),
            Err(e) => warn!(%kind, error = %e, "failed to patch cache"),
        }
    }
}

fn decode_all<R: DeserializeOwned>(raw: Vec<Value>) -> Vec<R> {
    raw.into_iter()
        .filter_map(|value| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(error = %e, "skipping malformed record");
                None
            }
        })
        .collect()
}

fn decode_optional<R: DeserializeOwned>(value: Value) -> Option<R> {
    serde_json::from_value(value).ok()
}
