//! ChinChin storefront API client.
//!
//! Issues authenticated REST calls to the ChinChin backend, refreshes expired
//! access tokens with one refresh call no matter how many requests hit a 401
//! at once, replays the failed requests, and keeps a best-effort local mirror
//! of the catalog and blog for offline display.
//!
//! Start from [`ChinChinClient`]; subscribe to [`SignalBus`] for session
//! expiry, cache changes and user-facing notifications.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod executor;
pub mod normalize;
pub mod refresh;
pub mod session;
pub mod signals;
pub mod store;

pub use api::{CartApi, ChinChinClient, Listing, Resource, ResourceApi, Source};
pub use cache::{CacheMirror, CacheStatus, Patch};
pub use config::{ClientConfig, ConfigError, Endpoints};
pub use error::ApiError;
pub use executor::{ApiRequest, AuthMode, Executor};
pub use refresh::{RefreshError, TokenRefresher};
pub use session::{RestoredSession, Session};
pub use signals::{Notification, NotifyLevel, Signal, SignalBus};
pub use store::{
    CollectionKind, CredentialSet, Credentials, FileStore, KeyValueStore, MemoryStore, StorageKey,
    StoreError,
};
