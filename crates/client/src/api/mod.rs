//! Domain API facade and the client that owns every shared component.
//!
//! # Example
//!
//! ```rust,ignore
//! use chinchin_client::{ChinChinClient, ClientConfig};
//!
//! let client = ChinChinClient::new(&ClientConfig::from_env()?)?;
//! let listing = client.products().get_all_or_cached().await?;
//! for product in &listing.items {
//!     println!("{} {}", product.name, product.price);
//! }
//! ```

mod cart;
mod posts;
mod resource;

pub use cart::CartApi;
pub use resource::{Listing, ResourceApi, Source};

use std::sync::Arc;

use chinchin_core::{Category, Post, PostCategory, Product};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::cache::CacheMirror;
use crate::config::{ClientConfig, Endpoints};
use crate::error::ApiError;
use crate::executor::Executor;
use crate::refresh::TokenRefresher;
use crate::session::Session;
use crate::signals::SignalBus;
use crate::store::{CollectionKind, Credentials, FileStore, KeyValueStore};

/// A REST resource exposed under `/api/<PATH>`.
pub trait Resource: Serialize + DeserializeOwned {
    /// Path segment of the collection endpoint.
    const PATH: &'static str;
    /// Cached collection mirrored for this resource, if any.
    const CACHED: Option<CollectionKind>;
}

impl Resource for Product {
    const PATH: &'static str = "products";
    const CACHED: Option<CollectionKind> = Some(CollectionKind::Products);
}

impl Resource for Category {
    const PATH: &'static str = "productCategories";
    const CACHED: Option<CollectionKind> = Some(CollectionKind::Categories);
}

impl Resource for PostCategory {
    const PATH: &'static str = "postCategories";
    const CACHED: Option<CollectionKind> = None;
}

impl Resource for Post {
    const PATH: &'static str = "posts";
    const CACHED: Option<CollectionKind> = Some(CollectionKind::Posts);
}

/// ChinChin API client.
///
/// Cheap to clone; every clone shares one refresher, one store and one
/// signal bus.
#[derive(Clone)]
pub struct ChinChinClient {
    inner: Arc<ChinChinClientInner>,
}

struct ChinChinClientInner {
    endpoints: Endpoints,
    executor: Executor,
    refresher: Arc<TokenRefresher>,
    cache: CacheMirror,
    session: Session,
    signals: SignalBus,
    credentials: Credentials,
}

impl ChinChinClient {
    /// Create a client persisting to the file at `config.store_path`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Config` if the base URL is unusable, or
    /// `ApiError::Transport` if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        Self::with_store(config, Arc::new(FileStore::new(&config.store_path)))
    }

    /// Create a client over an existing store.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Config` if the base URL is unusable, or
    /// `ApiError::Transport` if the HTTP client cannot be built.
    pub fn with_store(
        config: &ClientConfig,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Self, ApiError> {
        let endpoints = Endpoints::new(&config.api_url)?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("chinchin-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let signals = SignalBus::new();
        let credentials = Credentials::new(store.clone());
        let refresher = Arc::new(TokenRefresher::new(
            http.clone(),
            endpoints.refresh(),
            credentials.clone(),
            signals.clone(),
        ));
        let executor = Executor::new(
            http.clone(),
            credentials.clone(),
            refresher.clone(),
            signals.clone(),
        );
        let cache = CacheMirror::new(store, signals.clone(), config.cache_ttl);
        let session = Session::new(http, endpoints.clone(), credentials.clone(), signals.clone());

        Ok(Self {
            inner: Arc::new(ChinChinClientInner {
                endpoints,
                executor,
                refresher,
                cache,
                session,
                signals,
                credentials,
            }),
        })
    }

    #[must_use]
    pub fn products(&self) -> ResourceApi<'_, Product> {
        ResourceApi::new(self)
    }

    #[must_use]
    pub fn categories(&self) -> ResourceApi<'_, Category> {
        ResourceApi::new(self)
    }

    #[must_use]
    pub fn post_categories(&self) -> ResourceApi<'_, PostCategory> {
        ResourceApi::new(self)
    }

    #[must_use]
    pub fn posts(&self) -> ResourceApi<'_, Post> {
        ResourceApi::new(self)
    }

    #[must_use]
    pub const fn cart(&self) -> CartApi<'_> {
        CartApi::new(self)
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    #[must_use]
    pub fn cache(&self) -> &CacheMirror {
        &self.inner.cache
    }

    /// The refresher shared by every request of this client.
    #[must_use]
    pub fn refresher(&self) -> &TokenRefresher {
        &self.inner.refresher
    }

    #[must_use]
    pub fn signals(&self) -> &SignalBus {
        &self.inner.signals
    }

    /// Whether an access token is stored.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Store` if the store cannot be read.
    pub fn is_authenticated(&self) -> Result<bool, ApiError> {
        Ok(self.inner.credentials.access_token()?.is_some())
    }

    pub(crate) fn endpoints(&self) -> &Endpoints {
        &self.inner.endpoints
    }

    pub(crate) fn executor(&self) -> &Executor {
        &self.inner.executor
    }
}
