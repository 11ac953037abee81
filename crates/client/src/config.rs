//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `CHINCHIN_API_URL` - Backend base URL (default: `http://localhost:5000`).
//!   REST endpoints live under `<base>/api/`.
//! - `CHINCHIN_STORE_PATH` - Durable key/value file for tokens and cached
//!   collections (default: `$HOME/.chinchin/store.json`)
//! - `CHINCHIN_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: 30)
//! - `CHINCHIN_CACHE_TTL_DAYS` - Cache freshness window (default: 7)

use std::path::PathBuf;
use std::time::Duration;

use chinchin_core::EntityId;
use chrono::TimeDelta;
use thiserror::Error;
use url::Url;

const DEFAULT_API_URL: &str = "http://localhost:5000";
const DEFAULT_TIMEOUT_SECS: &str = "30";
const DEFAULT_CACHE_TTL_DAYS: &str = "7";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Invalid API base URL {0}: {1}")]
    InvalidBaseUrl(String, String),
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL (without the `/api` suffix)
    pub api_url: Url,
    /// Path of the durable key/value store file
    pub store_path: PathBuf,
    /// Timeout applied to every HTTP request, including refresh calls
    pub request_timeout: Duration,
    /// Maximum age of the cached collections
    pub cache_ttl: TimeDelta,
}

impl ClientConfig {
    /// Configuration pointing at `api_url` with default timeouts and TTL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidBaseUrl` if `api_url` does not parse.
    pub fn new(api_url: &str, store_path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let api_url = Url::parse(api_url)
            .map_err(|e| ConfigError::InvalidBaseUrl(api_url.to_string(), e.to_string()))?;
        Ok(Self {
            api_url,
            store_path: store_path.into(),
            request_timeout: Duration::from_secs(30),
            cache_ttl: TimeDelta::days(7),
        })
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_url = get_env_or_default("CHINCHIN_API_URL", DEFAULT_API_URL);
        let api_url = Url::parse(&api_url)
            .map_err(|e| ConfigError::InvalidEnvVar("CHINCHIN_API_URL".to_string(), e.to_string()))?;

        let store_path = get_optional_env("CHINCHIN_STORE_PATH")
            .map_or_else(default_store_path, PathBuf::from);

        let timeout_secs = get_env_or_default("CHINCHIN_REQUEST_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("CHINCHIN_REQUEST_TIMEOUT_SECS".to_string(), e.to_string())
            })?;

        let ttl_days = get_env_or_default("CHINCHIN_CACHE_TTL_DAYS", DEFAULT_CACHE_TTL_DAYS)
            .parse::<i64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("CHINCHIN_CACHE_TTL_DAYS".to_string(), e.to_string())
            })?;
        let cache_ttl = TimeDelta::try_days(ttl_days).ok_or_else(|| {
            ConfigError::InvalidEnvVar(
                "CHINCHIN_CACHE_TTL_DAYS".to_string(),
                format!("{ttl_days} days is out of range"),
            )
        })?;

        Ok(Self {
            api_url,
            store_path,
            request_timeout: Duration::from_secs(timeout_secs),
            cache_ttl,
        })
    }
}

/// REST endpoint URLs derived from the backend base URL.
#[derive(Debug, Clone)]
pub struct Endpoints {
    api: Url,
}

impl Endpoints {
    /// Build endpoints under `<base>/api/`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidBaseUrl` if `base` is not an http(s) URL
    /// that can carry a path.
    pub fn new(base: &Url) -> Result<Self, ConfigError> {
        if !matches!(base.scheme(), "http" | "https") || base.cannot_be_a_base() {
            return Err(ConfigError::InvalidBaseUrl(
                base.to_string(),
                "expected an http(s) URL".to_string(),
            ));
        }

        let mut api = base.clone();
        api.set_query(None);
        api.set_fragment(None);
        if let Ok(mut path) = api.path_segments_mut() {
            path.pop_if_empty().push("api");
        }
        Ok(Self { api })
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.api.clone();
        // `new` rejected cannot-be-a-base URLs, so this always succeeds.
        if let Ok(mut path) = url.path_segments_mut() {
            path.extend(segments);
        }
        url
    }

    #[must_use]
    pub fn login(&self) -> Url {
        self.url(&["auth", "login"])
    }

    #[must_use]
    pub fn refresh(&self) -> Url {
        self.url(&["auth", "refresh"])
    }

    #[must_use]
    pub fn logout(&self) -> Url {
        self.url(&["auth", "logout"])
    }

    /// Collection URL for a resource path such as `products`.
    #[must_use]
    pub fn collection(&self, resource: &str) -> Url {
        self.url(&[resource])
    }

    /// Item URL for a resource path and id.
    #[must_use]
    pub fn item(&self, resource: &str, id: &EntityId) -> Url {
        self.url(&[resource, &id.as_key()])
    }

    #[must_use]
    pub fn post_rating(&self, id: &EntityId) -> Url {
        self.url(&["posts", &id.as_key(), "rate"])
    }

    #[must_use]
    pub fn cart(&self) -> Url {
        self.url(&["cart"])
    }

    #[must_use]
    pub fn cart_add(&self) -> Url {
        self.url(&["cart", "add"])
    }

    #[must_use]
    pub fn cart_remove(&self, product_id: &EntityId) -> Url {
        self.url(&["cart", "remove", &product_id.as_key()])
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// `$HOME/.chinchin/store.json`, or `./chinchin-store.json` without a home.
fn default_store_path() -> PathBuf {
    get_optional_env("HOME").map_or_else(
        || PathBuf::from("chinchin-store.json"),
        |home| PathBuf::from(home).join(".chinchin").join("store.json"),
    )
}
