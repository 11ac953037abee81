//! Typed view of the credential keys.

use std::fmt;
use std::sync::Arc;

use chinchin_core::UserProfile;
use secrecy::{ExposeSecret, SecretString};
use tracing::warn;

use super::{KeyValueStore, StorageKey, StoreError};

/// Tokens and profile of the signed-in user.
#[derive(Clone)]
pub struct CredentialSet {
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
    pub profile: Option<UserProfile>,
}

impl fmt::Debug for CredentialSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSet")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("profile", &self.profile)
            .finish()
    }
}

/// Reads and writes the credential keys of a [`KeyValueStore`].
///
/// Writers are limited to login, refresh and logout; each one lands as a
/// single batch so readers never observe a mixed generation of tokens.
#[derive(Clone)]
pub struct Credentials {
    store: Arc<dyn KeyValueStore>,
}

impl Credentials {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Current access token. Empty strings count as absent.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store cannot be read.
    pub fn access_token(&self) -> Result<Option<SecretString>, StoreError> {
        self.secret(StorageKey::AccessToken)
    }

    /// Current refresh token. Empty strings count as absent.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store cannot be read.
    pub fn refresh_token(&self) -> Result<Option<SecretString>, StoreError> {
        self.secret(StorageKey::RefreshToken)
    }

    /// Cached profile. An unreadable profile is logged and reported as absent.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store cannot be read.
    pub fn profile(&self) -> Result<Option<UserProfile>, StoreError> {
        let Some(raw) = self.store.get(StorageKey::UserProfile)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(profile) => Ok(Some(profile)),
            Err(e) => {
                warn!(error = %e, "stored user profile is unreadable");
                Ok(None)
            }
        }
    }

    /// Everything stored, if there is an access token at all.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store cannot be read.
    pub fn load(&self) -> Result<Option<CredentialSet>, StoreError> {
        let Some(access_token) = self.access_token()? else {
            return Ok(None);
        };
        Ok(Some(CredentialSet {
            access_token,
            refresh_token: self.refresh_token()?,
            profile: self.profile()?,
        }))
    }

    /// Replace all credentials after a login.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store cannot be written.
    pub fn save_login(&self, set: &CredentialSet) -> Result<(), StoreError> {
        let profile = set
            .profile
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let mut entries = vec![(StorageKey::AccessToken, set.access_token.expose_secret())];
        if let Some(refresh) = &set.refresh_token {
            entries.push((StorageKey::RefreshToken, refresh.expose_secret()));
        }
        if let Some(profile) = &profile {
            entries.push((StorageKey::UserProfile, profile.as_str()));
        }

        // Keys this login does not carry must not survive from the previous
        // session.
        self.store.write_batch(&entries, &StorageKey::CREDENTIALS)
    }

    /// Store a refreshed access token, and the rotated refresh token if the
    /// server issued one. Both land in one write.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store cannot be written.
    pub fn save_refreshed(
        &self,
        access_token: &SecretString,
        refresh_token: Option<&SecretString>,
    ) -> Result<(), StoreError> {
        let mut entries = vec![(StorageKey::AccessToken, access_token.expose_secret())];
        if let Some(refresh) = refresh_token {
            entries.push((StorageKey::RefreshToken, refresh.expose_secret()));
        }
        self.store.set_all(&entries)
    }

    /// Remove access token, refresh token and profile in one write.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store cannot be written.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.store.remove_all(&StorageKey::CREDENTIALS)
    }

    fn secret(&self, key: StorageKey) -> Result<Option<SecretString>, StoreError> {
        Ok(self
            .store
            .get(key)?
            .filter(|value| !value.is_empty())
            .map(SecretString::from))
    }
}
