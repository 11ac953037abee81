//! Single-flight access token refresh.
//!
//! However many requests hit a 401 at the same moment, one refresh call goes
//! out. The first caller runs it; everyone arriving while it is in flight is
//! queued as a waiter and handed the same outcome when it settles. The queue
//! is drained exactly once per flight, all-success or all-failure.
//!
//! A failed refresh is terminal for the session: credentials are purged and
//! [`Signal::ReauthenticateRequired`] is published, once per flight.

use std::sync::{Mutex, MutexGuard, PoisonError};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::signals::{Signal, SignalBus};
use crate::store::Credentials;

/// Why a refresh did not produce a new access token.
///
/// `Clone` so a single outcome can be delivered to every waiter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RefreshError {
    /// No refresh token is stored; no request was made.
    #[error("No refresh token available")]
    MissingRefreshToken,

    /// The refresh endpoint answered with a non-success status.
    #[error("Refresh rejected with HTTP {0}")]
    Rejected(u16),

    /// The refresh request never got a response (connect error, timeout).
    #[error("Refresh request failed: {0}")]
    Transport(String),

    /// The refresh endpoint answered 2xx without a usable token.
    #[error("Refresh response malformed: {0}")]
    MalformedResponse(String),

    /// Credentials could not be read or written.
    #[error("Credential storage failed: {0}")]
    Storage(String),

    /// The task running the refresh was dropped before it finished.
    #[error("Refresh abandoned before completion")]
    Abandoned,
}

pub type RefreshOutcome = Result<SecretString, RefreshError>;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    access_token: Option<&'a str>,
    refresh_token: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Default)]
struct FlightState {
    in_flight: bool,
    waiters: Vec<oneshot::Sender<RefreshOutcome>>,
}

/// Coordinates refreshes for one client.
///
/// Constructed once by the client and shared by reference; there is no
/// global refresh state.
pub struct TokenRefresher {
    http: reqwest::Client,
    endpoint: Url,
    credentials: Credentials,
    signals: SignalBus,
    state: Mutex<FlightState>,
}

impl TokenRefresher {
    #[must_use]
    pub fn new(
        http: reqwest::Client,
        endpoint: Url,
        credentials: Credentials,
        signals: SignalBus,
    ) -> Self {
        Self {
            http,
            endpoint,
            credentials,
            signals,
            state: Mutex::new(FlightState::default()),
        }
    }

    /// Whether a refresh is currently running.
    #[must_use]
    pub fn in_flight(&self) -> bool {
        self.state().in_flight
    }

    /// Obtain a new access token, joining the in-flight refresh if any.
    ///
    /// # Errors
    ///
    /// Returns the flight's `RefreshError`; every caller of the same flight
    /// gets the same one.
    pub async fn refresh(&self) -> RefreshOutcome {
        let waiter = {
            let mut state = self.state();
            if state.in_flight {
                let (tx, rx) = oneshot::channel();
                state.waiters.push(tx);
                debug!(waiters = state.waiters.len(), "joining in-flight refresh");
                Some(rx)
            } else {
                state.in_flight = true;
                None
            }
        };

        if let Some(rx) = waiter {
            return rx.await.unwrap_or(Err(RefreshError::Abandoned));
        }

        let mut flight = Flight {
            refresher: self,
            settled: false,
        };
        let outcome = self.run().await;
        flight.settle(&outcome);
        outcome
    }

    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn run(&self) -> RefreshOutcome {
        let outcome = self.exchange().await;
        match &outcome {
            Ok(_) => info!("access token refreshed"),
            Err(err) => {
                warn!(error = %err, "refresh failed, ending session");
                if let Err(e) = self.credentials.clear() {
                    warn!(error = %e, "failed to purge credentials");
                }
                self.signals.publish(Signal::ReauthenticateRequired);
            }
        }
        outcome
    }

    async fn exchange(&self) -> RefreshOutcome {
        let storage = |e: crate::store::StoreError| RefreshError::Storage(e.to_string());

        let Some(refresh_token) = self.credentials.refresh_token().map_err(storage)? else {
            return Err(RefreshError::MissingRefreshToken);
        };
        let access_token = self.credentials.access_token().map_err(storage)?;

        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&RefreshRequest {
                access_token: access_token.as_ref().map(|t| t.expose_secret()),
                refresh_token: refresh_token.expose_secret(),
            })
            .send()
            .await
            .map_err(|e| RefreshError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RefreshError::Rejected(status.as_u16()));
        }

        let body: RefreshResponse = response
            .json()
            .await
            .map_err(|e| RefreshError::MalformedResponse(e.to_string()))?;

        let access = body
            .token
            .or(body.access_token)
            .filter(|t| !t.is_empty())
            .map(SecretString::from)
            .ok_or_else(|| RefreshError::MalformedResponse("no access token".to_string()))?;
        let rotated = body
            .refresh_token
            .filter(|t| !t.is_empty())
            .map(SecretString::from);

        self.credentials
            .save_refreshed(&access, rotated.as_ref())
            .map_err(storage)?;
        Ok(access)
    }

    fn state(&self) -> MutexGuard<'_, FlightState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Settles the flight exactly once, even if the leader's future is dropped.
struct Flight<'a> {
    refresher: &'a TokenRefresher,
    settled: bool,
}

impl Flight<'_> {
    fn settle(&mut self, outcome: &RefreshOutcome) {
        if self.settled {
            return;
        }
        self.settled = true;

        let waiters = {
            let mut state = self.refresher.state();
            state.in_flight = false;
            std::mem::take(&mut state.waiters)
        };
        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }
    }
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        self.settle(&Err(RefreshError::Abandoned));
    }
}
