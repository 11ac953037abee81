//! Login, logout and session restore.
//!
//! The session layer is the only writer of credentials besides the refresher.
//! It is also the consumer of [`Signal::ReauthenticateRequired`]: callers that
//! see the signal hand it to [`Session::handle_reauthentication`].

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chinchin_core::{Email, UserProfile, UserRole};
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::config::Endpoints;
use crate::error::ApiError;
use crate::executor::SESSION_EXPIRED;
use crate::normalize::error_message;
use crate::signals::{Notification, Signal, SignalBus};
use crate::store::{CredentialSet, Credentials};

const DEFAULT_MEMBER_NAME: &str = "Member";
const LOGIN_REJECTED: &str = "Invalid email or password";

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    user: Option<LoginUser>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginUser {
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    roles: Vec<String>,
}

/// Outcome of [`Session::restore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoredSession {
    /// Stored credentials are usable.
    Active(UserProfile),
    /// The stored token had expired; credentials were cleared.
    Expired,
    /// Nothing usable was stored.
    Anonymous,
}

/// Login state management for one client.
#[derive(Clone)]
pub struct Session {
    http: reqwest::Client,
    endpoints: Endpoints,
    credentials: Credentials,
    signals: SignalBus,
}

impl Session {
    #[must_use]
    pub const fn new(
        http: reqwest::Client,
        endpoints: Endpoints,
        credentials: Credentials,
        signals: SignalBus,
    ) -> Self {
        Self {
            http,
            endpoints,
            credentials,
            signals,
        }
    }

    /// Authenticate and store the resulting credentials.
    ///
    /// # Errors
    ///
    /// - `ApiError::InvalidInput` if the email is malformed (no request made)
    /// - `ApiError::Application` if the server rejects the login
    /// - `ApiError::Transport` / `ApiError::Timeout` on connectivity failure
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<UserProfile, ApiError> {
        let email = Email::parse(email).map_err(|e| ApiError::InvalidInput(e.to_string()))?;

        let response = self
            .http
            .post(self.endpoints.login())
            .json(&LoginRequest {
                email: email.as_str(),
                password: password.expose_secret(),
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            let message = if status.is_client_error() {
                login_rejection_message(&body)
            } else {
                error_message(status, &body)
            };
            warn!(%status, "login rejected");
            self.signals.notify(Notification::error(message.clone()));
            return Err(ApiError::Application {
                status: status.as_u16(),
                message,
            });
        }

        let login: LoginResponse = serde_json::from_slice(&body)?;
        let access_token = login
            .token
            .or(login.access_token)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::Application {
                status: status.as_u16(),
                message: "Login response did not include a token".to_string(),
            })?;
        let profile = profile_from(login.user, &email);

        self.credentials.save_login(&CredentialSet {
            access_token: SecretString::from(access_token),
            refresh_token: login
                .refresh_token
                .filter(|t| !t.is_empty())
                .map(SecretString::from),
            profile: Some(profile.clone()),
        })?;

        info!(role = ?profile.role, "logged in");
        self.signals.publish(Signal::LoggedIn);
        self.signals
            .notify(Notification::success(format!("Welcome back, {}!", profile.name)));
        Ok(profile)
    }

    /// Clear local credentials, then tell the server. The server call is
    /// best-effort and its failure is ignored.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Store` if credentials could not be cleared.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), ApiError> {
        self.credentials.clear()?;
        info!("logged out");

        if let Err(e) = self.http.post(self.endpoints.logout()).send().await {
            debug!(error = %e, "logout notification failed");
        }
        Ok(())
    }

    /// The stored profile, if any.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Store` if the store cannot be read.
    pub fn current_user(&self) -> Result<Option<UserProfile>, ApiError> {
        Ok(self.credentials.profile()?)
    }

    /// Validate stored credentials at startup.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Store` if the store cannot be read or cleared.
    pub async fn restore(&self) -> Result<RestoredSession, ApiError> {
        self.restore_at(Utc::now()).await
    }

    /// [`restore`](Self::restore) against an explicit clock.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Store` if the store cannot be read or cleared.
    pub async fn restore_at(&self, now: DateTime<Utc>) -> Result<RestoredSession, ApiError> {
        let Some(set) = self.credentials.load()? else {
            return Ok(RestoredSession::Anonymous);
        };
        let Some(profile) = set.profile else {
            return Ok(RestoredSession::Anonymous);
        };

        match token_expiry(set.access_token.expose_secret()) {
            Ok(Some(exp)) if exp < now => {
                info!(%exp, "stored token expired");
                self.logout().await?;
                self.signals.notify(Notification::info(SESSION_EXPIRED));
                Ok(RestoredSession::Expired)
            }
            Ok(_) => Ok(RestoredSession::Active(profile)),
            Err(reason) => {
                warn!(reason, "stored token is unreadable");
                self.logout().await?;
                Ok(RestoredSession::Anonymous)
            }
        }
    }

    /// React to [`Signal::ReauthenticateRequired`] by clearing whatever
    /// credentials are left locally.
    ///
    /// The request that saw the failed refresh has already told the user; the
    /// server-side session is gone, so there is nothing to log out of.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Store` if credentials could not be cleared.
    pub fn handle_reauthentication(&self) -> Result<(), ApiError> {
        self.credentials.clear()?;
        debug!("cleared credentials after failed refresh");
        Ok(())
    }
}

fn login_rejection_message(body: &[u8]) -> String {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_owned))
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| LOGIN_REJECTED.to_string())
}

fn profile_from(user: Option<LoginUser>, login_email: &Email) -> UserProfile {
    let Some(user) = user else {
        return UserProfile {
            name: DEFAULT_MEMBER_NAME.to_string(),
            email: login_email.clone(),
            role: UserRole::User,
        };
    };

    UserProfile {
        name: user
            .full_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MEMBER_NAME.to_string()),
        email: user
            .email
            .and_then(|e| Email::parse(&e).ok())
            .unwrap_or_else(|| login_email.clone()),
        role: UserRole::from_roles(&user.roles),
    }
}

/// The `exp` claim of a JWT, if it has one.
///
/// Signatures are not checked; this only decides whether to bother the server.
fn token_expiry(token: &str) -> Result<Option<DateTime<Utc>>, &'static str> {
    let mut parts = token.split('.');
    let (Some(_), Some(payload), Some(_), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err("not a JWT");
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|_| "payload is not base64url")?;
    let claims: Value = serde_json::from_slice(&bytes).map_err(|_| "payload is not JSON")?;

    let Some(exp) = claims.get("exp") else {
        return Ok(None);
    };
    #[allow(clippy::cast_possible_truncation)]
    let secs = exp
        .as_i64()
        .or_else(|| exp.as_f64().map(|f| f as i64))
        .ok_or("exp is not a number")?;
    DateTime::from_timestamp(secs, 0)
        .map(Some)
        .ok_or("exp is out of range")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn jwt(claims: &Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
        format!("{header}.{payload}.signature")
    }

    #[test]
    fn test_token_expiry() {
        let token = jwt(&serde_json::json!({"sub": "1", "exp": 1_700_000_000}));
        assert_eq!(
            token_expiry(&token).unwrap(),
            DateTime::from_timestamp(1_700_000_000, 0)
        );

        let no_exp = jwt(&serde_json::json!({"sub": "1"}));
        assert_eq!(token_expiry(&no_exp).unwrap(), None);

        assert!(token_expiry("demo-token").is_err());
        assert!(token_expiry("a.!!!.c").is_err());
    }

    #[test]
    fn test_profile_mapping() {
        let login_email = Email::parse("lan@chinchin.vn").unwrap();

        let admin = profile_from(
            Some(LoginUser {
                full_name: Some("Lan Nguyen".to_string()),
                email: Some("lan@chinchin.vn".to_string()),
                roles: vec!["ADMIN".to_string(), "user".to_string()],
            }),
            &login_email,
        );
        assert_eq!(admin.name, "Lan Nguyen");
        assert_eq!(admin.role, UserRole::Admin);

        let member = profile_from(
            Some(LoginUser {
                full_name: None,
                email: None,
                roles: Vec::new(),
            }),
            &login_email,
        );
        assert_eq!(member.name, "Member");
        assert_eq!(member.email, login_email);
        assert_eq!(member.role, UserRole::User);
    }

    #[test]
    fn test_login_rejection_message() {
        assert_eq!(
            login_rejection_message(br#"{"message":"Account locked"}"#),
            "Account locked"
        );
        assert_eq!(login_rejection_message(b""), "Invalid email or password");
    }
}
