//! Authenticated request execution.
//!
//! One call to [`Executor::execute`] issues the request, and on a 401 asks the
//! shared [`TokenRefresher`] for a new token and replays the request once.
//! The access token is read from the credential store on every attempt so a
//! refresh finished by another task is picked up immediately.

use std::sync::Arc;

use reqwest::Method;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{debug, error, instrument, warn};
use url::Url;

use crate::error::ApiError;
use crate::normalize::{Outcome, classify};
use crate::refresh::TokenRefresher;
use crate::signals::{Notification, SignalBus};
use crate::store::Credentials;

pub(crate) const LOGIN_REQUIRED: &str = "Please log in to continue.";
pub(crate) const SESSION_EXPIRED: &str = "Your session has expired. Please log in again.";
const CONNECTION_FAILED: &str = "Unable to reach the server. Please check your connection.";

/// Whether a request may go out without an access token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthMode {
    /// Send the token if there is one; anonymous otherwise.
    #[default]
    Optional,
    /// Fail with [`ApiError::Unauthorized`] before any I/O if there is no token.
    Required,
}

/// A request as the facade describes it. Replays reuse it unchanged.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: Url,
    pub body: Option<Value>,
    /// Extra headers; these win over the defaults on conflict.
    pub headers: HeaderMap,
    pub auth: AuthMode,
    /// Skip the error notification on failure; the caller reports it.
    pub quiet: bool,
}

impl ApiRequest {
    #[must_use]
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            body: None,
            headers: HeaderMap::new(),
            auth: AuthMode::Optional,
            quiet: false,
        }
    }

    #[must_use]
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    #[must_use]
    pub fn post(url: Url, body: Value) -> Self {
        Self::new(Method::POST, url).with_body(body)
    }

    #[must_use]
    pub fn put(url: Url, body: Value) -> Self {
        Self::new(Method::PUT, url).with_body(body)
    }

    #[must_use]
    pub fn delete(url: Url) -> Self {
        Self::new(Method::DELETE, url)
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub const fn require_auth(mut self) -> Self {
        self.auth = AuthMode::Required;
        self
    }

    #[must_use]
    pub const fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }
}

/// Issues [`ApiRequest`]s with the current credentials.
#[derive(Clone)]
pub struct Executor {
    http: reqwest::Client,
    credentials: Credentials,
    refresher: Arc<TokenRefresher>,
    signals: SignalBus,
}

impl Executor {
    #[must_use]
    pub const fn new(
        http: reqwest::Client,
        credentials: Credentials,
        refresher: Arc<TokenRefresher>,
        signals: SignalBus,
    ) -> Self {
        Self {
            http,
            credentials,
            refresher,
            signals,
        }
    }

    /// Execute a request, refreshing and replaying once on a 401.
    ///
    /// Returns the JSON body, `Value::Bool(true)` for 204, or `{}` for a 2xx
    /// body that is not JSON.
    ///
    /// # Errors
    ///
    /// - `ApiError::Unauthorized` if there is no usable session
    /// - `ApiError::Application` for any other non-success status
    /// - `ApiError::Transport` / `ApiError::Timeout` if no response arrived
    #[instrument(skip_all, fields(method = %request.method, url = %request.url))]
    pub async fn execute(&self, request: &ApiRequest) -> Result<Value, ApiError> {
        let token = self.credentials.access_token()?;
        if token.is_none() && request.auth == AuthMode::Required {
            debug!("no access token for authenticated request");
            self.signals.notify(Notification::info(LOGIN_REQUIRED));
            return Err(ApiError::Unauthorized);
        }

        let first = self.send(request, token.as_ref()).await?;
        if first != Outcome::Unauthorized {
            return self.finish(request, first);
        }

        let Some(sent) = token else {
            self.signals.notify(Notification::info(LOGIN_REQUIRED));
            return Err(ApiError::Unauthorized);
        };

        // Another task may have refreshed or ended the session while this
        // request was in flight.
        match self.credentials.access_token()? {
            Some(current) if current.expose_secret() != sent.expose_secret() => {
                debug!("token rotated by another request, replaying");
            }
            Some(_) => {
                debug!("access token rejected, refreshing");
                if let Err(err) = self.refresher.refresh().await {
                    debug!(error = %err, "refresh failed");
                    self.signals.notify(Notification::info(SESSION_EXPIRED));
                    return Err(ApiError::Unauthorized);
                }
            }
            None => {
                self.signals.notify(Notification::info(SESSION_EXPIRED));
                return Err(ApiError::Unauthorized);
            }
        }

        // A logout may have landed while the refresh settled.
        let Some(token) = self.credentials.access_token()? else {
            self.signals.notify(Notification::info(SESSION_EXPIRED));
            return Err(ApiError::Unauthorized);
        };

        let replay = self.send(request, Some(&token)).await?;
        if replay == Outcome::Unauthorized {
            warn!("refreshed token rejected, giving up");
            self.signals.notify(Notification::info(SESSION_EXPIRED));
            return Err(ApiError::Unauthorized);
        }
        self.finish(request, replay)
    }

    async fn send(
        &self,
        request: &ApiRequest,
        token: Option<&SecretString>,
    ) -> Result<Outcome, ApiError> {
        let headers = build_headers(request, token)?;
        let mut builder = self
            .http
            .request(request.method.clone(), request.url.clone())
            .headers(headers);
        if let Some(body) = &request.body {
            builder = builder.body(serde_json::to_vec(body)?);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => return Err(self.transport_failure(request, e)),
        };
        let status = response.status();
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => return Err(self.transport_failure(request, e)),
        };
        debug!(%status, bytes = body.len(), "response received");

        Ok(classify(status, &body))
    }

    fn finish(&self, request: &ApiRequest, outcome: Outcome) -> Result<Value, ApiError> {
        match outcome {
            Outcome::Success(value) => Ok(value),
            Outcome::NoContent => Ok(Value::Bool(true)),
            Outcome::Unauthorized => Err(ApiError::Unauthorized),
            Outcome::Failure { status, message } => {
                error!(
                    status,
                    method = %request.method,
                    url = %request.url,
                    message = %message,
                    "API request failed"
                );
                if !request.quiet {
                    self.signals.notify(Notification::error(message.clone()));
                }
                Err(ApiError::Application { status, message })
            }
        }
    }

    fn transport_failure(&self, request: &ApiRequest, err: reqwest::Error) -> ApiError {
        error!(error = %err, "request did not complete");
        if !request.quiet {
            self.signals.notify(Notification::error(CONNECTION_FAILED));
        }
        err.into()
    }
}

fn build_headers(request: &ApiRequest, token: Option<&SecretString>) -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    if let Some(token) = token {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
            .map_err(|_| ApiError::InvalidInput("stored access token is not a valid header".to_string()))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    for (name, value) in &request.headers {
        headers.insert(name.clone(), value.clone());
    }
    Ok(headers)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request() -> ApiRequest {
        ApiRequest::get(Url::parse("http://localhost/api/products").unwrap())
    }

    #[test]
    fn test_headers_include_json_and_bearer() {
        let token = SecretString::from("abc");
        let headers = build_headers(&request(), Some(&token)).unwrap();

        assert_eq!(headers[CONTENT_TYPE], "application/json");
        assert_eq!(headers[AUTHORIZATION], "Bearer abc");
        assert!(headers[AUTHORIZATION].is_sensitive());
    }

    #[test]
    fn test_anonymous_headers_have_no_authorization() {
        let headers = build_headers(&request(), None).unwrap();
        assert!(!headers.contains_key(AUTHORIZATION));
    }

    #[test]
    fn test_caller_headers_take_precedence() {
        let request = request()
            .with_header(CONTENT_TYPE, HeaderValue::from_static("text/plain"))
            .with_header(
                HeaderName::from_static("x-request-id"),
                HeaderValue::from_static("42"),
            );
        let headers = build_headers(&request, None).unwrap();

        assert_eq!(headers[CONTENT_TYPE], "text/plain");
        assert_eq!(headers["x-request-id"], "42");
    }

    #[test]
    fn test_invalid_token_is_rejected_locally() {
        let token = SecretString::from("bad\ntoken");
        assert!(matches!(
            build_headers(&request(), Some(&token)),
            Err(ApiError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_request_builders() {
        let url = Url::parse("http://localhost/api/cart/add").unwrap();
        let request = ApiRequest::post(url, serde_json::json!({"productId": 1})).require_auth();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.auth, AuthMode::Required);
        assert!(request.body.is_some());
        assert!(!request.quiet);
        assert!(request.quiet().quiet);
    }
}
