//! # Session Module
//!
//! Authenticated HTTP access to one pod.
//!
//! ## Architecture
//!
//! The [`Session`] owns:
//! - the pod base address
//! - a cookie jar shared by a redirect-following and a non-redirecting client
//! - a [`TokenCache`] holding the CSRF token
//! - the login state machine (`Anonymous → Authenticating → Authenticated → LoggedOut`)
//!
//! Write verbs (`post`, `put`, `delete`) carry the cached token in the
//! `x-csrf-token` header unless the caller set that header already; `get`
//! never does. Non-2xx responses are returned as values so each caller can
//! decide which statuses it accepts. Transport failures are returned as
//! [`Error::Transport`] and never retried here.
//!
//! ## Examples
//!
//! ```rust,no_run
//! use diaspora_pod_client::{Credentials, RequestOptions, Session, Settings};
//!
//! # tokio_test::block_on(async {
//! let session = Session::new("pod.example.org", Settings::default())?;
//! session.login(Credentials::new("alice", "secret")).await?;
//!
//! let response = session
//!     .post(
//!         "status_messages",
//!         RequestOptions::new()
//!             .with_header("accept", "application/json")
//!             .with_form([("status_message[text]", "hello"), ("aspect_ids", "public")]),
//!     )
//!     .await?;
//! println!("status: {}", response.status);
//! # Ok::<(), diaspora_pod_client::Error>(())
//! # });
//! ```

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;

use super::extract::{Extractor, user_data_extractors};
use super::network::HttpClients;
use super::token::{PageSource, TokenCache};
use crate::{
    Error, Result,
    config::Settings,
    types::{Credentials, PodResponse, RequestBody, RequestOptions},
    utils::url::{normalize_pod_url, resolve as resolve_path},
};

/// Login state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticating,
    Authenticated,
    LoggedOut,
}

/// Authenticated connection to a pod
#[derive(Debug)]
pub struct Session {
    /// Configuration settings
    settings: Arc<Settings>,
    /// Pod base address
    base_url: RwLock<Url>,
    /// HTTP clients and their cookie jar; replaced wholesale on logout
    http: RwLock<HttpClients>,
    /// CSRF token cache
    token_cache: TokenCache,
    state: RwLock<SessionState>,
    /// Kept in memory for re-authentication only
    credentials: RwLock<Option<Credentials>>,
    user_extractors: Vec<Box<dyn Extractor>>,
}

impl Session {
    /// Creates an anonymous session for `pod`.
    ///
    /// A bare host is upgraded to `{default_scheme}://host`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use diaspora_pod_client::{Session, Settings};
    ///
    /// # tokio_test::block_on(async {
    /// let session = Session::new("pod.example.org", Settings::default()).unwrap();
    /// assert_eq!(session.base_url().await.as_str(), "https://pod.example.org/");
    /// # });
    /// ```
    pub fn new(pod: &str, settings: Settings) -> Result<Self> {
        settings.validate()?;
        let base_url = normalize_pod_url(pod, &settings.http.default_scheme)?;
        let http = HttpClients::build(&settings.http)?;
        let token_cache = TokenCache::new(settings.token.source.clone());

        Ok(Self {
            settings: Arc::new(settings),
            base_url: RwLock::new(base_url),
            http: RwLock::new(http),
            token_cache,
            state: RwLock::new(SessionState::Anonymous),
            credentials: RwLock::new(None),
            user_extractors: user_data_extractors(),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub async fn base_url(&self) -> Url {
        self.base_url.read().await.clone()
    }

    pub async fn state(&self) -> SessionState {
        *self.state.read().await
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state().await == SessionState::Authenticated
    }

    /// CSRF token, refreshed from the configured source when `force_refresh`
    /// is set or nothing is cached yet
    pub async fn token(&self, force_refresh: bool) -> Result<String> {
        self.token_cache.fetch(self, force_refresh).await
    }

    /// Refresh the CSRF token from `source` for this call only
    pub async fn token_from(&self, source: &str) -> Result<String> {
        self.token_cache.fetch_from(self, source).await
    }

    /// Cached CSRF token without network access
    pub async fn cached_token(&self) -> Option<String> {
        self.token_cache.cached().await
    }

    /// Cookies the session would send to its pod
    pub async fn cookie_header(&self) -> Option<String> {
        let base = self.base_url().await;
        self.http.read().await.cookie_header(&base)
    }

    /// Log in with `credentials`.
    ///
    /// The sign-in form is posted without following redirects; only a 3xx
    /// answer that does not send us back to the sign-in page counts as
    /// success. On failure the session is left anonymous.
    pub async fn login(&self, credentials: Credentials) -> Result<()> {
        if !credentials.is_complete() {
            return Err(Error::login_required("username and password are required"));
        }

        self.set_state(SessionState::Authenticating).await;
        info!("Logging in to {} as {}", self.base_url().await, credentials.username());

        match self.authenticate(&credentials).await {
            Ok(()) => {
                *self.credentials.write().await = Some(credentials);
                self.set_state(SessionState::Authenticated).await;
                info!("Login successful");
                Ok(())
            }
            Err(e) => {
                warn!("Login failed: {}", e);
                self.set_state(SessionState::Anonymous).await;
                Err(e)
            }
        }
    }

    /// Log in again with the credentials of the last successful login
    pub async fn relogin(&self) -> Result<()> {
        let credentials = self
            .credentials
            .read()
            .await
            .clone()
            .ok_or_else(|| Error::login_required("no credentials to log in again with"))?;
        self.login(credentials).await
    }

    /// Move this session to another pod and log in there with the
    /// remembered credentials. Cookies and token of the old pod are dropped.
    pub async fn switch_pod(&self, pod: &str) -> Result<()> {
        let credentials = self
            .credentials
            .read()
            .await
            .clone()
            .ok_or_else(|| Error::login_required("no credentials to log in to another pod"))?;

        let base_url = normalize_pod_url(pod, &self.settings.http.default_scheme)?;
        info!("Switching pod to {}", base_url);

        self.reset_connection().await?;
        *self.base_url.write().await = base_url;
        self.set_state(SessionState::Anonymous).await;

        self.login(credentials).await
    }

    /// Sign out, then forget token, cookies and credentials.
    ///
    /// Local state is cleared even when the sign-out request fails; the
    /// failure is still returned.
    pub async fn logout(&self) -> Result<()> {
        let outcome = self.sign_out().await;

        self.reset_connection().await?;
        *self.credentials.write().await = None;
        self.set_state(SessionState::LoggedOut).await;
        info!("Logged out");

        if let Err(e) = &outcome {
            warn!("Sign-out request failed: {}", e);
        }
        outcome
    }

    /// GET `path`. No token is attached.
    pub async fn get(&self, path: &str, options: RequestOptions) -> Result<PodResponse> {
        self.send(Method::GET, path, options).await
    }

    /// POST to `path` with the CSRF token attached
    pub async fn post(&self, path: &str, options: RequestOptions) -> Result<PodResponse> {
        self.send(Method::POST, path, options).await
    }

    /// PUT to `path` with the CSRF token attached
    pub async fn put(&self, path: &str, options: RequestOptions) -> Result<PodResponse> {
        self.send(Method::PUT, path, options).await
    }

    /// DELETE `path` with the CSRF token attached
    pub async fn delete(&self, path: &str, options: RequestOptions) -> Result<PodResponse> {
        self.send(Method::DELETE, path, options).await
    }

    /// Attributes of the logged-in user as embedded in the bookmarklet page
    pub async fn user_info(&self) -> Result<Value> {
        let path = &self.settings.session.user_info_path;
        let response = self.get(path, RequestOptions::new()).await?;

        for extractor in &self.user_extractors {
            let Some(raw) = extractor.extract(&response.body) else {
                continue;
            };
            match serde_json::from_str::<Value>(&raw) {
                Ok(data) => return Ok(data),
                Err(e) => debug!("{} matched but is not JSON: {}", extractor.name(), e),
            }
        }

        Err(Error::user_data(format!(
            "no user data found on {} (status {})",
            path,
            response.status_code()
        )))
    }

    // Private helper methods...

    async fn set_state(&self, state: SessionState) {
        *self.state.write().await = state;
    }

    /// Fresh cookie jar and clients, no cached token
    async fn reset_connection(&self) -> Result<()> {
        let clients = HttpClients::build(&self.settings.http)?;
        *self.http.write().await = clients;
        self.token_cache.invalidate().await;
        Ok(())
    }

    async fn sign_out(&self) -> Result<()> {
        let url = self.resolve(&self.settings.session.sign_out_path, false).await?;
        let client = self.http.read().await.no_redirect();
        client.get(url).send().await?;
        Ok(())
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<()> {
        let token = self.token_cache.fetch(self, true).await?;
        let sign_in = &self.settings.session.sign_in_path;
        let url = self.resolve(sign_in, false).await?;

        let form = [
            ("user[username]", credentials.username()),
            ("user[password]", credentials.password()),
            ("user[remember_me]", "1"),
            ("utf8", "✓"),
            ("authenticity_token", token.as_str()),
            ("commit", "Sign in"),
        ];

        let client = self.http.read().await.no_redirect();
        let response = client
            .post(url)
            .header(ACCEPT, "text/html")
            .form(&form[..])
            .send()
            .await?;

        let status = response.status();
        if !status.is_redirection() {
            return Err(Error::login(
                status.as_u16(),
                format!("sign-in answered {} instead of a redirect", status.as_u16()),
            ));
        }

        let bounced = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|location| location.contains(sign_in.as_str()));
        if bounced {
            return Err(Error::login(
                status.as_u16(),
                "credentials rejected, redirected back to sign-in",
            ));
        }

        // The pod issues a new token for the authenticated session
        self.token_cache.invalidate().await;
        self.token_cache.fetch(self, true).await?;
        Ok(())
    }

    async fn resolve(&self, path: &str, absolute: bool) -> Result<Url> {
        if absolute {
            return Ok(Url::parse(path)?);
        }
        resolve_path(&*self.base_url.read().await, path)
    }

    async fn send(&self, method: Method, path: &str, options: RequestOptions) -> Result<PodResponse> {
        let url = self.resolve(path, options.absolute).await?;
        let mut headers = header_map(&options.headers)?;

        if method != Method::GET {
            if self.state().await == SessionState::LoggedOut {
                return Err(Error::login_required(
                    "session is logged out, log in again before writing",
                ));
            }
            let token_header = &self.settings.token.header;
            if !options.has_header(token_header) {
                let token = self.token_cache.fetch(self, false).await?;
                let name = HeaderName::from_bytes(token_header.as_bytes())
                    .map_err(|e| Error::config(format!("Invalid token header name: {}", e)))?;
                let value = HeaderValue::from_str(&token)
                    .map_err(|_| Error::token("cached token is not a valid header value"))?;
                headers.insert(name, value);
            }
        }

        debug!("{} {}", method, url);
        let client: Client = self.http.read().await.follow();
        let mut builder = client.request(method.clone(), url).headers(headers);

        if !options.params.is_empty() {
            builder = builder.query(&options.params);
        }

        if method != Method::GET {
            let caller_content_type = options.has_header(CONTENT_TYPE.as_str());
            builder = match options.body {
                Some(RequestBody::Form(fields)) => builder.form(&fields),
                Some(RequestBody::Json(value)) => builder.json(&value),
                Some(RequestBody::Raw {
                    content_type,
                    bytes,
                }) => {
                    if caller_content_type {
                        builder.body(bytes)
                    } else {
                        builder.header(CONTENT_TYPE, content_type).body(bytes)
                    }
                }
                None => builder,
            };
        }

        let response = PodResponse::read(builder.send().await?).await?;
        debug!("{} answered {}", response.url, response.status);
        Ok(response)
    }
}

#[async_trait]
impl PageSource for Session {
    async fn fetch_page(&self, path: &str) -> Result<String> {
        let response = self.get(path, RequestOptions::new()).await?;
        if !response.is_success() {
            debug!("Token source {} answered {}", path, response.status);
        }
        Ok(response.body)
    }
}

fn header_map(headers: &[(String, String)]) -> Result<HeaderMap> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::config(format!("Invalid header name {}: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| Error::config(format!("Invalid value for header {}: {}", name, e)))?;
        map.append(name, value);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_session_creation() {
        let session = Session::new("pod.example.org", Settings::default()).unwrap();
        assert_eq!(session.state().await, SessionState::Anonymous);
        assert_eq!(session.base_url().await.as_str(), "https://pod.example.org/");
        assert_eq!(session.cached_token().await, None);
        assert!(!session.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_session_rejects_invalid_settings() {
        let mut settings = Settings::default();
        settings.token.source = String::new();
        assert!(matches!(
            Session::new("pod.example.org", settings),
            Err(Error::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_login_without_password_makes_no_request() {
        let session = Session::new("pod.example.org", Settings::default()).unwrap();
        let err = session
            .login(Credentials::new("alice", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Login { status: None, .. }));
        assert_eq!(session.state().await, SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_relogin_without_credentials() {
        let session = Session::new("pod.example.org", Settings::default()).unwrap();
        assert!(matches!(
            session.relogin().await,
            Err(Error::Login { status: None, .. })
        ));
        assert!(session.switch_pod("other.example.org").await.is_err());
    }

    #[tokio::test]
    async fn test_resolve_absolute_and_relative() {
        let session = Session::new("https://pod.example.org", Settings::default()).unwrap();
        assert_eq!(
            session.resolve("stream.json", false).await.unwrap().as_str(),
            "https://pod.example.org/stream.json"
        );
        assert_eq!(
            session
                .resolve("https://other.example.net/u/bob.json", true)
                .await
                .unwrap()
                .as_str(),
            "https://other.example.net/u/bob.json"
        );
    }

    #[test]
    fn test_header_map_rejects_bad_names() {
        let headers = vec![("bad header".to_string(), "x".to_string())];
        assert!(header_map(&headers).is_err());

        let headers = vec![
            ("accept".to_string(), "application/json".to_string()),
            ("x-csrf-token".to_string(), "abc".to_string()),
        ];
        assert_eq!(header_map(&headers).unwrap().len(), 2);
    }
}
