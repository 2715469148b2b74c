//! HTTP client construction
//!
//! A session talks to its pod through two reqwest clients sharing one cookie
//! jar: one follows redirects (ordinary reads and writes), the other does not
//! (sign-in, whose success is signalled by the redirect itself).

use reqwest::Client;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::redirect::Policy;
use std::sync::Arc;
use url::Url;

use crate::{Result, config::HttpSettings};

/// Clients and cookie jar of one logical connection
#[derive(Debug, Clone)]
pub struct HttpClients {
    jar: Arc<Jar>,
    follow: Client,
    no_redirect: Client,
}

impl HttpClients {
    /// Build both clients around a fresh, empty cookie jar
    pub fn build(settings: &HttpSettings) -> Result<Self> {
        let jar = Arc::new(Jar::default());
        let follow = Self::builder(settings, jar.clone())
            .redirect(Policy::limited(10))
            .build()?;
        let no_redirect = Self::builder(settings, jar.clone())
            .redirect(Policy::none())
            .build()?;

        Ok(Self {
            jar,
            follow,
            no_redirect,
        })
    }

    fn builder(settings: &HttpSettings, jar: Arc<Jar>) -> reqwest::ClientBuilder {
        Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(settings.timeout())
            .connect_timeout(settings.connect_timeout())
            .cookie_provider(jar)
    }

    /// Client following redirects
    pub fn follow(&self) -> Client {
        self.follow.clone()
    }

    /// Client returning 3xx responses as they are
    pub fn no_redirect(&self) -> Client {
        self.no_redirect.clone()
    }

    /// `Cookie` header the jar would send to `url`
    pub fn cookie_header(&self, url: &Url) -> Option<String> {
        self.jar
            .cookies(url)
            .and_then(|value| value.to_str().ok().map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fresh_jar_is_empty() {
        let clients = HttpClients::build(&HttpSettings::default()).unwrap();
        let url = Url::parse("https://pod.example.org/").unwrap();
        assert_eq!(clients.cookie_header(&url), None);
    }

    #[tokio::test]
    async fn test_cookie_header_reflects_jar() {
        let clients = HttpClients::build(&HttpSettings::default()).unwrap();
        let url = Url::parse("https://pod.example.org/").unwrap();
        let header = reqwest::header::HeaderValue::from_static("_session=abc; path=/");
        clients.jar.set_cookies(&mut std::iter::once(&header), &url);

        assert_eq!(clients.cookie_header(&url).as_deref(), Some("_session=abc"));
    }
}
