//! CSRF token cache
//!
//! Keeps the anti-forgery token of one session and refreshes it by scraping a
//! pod page. Refreshing prefers availability over freshness: when the pod
//! cannot be reached, or the page carries no recognisable token, a previously
//! cached token is handed out again. Write endpoints reject a stale token with
//! an ordinary error status, which the caller sees as a normal response.

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::extract::{Extractor, extract_first, token_extractors};
use crate::{Error, Result};

/// Something that can return the body of a pod page
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Body of the page at `path`, whatever its status
    async fn fetch_page(&self, path: &str) -> Result<String>;
}

/// Cached anti-forgery token with an ordered list of extractors
#[derive(Debug)]
pub struct TokenCache {
    cached: RwLock<Option<String>>,
    default_source: String,
    extractors: Vec<Box<dyn Extractor>>,
}

impl TokenCache {
    /// Cache refreshing from `default_source` with the built-in extractors
    pub fn new(default_source: impl Into<String>) -> Self {
        Self::with_extractors(default_source, token_extractors())
    }

    /// Cache with a custom extractor order
    pub fn with_extractors(
        default_source: impl Into<String>,
        extractors: Vec<Box<dyn Extractor>>,
    ) -> Self {
        Self {
            cached: RwLock::new(None),
            default_source: default_source.into(),
            extractors,
        }
    }

    pub fn default_source(&self) -> &str {
        &self.default_source
    }

    /// Currently cached token, without any network access
    pub async fn cached(&self) -> Option<String> {
        self.cached.read().await.clone()
    }

    /// Drop the cached token so nothing stale can be reused
    pub async fn invalidate(&self) {
        *self.cached.write().await = None;
    }

    /// Return the cached token, refreshing from the default source when
    /// `force_refresh` is set or nothing is cached yet.
    pub async fn fetch(&self, pages: &dyn PageSource, force_refresh: bool) -> Result<String> {
        if !force_refresh && let Some(token) = self.cached().await {
            return Ok(token);
        }
        self.refresh(pages, &self.default_source).await
    }

    /// Refresh from `source` for this call only; later refreshes use the default source again
    pub async fn fetch_from(&self, pages: &dyn PageSource, source: &str) -> Result<String> {
        self.refresh(pages, source).await
    }

    async fn refresh(&self, pages: &dyn PageSource, source: &str) -> Result<String> {
        debug!("Refreshing CSRF token from {}", source);

        let body = match pages.fetch_page(source).await {
            Ok(body) => body,
            Err(e) if e.is_transport() => {
                return self
                    .fall_back(format!("could not load {}: {}", source, e))
                    .await;
            }
            Err(e) => return Err(e),
        };

        match extract_first(&self.extractors, &body) {
            Some((format, token)) => {
                debug!("CSRF token found using {} format", format);
                *self.cached.write().await = Some(token.clone());
                Ok(token)
            }
            None => {
                self.fall_back(format!("no CSRF token found on {}", source))
                    .await
            }
        }
    }

    async fn fall_back(&self, reason: String) -> Result<String> {
        match self.cached().await {
            Some(token) => {
                warn!("{}, reusing previous token", reason);
                Ok(token)
            }
            None => Err(Error::token(format!(
                "{} and no previous token to reuse",
                reason
            ))),
        }
    }
}
