//! Response type definitions
//!
//! Responses are read eagerly so callers can inspect status, headers and body
//! without holding on to the connection. A non-2xx status is a normal value.

use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use url::Url;

/// Fully-read pod response
#[derive(Debug, Clone)]
pub struct PodResponse {
    pub status: StatusCode,
    /// Final URL (after any followed redirects)
    pub url: Url,
    pub headers: HeaderMap,
    pub body: String,
}

impl PodResponse {
    /// Read a reqwest response to completion
    pub async fn read(response: reqwest::Response) -> crate::Result<Self> {
        let status = response.status();
        let url = response.url().clone();
        let headers = response.headers().clone();
        let body = response.text().await?;
        Ok(Self {
            status,
            url,
            headers,
            body,
        })
    }

    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn is_redirect(&self) -> bool {
        self.status.is_redirection()
    }

    pub fn text(&self) -> &str {
        &self.body
    }

    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> crate::Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Header value as text, if present and valid
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Redirect target, if any
    pub fn location(&self) -> Option<&str> {
        self.header("location")
    }
}
