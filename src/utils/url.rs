//! Pod address handling

use crate::{Error, Result};
use url::Url;

/// Parse a pod address, prepending `default_scheme` when the caller gave a
/// bare host such as `pod.example.org`.
pub fn normalize_pod_url(pod: &str, default_scheme: &str) -> Result<Url> {
    let pod = pod.trim();
    if pod.is_empty() {
        return Err(Error::config("pod address must not be empty"));
    }

    let url = if pod.contains("://") {
        Url::parse(pod)?
    } else {
        tracing::warn!("Pod address {} has no scheme, assuming {}", pod, default_scheme);
        Url::parse(&format!("{}://{}", default_scheme, pod))?
    };

    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::config(format!("Unsupported pod scheme: {}", url.scheme())));
    }
    if url.host_str().is_none() {
        return Err(Error::config(format!("Pod address has no host: {}", pod)));
    }

    Ok(url)
}

/// Resolve a pod-relative path. Any path prefix of the base address is kept,
/// so `https://host/diaspora` + `stream.json` gives `https://host/diaspora/stream.json`.
pub fn resolve(base: &Url, path: &str) -> Result<Url> {
    let joined = format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Ok(Url::parse(&joined)?)
}
