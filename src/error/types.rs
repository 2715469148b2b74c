//! Error type definitions
//!
//! Defines the error taxonomy shared by the session, token and stream layers.

use thiserror::Error;

/// Main error type for the pod client
#[derive(Error, Debug)]
pub enum Error {
    /// Connectivity failures (refused connection, DNS, timeout).
    /// Never retried inside the session layer.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Login rejected or login required
    #[error("Login error: {message}")]
    Login {
        /// Status returned by the sign-in endpoint, if a request was made
        status: Option<u16>,
        message: String,
    },

    /// No extractable token and no cached token to fall back on
    #[error("Token error: {0}")]
    Token(String),

    /// Non-2xx response while fetching a feed page
    #[error("Stream error: {location} returned status {status}")]
    Stream { status: u16, location: String },

    /// Embedded current-user data could not be found
    #[error("User data error: {0}")]
    UserData(String),

    /// Malformed diaspora* handle
    #[error("Invalid handle: {0}")]
    InvalidHandle(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A long-running operation was stopped by its caller
    #[error("Aborted: {0}")]
    Aborted(String),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML configuration parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a login error carrying the sign-in response status
    pub fn login(status: u16, message: impl Into<String>) -> Self {
        Self::Login {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Create a login error raised before any request was made
    pub fn login_required(message: impl Into<String>) -> Self {
        Self::Login {
            status: None,
            message: message.into(),
        }
    }

    /// Create a new token error
    pub fn token(msg: impl Into<String>) -> Self {
        Self::Token(msg.into())
    }

    /// Create a stream error for a failed page fetch
    pub fn stream(status: u16, location: impl Into<String>) -> Self {
        Self::Stream {
            status,
            location: location.into(),
        }
    }

    /// Create a user data error
    pub fn user_data(msg: impl Into<String>) -> Self {
        Self::UserData(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an abort error
    pub fn aborted(msg: impl Into<String>) -> Self {
        Self::Aborted(msg.into())
    }

    /// True for connectivity-level failures
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// HTTP status attached to the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Login { status, .. } => *status,
            Self::Stream { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_error_carries_status() {
        let err = Error::login(200, "login failed");
        assert!(matches!(err, Error::Login { status: Some(200), .. }));
        assert_eq!(err.status(), Some(200));
        assert_eq!(err.to_string(), "Login error: login failed");
    }

    #[test]
    fn test_login_required_has_no_status() {
        let err = Error::login_required("logged out");
        assert_eq!(err.status(), None);
        assert!(!err.is_transport());
    }

    #[test]
    fn test_stream_error() {
        let err = Error::stream(502, "stream.json");
        assert_eq!(err.status(), Some(502));
        assert_eq!(
            err.to_string(),
            "Stream error: stream.json returned status 502"
        );
    }

    #[test]
    fn test_token_error() {
        let err = Error::token("no csrf marker");
        assert!(matches!(err, Error::Token(_)));
        assert!(err.to_string().contains("Token error"));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json");
        assert!(json_err.is_err());

        let err: Error = json_err.unwrap_err().into();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_error_from_url() {
        let err: Error = url::Url::parse("http://[::1").unwrap_err().into();
        assert!(matches!(err, Error::Url(_)));
    }
}
