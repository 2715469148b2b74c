//! Request option definitions
//!
//! Describes the optional parts of a session request: query parameters,
//! extra headers, a body, and whether the path is already absolute.

use serde_json::Value;

/// Body of a write request
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// `application/x-www-form-urlencoded`
    Form(Vec<(String, String)>),
    /// `application/json`
    Json(Value),
    /// Raw bytes sent with the given content type
    Raw { content_type: String, bytes: Vec<u8> },
}

/// Options for a single session request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    /// Query parameters, in order
    pub params: Vec<(String, String)>,

    /// Extra headers; a header here overrides anything the session would add
    pub headers: Vec<(String, String)>,

    /// Request body (ignored for GET)
    pub body: Option<RequestBody>,

    /// Treat the path as a full URL instead of resolving it against the pod
    pub absolute: bool,
}

impl RequestOptions {
    /// Create empty request options
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a query parameter
    pub fn with_param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    /// Add a header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Send a form-encoded body
    pub fn with_form<K, V>(mut self, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let fields = fields
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.body = Some(RequestBody::Form(fields));
        self
    }

    /// Send a JSON body
    pub fn with_json(mut self, value: Value) -> Self {
        self.body = Some(RequestBody::Json(value));
        self
    }

    /// Send raw bytes with an explicit content type
    pub fn with_bytes(mut self, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.body = Some(RequestBody::Raw {
            content_type: content_type.into(),
            bytes,
        });
        self
    }

    /// Mark the path as an absolute URL (e.g. another pod's public feed)
    pub fn absolute(mut self) -> Self {
        self.absolute = true;
        self
    }

    /// Case-insensitive header lookup
    pub fn has_header(&self, name: &str) -> bool {
        self.headers.iter().any(|(n, _)| n.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_chain() {
        let options = RequestOptions::new()
            .with_param("max_time", 1_367_000_000)
            .with_header("Accept", "application/json")
            .with_json(json!({"text": "hi"}))
            .absolute();

        assert_eq!(options.params, vec![("max_time".to_string(), "1367000000".to_string())]);
        assert!(options.absolute);
        assert!(matches!(options.body, Some(RequestBody::Json(_))));
    }

    #[test]
    fn test_has_header_ignores_case() {
        let options = RequestOptions::new().with_header("X-CSRF-Token", "abc");
        assert!(options.has_header("x-csrf-token"));
        assert!(!options.has_header("accept"));
    }

    #[test]
    fn test_form_body() {
        let options = RequestOptions::new().with_form([("aspect[name]", "friends")]);
        assert_eq!(
            options.body,
            Some(RequestBody::Form(vec![(
                "aspect[name]".to_string(),
                "friends".to_string()
            )]))
        );
    }
}
