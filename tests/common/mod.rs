//! Common test utilities and helpers
//!
//! This module provides a fake pod built on wiremock for integration tests.

/// Test helper functions
#[allow(dead_code)]
pub mod helpers {
    use chrono::{DateTime, TimeZone, Utc};
    use diaspora_pod_client::{Session, Settings};
    use serde_json::{Value, json};
    use std::sync::Arc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// A pod page carrying `token` in the current meta-tag format
    pub fn csrf_page(token: &str) -> String {
        format!(
            r#"<!DOCTYPE html><html><head><meta name="csrf-param" content="authenticity_token" />
<meta name="csrf-token" content="{}" /></head><body></body></html>"#,
            token
        )
    }

    /// Noon UTC on the given day of May 2013
    pub fn day(n: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2013, 5, n, 12, 0, 0).unwrap()
    }

    /// `max_time` query value selecting items at or before `day(n)`
    pub fn max_time(n: u32) -> String {
        day(n).timestamp().to_string()
    }

    /// One post object as a pod serializes it
    pub fn post(guid: &str, created: u32) -> Value {
        json!({
            "id": created,
            "guid": guid,
            "created_at": day(created).to_rfc3339(),
            "text": format!("post {}", guid),
            "public": true
        })
    }

    /// A newest-first feed page
    pub fn feed(posts: &[(&str, u32)]) -> Value {
        Value::Array(posts.iter().map(|(guid, created)| post(guid, *created)).collect())
    }

    pub fn json_response(body: Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(body)
    }

    /// Serve `token` from the default token source
    pub async fn mount_token(server: &MockServer, token: &str) {
        Mock::given(method("GET"))
            .and(path("/stream"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(csrf_page(token), "text/html"))
            .mount(server)
            .await;
    }

    /// Settings for talking to a local mock server
    pub fn test_settings() -> Settings {
        let mut settings = Settings::default();
        settings.http.default_scheme = "http".to_string();
        settings.http.timeout_secs = 5;
        settings
    }

    pub fn session_for(server: &MockServer) -> Arc<Session> {
        session_with(server, test_settings())
    }

    pub fn session_with(server: &MockServer, settings: Settings) -> Arc<Session> {
        Arc::new(Session::new(&server.uri(), settings).unwrap())
    }
}
