//! Outgoing request specification

use serde::{Deserialize, Serialize};

use super::HttpMethod;

/// Header sent on every request so tunnelled development backends skip their
/// browser interstitial.
pub const NGROK_SKIP_HEADER: &str = "ngrok-skip-browser-warning";

/// JSON content type.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// A fully resolved HTTP request, ready to hand to a transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Absolute URL.
    pub url: String,
    /// Header name/value pairs, in insertion order.
    pub headers: Vec<(String, String)>,
    /// Serialized JSON body, if any.
    pub body: Option<String>,
}

impl HttpRequest {
    /// Creates a request carrying the headers every API call sends:
    /// `Content-Type: application/json` and `ngrok-skip-browser-warning: true`.
    #[must_use]
    pub fn api(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: vec![
                ("Content-Type".to_string(), JSON_CONTENT_TYPE.to_string()),
                (NGROK_SKIP_HEADER.to_string(), "true".to_string()),
            ],
            body: None,
        }
    }

    /// Sets a header, replacing any existing header with the same name
    /// (case-insensitive).
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers
            .retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
        self
    }

    /// Sets the JSON body.
    #[must_use]
    pub fn with_json(mut self, body: &serde_json::Value) -> Self {
        self.body = Some(body.to_string());
        self
    }

    /// Looks up a header value by name (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Parses the body back into JSON, if present and valid.
    #[must_use]
    pub fn json_body(&self) -> Option<serde_json::Value> {
        self.body
            .as_deref()
            .and_then(|body| serde_json::from_str(body).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_api_request_has_standard_headers() {
        let request = HttpRequest::api(HttpMethod::Get, "https://api.example.com/x");
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.header(NGROK_SKIP_HEADER), Some("true"));
        assert_eq!(request.body, None);
    }

    #[test]
    fn test_with_header_replaces_case_insensitively() {
        let request = HttpRequest::api(HttpMethod::Get, "https://api.example.com/x")
            .with_header("Authorization", "Bearer a")
            .with_header("authorization", "Bearer b");
        assert_eq!(request.header("Authorization"), Some("Bearer b"));
        assert_eq!(
            request
                .headers
                .iter()
                .filter(|(n, _)| n.eq_ignore_ascii_case("authorization"))
                .count(),
            1
        );
    }

    #[test]
    fn test_json_body() {
        let request = HttpRequest::api(HttpMethod::Post, "https://api.example.com/x")
            .with_json(&json!({"phone": "9876543210"}));
        assert_eq!(request.json_body(), Some(json!({"phone": "9876543210"})));
    }
}
