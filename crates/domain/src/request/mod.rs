//! Outgoing API request description

mod method;

pub use method::HttpMethod;

use uuid::Uuid;

/// Header carrying the bearer credential.
pub const AUTHORIZATION: &str = "Authorization";

/// An outgoing API request as seen by the request pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// Correlation id, stable across a replay.
    pub id: Uuid,
    /// HTTP method.
    pub method: HttpMethod,
    /// Absolute URL.
    pub url: String,
    /// Header name/value pairs.
    pub headers: Vec<(String, String)>,
    /// JSON body, if any.
    pub body: Option<serde_json::Value>,
    replayed: bool,
}

impl ApiRequest {
    /// Creates a request without body.
    #[must_use]
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            replayed: false,
        }
    }

    /// Creates a GET request.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    /// Creates a POST request with a JSON body.
    #[must_use]
    pub fn post(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(HttpMethod::Post, url).with_body(body)
    }

    /// Creates a DELETE request.
    #[must_use]
    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, url)
    }

    /// Attach a JSON body.
    #[must_use]
    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Set a header, replacing any existing value (case-insensitive name).
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.into()));
    }

    /// Remove a header (case-insensitive name).
    pub fn remove_header(&mut self, name: &str) {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
    }

    /// Look up a header value (case-insensitive name).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if this request is the single replay of an earlier one.
    #[must_use]
    pub const fn is_replay(&self) -> bool {
        self.replayed
    }

    /// Mark this request as the replay of an earlier attempt.
    #[must_use]
    pub const fn into_replay(mut self) -> Self {
        self.replayed = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_set_header_replaces_case_insensitively() {
        let mut request = ApiRequest::get("https://api.example.com/me");
        request.set_header("authorization", "Bearer old");
        request.set_header(AUTHORIZATION, "Bearer new");

        assert_eq!(request.headers.len(), 1);
        assert_eq!(request.header("AUTHORIZATION"), Some("Bearer new"));

        request.remove_header(AUTHORIZATION);
        assert!(request.header(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_replay_keeps_id() {
        let request = ApiRequest::post("https://api.example.com/x", serde_json::json!({"a": 1}));
        let id = request.id;
        let replay = request.into_replay();
        assert!(replay.is_replay());
        assert_eq!(replay.id, id);
    }
}
