//! Outgoing request description

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// JSON media type sent by default
pub const FHIR_JSON: &str = "application/fhir+json";

/// Media type of form-encoded search bodies
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// One outgoing call. Built with the constructors below and handed to
/// [`FetchClient::execute`](crate::fetch::FetchClient::execute), which
/// consumes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestSpec {
    pub method: Method,

    /// Path relative to the configured base, or an absolute URL
    pub path: String,

    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    #[serde(default)]
    pub body: Option<String>,

    /// Attach a bearer token from the configured provider
    #[serde(default)]
    pub authorized: bool,
}

impl RequestSpec {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: BTreeMap::new(),
            body: None,
            authorized: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    /// POST with a JSON body
    pub fn post_json(path: impl Into<String>, body: &serde_json::Value) -> Self {
        Self::new(Method::Post, path).with_body(body.to_string())
    }

    /// PUT with a JSON body
    pub fn put_json(path: impl Into<String>, body: &serde_json::Value) -> Self {
        Self::new(Method::Put, path).with_body(body.to_string())
    }

    /// POST with an already form-encoded body
    pub fn post_form(path: impl Into<String>, form: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
            .with_header("Content-Type", FORM_URLENCODED)
            .with_body(form)
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn authorized(mut self) -> Self {
        self.authorized = true;
        self
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.header(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_form_request_sets_content_type() {
        let req = RequestSpec::post_form("Patient/_search", "given=a");
        assert_eq!(req.method, Method::Post);
        assert_eq!(req.header("content-type"), Some(FORM_URLENCODED));
        assert_eq!(req.body.as_deref(), Some("given=a"));
        assert!(!req.authorized);
    }

    #[test]
    fn test_json_request_leaves_content_type_to_client() {
        let req = RequestSpec::put_json("Patient/p1", &json!({"resourceType": "Patient"})).authorized();
        assert!(req.authorized);
        assert!(!req.has_header("Content-Type"));
        assert_eq!(req.body.as_deref(), Some(r#"{"resourceType":"Patient"}"#));
    }
}
