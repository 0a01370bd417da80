//! ValueSet fixtures
//!
//! Canonical resources: the `url` defaults to one derived from the tag so that
//! versioned references (`url|version`) are unique per scenario.

use serde_json::{json, Map, Value};

use super::FixtureKind;
use crate::tag::UniquenessTag;

pub const CANONICAL_ROOT: &str = "http://example.org/fhir/ValueSet";

#[derive(Debug, Clone, Default)]
pub struct ValueSetOptions {
    pub id: Option<String>,
    pub url: Option<String>,
    pub version: Option<String>,
    pub name: Option<String>,
    pub title: Option<String>,
    pub status: Option<String>,
    pub identifier: Vec<Value>,
    pub extra: Map<String, Value>,
}

impl ValueSetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Canonical URL a ValueSet fixture gets when the caller sets none
pub fn default_url(tag: &UniquenessTag) -> String {
    format!("{}/{}", CANONICAL_ROOT, tag)
}

impl FixtureKind for ValueSetOptions {
    const RESOURCE_TYPE: &'static str = "ValueSet";

    fn defaults(&self, tag: &UniquenessTag) -> Map<String, Value> {
        let mut body = Map::new();
        body.insert("status".into(), json!("active"));
        body.insert("url".into(), json!(default_url(tag)));
        body.insert("name".into(), json!(format!("Fixture_{}", tag)));
        body
    }

    fn overrides(&self) -> Map<String, Value> {
        let mut body = Map::new();
        let fields = [
            ("url", &self.url),
            ("version", &self.version),
            ("name", &self.name),
            ("title", &self.title),
            ("status", &self.status),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                body.insert(key.into(), json!(value));
            }
        }
        body.extend(self.extra.clone());
        body
    }

    fn identifiers(&self) -> &[Value] {
        &self.identifier
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}
