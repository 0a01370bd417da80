//! Practitioner fixtures

use serde_json::{json, Map, Value};

use super::{human_name, FixtureKind};
use crate::tag::UniquenessTag;

#[derive(Debug, Clone, Default)]
pub struct PractitionerOptions {
    pub id: Option<String>,
    pub family: Option<String>,
    pub given: Vec<String>,
    pub active: Option<bool>,
    pub identifier: Vec<Value>,
    pub extra: Map<String, Value>,
}

impl PractitionerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn family(mut self, family: impl Into<String>) -> Self {
        self.family = Some(family.into());
        self
    }

    pub fn given(mut self, given: impl Into<String>) -> Self {
        self.given.push(given.into());
        self
    }

    pub fn identifier(mut self, system: &str, value: &str) -> Self {
        self.identifier.push(json!({ "system": system, "value": value }));
        self
    }
}

impl FixtureKind for PractitionerOptions {
    const RESOURCE_TYPE: &'static str = "Practitioner";

    fn defaults(&self, _tag: &UniquenessTag) -> Map<String, Value> {
        let mut body = Map::new();
        body.insert("active".into(), json!(true));
        body
    }

    fn overrides(&self) -> Map<String, Value> {
        let mut body = Map::new();
        if let Some(name) = human_name(self.family.as_deref(), &self.given) {
            body.insert("name".into(), name);
        }
        if let Some(active) = self.active {
            body.insert("active".into(), json!(active));
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
