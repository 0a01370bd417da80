//! Patient fixtures

use serde_json::{json, Map, Value};

use super::{human_name, FixtureKind};
use crate::tag::UniquenessTag;

#[derive(Debug, Clone, Default)]
pub struct PatientOptions {
    pub id: Option<String>,
    pub family: Option<String>,
    pub given: Vec<String>,
    pub gender: Option<String>,
    pub birth_date: Option<String>,
    pub active: Option<bool>,
    /// Organization reference (`Organization/id`)
    pub managing_organization: Option<String>,
    pub identifier: Vec<Value>,
    /// Any other top-level field, replacing the default
    pub extra: Map<String, Value>,
}

impl PatientOptions {
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

    pub fn gender(mut self, gender: impl Into<String>) -> Self {
        self.gender = Some(gender.into());
        self
    }

    pub fn birth_date(mut self, date: impl Into<String>) -> Self {
        self.birth_date = Some(date.into());
        self
    }

    pub fn active(mut self, active: bool) -> Self {
        self.active = Some(active);
        self
    }

    pub fn managing_organization(mut self, reference: impl Into<String>) -> Self {
        self.managing_organization = Some(reference.into());
        self
    }

    pub fn identifier(mut self, system: &str, value: &str) -> Self {
        self.identifier.push(json!({ "system": system, "value": value }));
        self
    }

    pub fn extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

impl FixtureKind for PatientOptions {
    const RESOURCE_TYPE: &'static str = "Patient";

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
        if let Some(gender) = &self.gender {
            body.insert("gender".into(), json!(gender));
        }
        if let Some(date) = &self.birth_date {
            body.insert("birthDate".into(), json!(date));
        }
        if let Some(active) = self.active {
            body.insert("active".into(), json!(active));
        }
        if let Some(org) = &self.managing_organization {
            body.insert("managingOrganization".into(), json!({ "reference": org }));
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
