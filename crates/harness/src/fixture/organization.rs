//! Organization fixtures

use serde_json::{json, Map, Value};

use super::FixtureKind;
use crate::tag::UniquenessTag;

#[derive(Debug, Clone, Default)]
pub struct OrganizationOptions {
    pub id: Option<String>,
    pub name: Option<String>,
    pub alias: Vec<String>,
    pub active: Option<bool>,
    /// Parent organization reference
    pub part_of: Option<String>,
    pub identifier: Vec<Value>,
    pub extra: Map<String, Value>,
}

impl OrganizationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias.push(alias.into());
        self
    }

    pub fn part_of(mut self, reference: impl Into<String>) -> Self {
        self.part_of = Some(reference.into());
        self
    }
}

impl FixtureKind for OrganizationOptions {
    const RESOURCE_TYPE: &'static str = "Organization";

    fn defaults(&self, tag: &UniquenessTag) -> Map<String, Value> {
        let mut body = Map::new();
        body.insert("active".into(), json!(true));
        body.insert("name".into(), json!(tag.label("Fixture Organization")));
        body
    }

    fn overrides(&self) -> Map<String, Value> {
        let mut body = Map::new();
        if let Some(name) = &self.name {
            body.insert("name".into(), json!(name));
        }
        if !self.alias.is_empty() {
            body.insert("alias".into(), json!(self.alias));
        }
        if let Some(active) = self.active {
            body.insert("active".into(), json!(active));
        }
        if let Some(parent) = &self.part_of {
            body.insert("partOf".into(), json!({ "reference": parent }));
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_name_carries_tag() {
        let tag = UniquenessTag::from_suffix("x9");
        let defaults = OrganizationOptions::new().defaults(&tag);
        assert_eq!(defaults["name"], "Fixture Organization-x9");
    }

    #[test]
    fn test_name_override_replaces_default() {
        let options = OrganizationOptions::new().name("Acme").part_of("Organization/root");
        let overrides = options.overrides();
        assert_eq!(overrides["name"], "Acme");
        assert_eq!(overrides["partOf"]["reference"], "Organization/root");
    }
}
