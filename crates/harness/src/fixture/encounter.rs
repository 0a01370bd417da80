//! Encounter fixtures

use serde_json::{json, Map, Value};

use super::FixtureKind;
use crate::tag::UniquenessTag;

const ACT_CODE_SYSTEM: &str = "http://terminology.hl7.org/CodeSystem/v3-ActCode";

#[derive(Debug, Clone)]
pub struct EncounterOptions {
    pub subject: String,
    pub id: Option<String>,
    pub status: Option<String>,
    /// v3 ActCode, e.g. `AMB` or `IMP`
    pub class_code: Option<String>,
    pub period_start: Option<String>,
    pub period_end: Option<String>,
    pub service_provider: Option<String>,
    pub identifier: Vec<Value>,
    pub extra: Map<String, Value>,
}

impl EncounterOptions {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            id: None,
            status: None,
            class_code: None,
            period_start: None,
            period_end: None,
            service_provider: None,
            identifier: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn class_code(mut self, code: impl Into<String>) -> Self {
        self.class_code = Some(code.into());
        self
    }

    pub fn period(mut self, start: impl Into<String>, end: Option<String>) -> Self {
        self.period_start = Some(start.into());
        self.period_end = end;
        self
    }

    pub fn service_provider(mut self, reference: impl Into<String>) -> Self {
        self.service_provider = Some(reference.into());
        self
    }
}

impl FixtureKind for EncounterOptions {
    const RESOURCE_TYPE: &'static str = "Encounter";

    fn defaults(&self, _tag: &UniquenessTag) -> Map<String, Value> {
        let mut body = Map::new();
        body.insert("status".into(), json!("finished"));
        body.insert("class".into(), json!({ "system": ACT_CODE_SYSTEM, "code": "AMB" }));
        body
    }

    fn overrides(&self) -> Map<String, Value> {
        let mut body = Map::new();
        body.insert("subject".into(), json!({ "reference": self.subject }));
        if let Some(status) = &self.status {
            body.insert("status".into(), json!(status));
        }
        if let Some(code) = &self.class_code {
            body.insert("class".into(), json!({ "system": ACT_CODE_SYSTEM, "code": code }));
        }
        if let Some(start) = &self.period_start {
            let mut period = Map::new();
            period.insert("start".into(), json!(start));
            if let Some(end) = &self.period_end {
                period.insert("end".into(), json!(end));
            }
            body.insert("period".into(), Value::Object(period));
        }
        if let Some(provider) = &self.service_provider {
            body.insert("serviceProvider".into(), json!({ "reference": provider }));
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
