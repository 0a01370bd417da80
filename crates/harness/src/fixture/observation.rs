//! Observation fixtures
//!
//! The subject is what an observation scenario is about, so it is the one
//! field the caller must supply.

use serde_json::{json, Map, Value};

use super::FixtureKind;
use crate::tag::UniquenessTag;

pub const LOINC: &str = "http://loinc.org";

/// Heart rate, used when the caller does not pick a code
const DEFAULT_CODE: &str = "8867-4";

#[derive(Debug, Clone)]
pub struct ObservationOptions {
    pub subject: String,
    pub id: Option<String>,
    pub status: Option<String>,
    /// `(system, code)` of `Observation.code`
    pub code: Option<(String, String)>,
    pub value_quantity: Option<(f64, String)>,
    pub value_string: Option<String>,
    pub effective_date_time: Option<String>,
    pub encounter: Option<String>,
    pub identifier: Vec<Value>,
    pub extra: Map<String, Value>,
}

impl ObservationOptions {
    /// `subject` is a reference such as `Patient/123`
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            id: None,
            status: None,
            code: None,
            value_quantity: None,
            value_string: None,
            effective_date_time: None,
            encounter: None,
            identifier: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn code(mut self, system: impl Into<String>, code: impl Into<String>) -> Self {
        self.code = Some((system.into(), code.into()));
        self
    }

    pub fn value_quantity(mut self, value: f64, unit: impl Into<String>) -> Self {
        self.value_quantity = Some((value, unit.into()));
        self
    }

    pub fn value_string(mut self, value: impl Into<String>) -> Self {
        self.value_string = Some(value.into());
        self
    }

    pub fn effective(mut self, date_time: impl Into<String>) -> Self {
        self.effective_date_time = Some(date_time.into());
        self
    }

    pub fn encounter(mut self, reference: impl Into<String>) -> Self {
        self.encounter = Some(reference.into());
        self
    }
}

impl FixtureKind for ObservationOptions {
    const RESOURCE_TYPE: &'static str = "Observation";

    fn defaults(&self, _tag: &UniquenessTag) -> Map<String, Value> {
        let mut body = Map::new();
        body.insert("status".into(), json!("final"));
        body.insert(
            "code".into(),
            json!({ "coding": [{ "system": LOINC, "code": DEFAULT_CODE }] }),
        );
        body
    }

    fn overrides(&self) -> Map<String, Value> {
        let mut body = Map::new();
        body.insert("subject".into(), json!({ "reference": self.subject }));
        if let Some(status) = &self.status {
            body.insert("status".into(), json!(status));
        }
        if let Some((system, code)) = &self.code {
            body.insert("code".into(), json!({ "coding": [{ "system": system, "code": code }] }));
        }
        if let Some((value, unit)) = &self.value_quantity {
            body.insert(
                "valueQuantity".into(),
                json!({ "value": value, "unit": unit, "system": "http://unitsofmeasure.org", "code": unit }),
            );
        }
        if let Some(value) = &self.value_string {
            body.insert("valueString".into(), json!(value));
        }
        if let Some(effective) = &self.effective_date_time {
            body.insert("effectiveDateTime".into(), json!(effective));
        }
        if let Some(encounter) = &self.encounter {
            body.insert("encounter".into(), json!({ "reference": encounter }));
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
