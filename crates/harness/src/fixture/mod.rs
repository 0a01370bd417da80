//! Resource factory
//!
//! Builds minimally valid resources for scenarios to search against. Each kind
//! supplies defaults for its required fields; the caller's options replace
//! those defaults field by field. Identifier lists are the exception: the
//! factory always puts the uniqueness tag identifier first and appends the
//! caller's identifiers after it, so a fixture stays searchable by tag no
//! matter what the scenario overrides.

pub mod encounter;
pub mod observation;
pub mod organization;
pub mod patient;
pub mod practitioner;
pub mod value_set;

pub use encounter::EncounterOptions;
pub use observation::ObservationOptions;
pub use organization::OrganizationOptions;
pub use patient::PatientOptions;
pub use practitioner::PractitionerOptions;
pub use value_set::ValueSetOptions;

use serde_json::{json, Map, Value};
use tracing::{debug, error};

use crate::capability::Capabilities;
use crate::error::{HarnessError, HarnessResult};
use crate::fetch::FetchClient;
use crate::request::RequestSpec;
use crate::response::ResponseRecord;
use crate::tag::UniquenessTag;

/// Fields the server owns; never compared against what was submitted
const SERVER_OWNED: [&str; 4] = ["resourceType", "id", "meta", "text"];

/// A resource kind the factory knows how to build
pub trait FixtureKind {
    const RESOURCE_TYPE: &'static str;

    /// Minimal body satisfying the kind's required fields
    fn defaults(&self, tag: &UniquenessTag) -> Map<String, Value>;

    /// Caller-chosen top-level fields. Each replaces its default outright.
    fn overrides(&self) -> Map<String, Value>;

    /// Caller identifiers, appended after the tag identifier
    fn identifiers(&self) -> &[Value];

    /// Explicit id, turning the create into a create-or-replace
    fn id(&self) -> Option<&str>;
}

/// Combine defaults, overrides and the tag identifier into a resource body.
pub fn merge(
    resource_type: &str,
    id: Option<&str>,
    defaults: Map<String, Value>,
    overrides: Map<String, Value>,
    tag_identifier: Value,
    identifiers: &[Value],
) -> Value {
    let mut body = Map::new();
    body.insert("resourceType".into(), json!(resource_type));
    if let Some(id) = id {
        body.insert("id".into(), json!(id));
    }

    body.extend(defaults);

    let mut extra_identifiers = Vec::new();
    for (key, value) in overrides {
        match key.as_str() {
            "resourceType" | "id" => {}
            "identifier" => match value {
                Value::Array(items) => extra_identifiers.extend(items),
                other => extra_identifiers.push(other),
            },
            _ => {
                body.insert(key, value);
            }
        }
    }

    let mut all = vec![tag_identifier];
    all.extend(identifiers.iter().cloned());
    all.extend(extra_identifiers);
    body.insert("identifier".into(), Value::Array(all));

    Value::Object(body)
}

/// `HumanName` list from optional family and given parts
pub(crate) fn human_name(family: Option<&str>, given: &[String]) -> Option<Value> {
    if family.is_none() && given.is_empty() {
        return None;
    }
    let mut name = Map::new();
    name.insert("use".into(), json!("official"));
    if let Some(family) = family {
        name.insert("family".into(), json!(family));
    }
    if !given.is_empty() {
        name.insert("given".into(), json!(given));
    }
    Some(Value::Array(vec![Value::Object(name)]))
}

/// Built and tagged, not yet sent to the server
#[derive(Debug, Clone, PartialEq)]
pub struct PendingFixture {
    pub resource_type: String,
    pub id: Option<String>,
    pub body: Value,
}

impl PendingFixture {
    fn request(&self) -> RequestSpec {
        match &self.id {
            Some(id) => RequestSpec::put_json(format!("{}/{}", self.resource_type, id), &self.body),
            None => RequestSpec::post_json(self.resource_type.clone(), &self.body),
        }
        .authorized()
    }

    /// Create the resource. Any failure aborts the scenario with the server's
    /// payload attached.
    pub async fn submit(self, client: &FetchClient) -> HarnessResult<Fixture> {
        let record = client.execute(self.request()).await?;

        if !record.success || !record.parsed {
            return Err(self.setup_failure(&record, "create failed"));
        }
        let id = match record.resource_id() {
            Some(id) => id.to_string(),
            None => return Err(self.setup_failure(&record, "response carries no id")),
        };
        if let Some(expected) = &self.id {
            if expected != &id {
                return Err(self.setup_failure(&record, "server changed the requested id"));
            }
        }

        debug!("Created fixture {}/{}", self.resource_type, id);
        Ok(Fixture {
            resource_type: self.resource_type,
            id,
            resource: record.json.unwrap_or(Value::Null),
            submitted: self.body,
        })
    }

    fn setup_failure(&self, record: &ResponseRecord, reason: &str) -> HarnessError {
        error!(
            "Fixture setup for {} failed ({}), status {}: {}",
            self.resource_type, reason, record.status, record.body_text
        );
        HarnessError::Setup {
            kind: self.resource_type.clone(),
            status: record.status,
            body: record.body_text.clone(),
        }
    }
}

/// A resource the server has accepted
#[derive(Debug, Clone, PartialEq)]
pub struct Fixture {
    pub resource_type: String,
    pub id: String,
    /// Body as echoed by the server
    pub resource: Value,
    /// Body as sent
    pub submitted: Value,
}

impl Fixture {
    /// `Type/id`
    pub fn reference(&self) -> String {
        format!("{}/{}", self.resource_type, self.id)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.resource.get(field)
    }

    /// Submitted top-level fields the server did not echo back unchanged
    pub fn diverging_fields(&self) -> Vec<String> {
        let Some(submitted) = self.submitted.as_object() else {
            return Vec::new();
        };
        submitted
            .iter()
            .filter(|(key, _)| !SERVER_OWNED.contains(&key.as_str()))
            .filter(|(key, value)| self.resource.get(key.as_str()) != Some(*value))
            .map(|(key, _)| key.clone())
            .collect()
    }
}

/// Per-scenario fixture factory, bound to one uniqueness tag
#[derive(Debug, Clone)]
pub struct ResourceFactory {
    client: FetchClient,
    tag: UniquenessTag,
    tag_system: String,
}

impl ResourceFactory {
    pub fn new(client: FetchClient, tag: UniquenessTag, tag_system: impl Into<String>) -> Self {
        Self {
            client,
            tag,
            tag_system: tag_system.into(),
        }
    }

    pub fn tag(&self) -> &UniquenessTag {
        &self.tag
    }

    pub fn tag_system(&self) -> &str {
        &self.tag_system
    }

    /// Same factory, different tag
    pub fn with_tag(&self, tag: UniquenessTag) -> Self {
        Self {
            tag,
            ..self.clone()
        }
    }

    pub fn tag_identifier(&self) -> Value {
        json!({ "system": self.tag_system, "value": self.tag.as_str() })
    }

    /// Build the body without sending it
    pub fn prepare<K: FixtureKind>(&self, options: &K) -> PendingFixture {
        let body = merge(
            K::RESOURCE_TYPE,
            options.id(),
            options.defaults(&self.tag),
            options.overrides(),
            self.tag_identifier(),
            options.identifiers(),
        );
        PendingFixture {
            resource_type: K::RESOURCE_TYPE.to_string(),
            id: options.id().map(str::to_string),
            body,
        }
    }

    pub async fn create<K: FixtureKind>(&self, options: &K) -> HarnessResult<Fixture> {
        self.prepare(options).submit(&self.client).await
    }

    pub async fn patient(&self, options: PatientOptions) -> HarnessResult<Fixture> {
        self.create(&options).await
    }

    pub async fn practitioner(&self, options: PractitionerOptions) -> HarnessResult<Fixture> {
        self.create(&options).await
    }

    pub async fn organization(&self, options: OrganizationOptions) -> HarnessResult<Fixture> {
        self.create(&options).await
    }

    pub async fn observation(&self, options: ObservationOptions) -> HarnessResult<Fixture> {
        self.create(&options).await
    }

    pub async fn encounter(&self, options: EncounterOptions) -> HarnessResult<Fixture> {
        self.create(&options).await
    }

    pub async fn value_set(&self, options: ValueSetOptions) -> HarnessResult<Fixture> {
        self.create(&options).await
    }

    /// Make sure the configured known resource exists, creating or replacing
    /// it at its id.
    pub async fn anchor(&self, capabilities: &Capabilities) -> HarnessResult<Fixture> {
        let reference = capabilities.known_resource();
        let (resource_type, id) = reference
            .split_once('/')
            .filter(|(t, i)| !t.is_empty() && !i.is_empty())
            .ok_or_else(|| {
                HarnessError::InvalidConfig(format!("known resource '{}' is not Type/id", reference))
            })?;

        let body = merge(
            resource_type,
            Some(id),
            Map::new(),
            Map::new(),
            self.tag_identifier(),
            &[],
        );
        PendingFixture {
            resource_type: resource_type.to_string(),
            id: Some(id.to_string()),
            body,
        }
        .submit(&self.client)
        .await
    }
}
