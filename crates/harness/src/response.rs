//! Call outcomes and the response record handed back to scenarios

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::bundle::Bundle;
use crate::error::{HarnessError, HarnessResult};

/// Status reported when no HTTP response was obtained
pub const NO_RESPONSE_STATUS: i32 = -1;

/// What came back from one network call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Response {
        status: u16,
        headers: BTreeMap<String, String>,
        body: String,
    },
    TransportError {
        message: String,
    },
}

impl Outcome {
    pub fn transport(message: impl Into<String>) -> Self {
        Outcome::TransportError {
            message: message.into(),
        }
    }

    pub fn status(&self) -> i32 {
        match self {
            Outcome::Response { status, .. } => i32::from(*status),
            Outcome::TransportError { .. } => NO_RESPONSE_STATUS,
        }
    }
}

/// Result of executing a request. Read-only once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    /// HTTP status, or [`NO_RESPONSE_STATUS`]
    pub status: i32,
    pub body_text: String,
    pub json: Option<Value>,
    pub parsed: bool,
    pub success: bool,
    pub headers: BTreeMap<String, String>,
}

impl ResponseRecord {
    /// Every record is derived here, whether the call reached the server or not.
    pub fn from_outcome(outcome: &Outcome) -> Self {
        match outcome {
            Outcome::Response {
                status,
                headers,
                body,
            } => {
                let json = serde_json::from_str::<Value>(body).ok();
                Self {
                    status: i32::from(*status),
                    body_text: body.clone(),
                    parsed: json.is_some(),
                    json,
                    success: (200..300).contains(status),
                    headers: headers.clone(),
                }
            }
            Outcome::TransportError { message } => Self {
                status: NO_RESPONSE_STATUS,
                body_text: message.clone(),
                json: None,
                parsed: false,
                success: false,
                headers: BTreeMap::new(),
            },
        }
    }

    pub fn is_transport_failure(&self) -> bool {
        self.status == NO_RESPONSE_STATUS
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// `resourceType` of the parsed body, if any
    pub fn resource_type(&self) -> Option<&str> {
        self.json.as_ref()?.get("resourceType")?.as_str()
    }

    /// Server-assigned `id` of the parsed body, if any
    pub fn resource_id(&self) -> Option<&str> {
        self.json
            .as_ref()?
            .get("id")?
            .as_str()
            .filter(|id| !id.is_empty())
    }

    /// Interpret the body as a search bundle
    pub fn bundle(&self) -> HarnessResult<Bundle> {
        let json = self.json.as_ref().ok_or_else(|| {
            HarnessError::AssertionFailed(format!(
                "expected a Bundle but status {} body is not JSON: {}",
                self.status,
                truncate(&self.body_text, 200)
            ))
        })?;
        Bundle::from_value(json)
    }
}

pub(crate) fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
