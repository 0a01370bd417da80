//! Search result bundles and error payloads as the harness reads them
//!
//! Only the parts the harness inspects are typed. Resources stay as raw JSON
//! so scenarios can assert on whatever field they are testing.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{HarnessError, HarnessResult};

/// Envelope returned by a search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    pub resource_type: String,

    #[serde(rename = "type", default)]
    pub bundle_type: Option<String>,

    #[serde(default)]
    pub total: Option<u64>,

    #[serde(default)]
    pub link: Vec<BundleLink>,

    #[serde(default)]
    pub entry: Vec<BundleEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleLink {
    pub relation: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleEntry {
    #[serde(default)]
    pub full_url: Option<String>,

    #[serde(default)]
    pub resource: Option<Value>,

    #[serde(default)]
    pub search: Option<EntrySearch>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntrySearch {
    #[serde(default)]
    pub mode: Option<SearchMode>,

    #[serde(default)]
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    Match,
    Include,
    Outcome,
}

impl BundleEntry {
    pub fn mode(&self) -> Option<SearchMode> {
        self.search.as_ref().and_then(|s| s.mode)
    }

    pub fn resource_type(&self) -> Option<&str> {
        self.resource.as_ref()?.get("resourceType")?.as_str()
    }

    pub fn resource_id(&self) -> Option<&str> {
        self.resource.as_ref()?.get("id")?.as_str()
    }

    /// `Type/id` of the entry's resource
    pub fn reference(&self) -> Option<String> {
        Some(format!("{}/{}", self.resource_type()?, self.resource_id()?))
    }
}

impl Bundle {
    pub fn from_value(value: &Value) -> HarnessResult<Self> {
        let bundle: Bundle = serde_json::from_value(value.clone())?;
        if bundle.resource_type != "Bundle" {
            return Err(HarnessError::AssertionFailed(format!(
                "expected a Bundle, got {}",
                bundle.resource_type
            )));
        }
        Ok(bundle)
    }

    /// URL of the link with the given relation. `prev` is accepted for
    /// `previous`.
    pub fn link(&self, relation: &str) -> Option<&str> {
        self.link
            .iter()
            .find(|l| {
                l.relation == relation
                    || (relation == "previous" && l.relation == "prev")
                    || (relation == "prev" && l.relation == "previous")
            })
            .map(|l| l.url.as_str())
    }

    pub fn next_link(&self) -> Option<&str> {
        self.link("next")
    }

    /// Whether any of `next`, `previous` or `last` is present
    pub fn has_paging_links(&self) -> bool {
        ["next", "previous", "last"]
            .iter()
            .any(|rel| self.link(rel).is_some())
    }

    /// Entries whose search mode is `match`. Entries without a mode count as
    /// matches, which is what servers omitting `search.mode` mean.
    pub fn match_entries(&self) -> impl Iterator<Item = &BundleEntry> {
        self.entry
            .iter()
            .filter(|e| e.mode() == Some(SearchMode::Match))
    }

    pub fn match_count(&self) -> usize {
        self.match_entries().count()
    }

    pub fn include_entries(&self) -> impl Iterator<Item = &BundleEntry> {
        self.entry
            .iter()
            .filter(|e| e.mode() == Some(SearchMode::Include))
    }

    /// Ids of match-mode entries, in bundle order
    pub fn match_ids(&self) -> Vec<String> {
        self.match_entries()
            .filter_map(|e| e.resource_id().map(str::to_string))
            .collect()
    }
}

/// Structured error payload returned by the server on failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationOutcome {
    pub resource_type: String,

    #[serde(default)]
    pub issue: Vec<OutcomeIssue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeIssue {
    #[serde(default)]
    pub severity: Option<String>,

    #[serde(default)]
    pub code: Option<String>,

    #[serde(default)]
    pub diagnostics: Option<String>,
}

impl OperationOutcome {
    /// Parse `value` if it has the OperationOutcome shape
    pub fn from_value(value: &Value) -> Option<Self> {
        if value.get("resourceType")?.as_str()? != "OperationOutcome" {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }
}

impl std::fmt::Display for OutcomeIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.severity.as_deref().unwrap_or("?"),
            self.code.as_deref().unwrap_or("?"),
            self.diagnostics.as_deref().unwrap_or("")
        )
    }
}
