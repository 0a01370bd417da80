//! Capability context
//!
//! Servers differ in which optional search features they implement. Scenarios
//! ask this context before doing any work and are skipped when a feature they
//! need is not claimed. Flags come from static configuration, never from
//! probing the server.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::config::HarnessConfig;

/// Optional behaviours a server may support
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    /// Semver-aware comparison on versioned canonical references
    SemverCanonical,
    /// Skip assertions that trip over known server defects
    AvoidKnownBugs,
    /// `Prefer: handling=lenient` ignores unknown parameters
    LenientHandling,
    /// `POST [type]/_search` with a form body
    PostSearch,
    /// `POST [base]/_search` across types
    SystemSearch,
    /// `_total=accurate`
    TotalAccurate,
    /// `_text`
    TextSearch,
    /// `_content`
    ContentSearch,
    /// `_filter`
    FilterParameter,
    /// `_has` reverse chaining
    HasParameter,
    /// `_in` and the `:in` / `:not-in` modifiers
    InParameter,
    /// `_maxresults`
    MaxResults,
    /// `:text-advanced`
    TextAdvanced,
    /// Forward chaining (`subject.name=...`)
    Chaining,
    /// `_include`
    Include,
    /// `_revinclude`
    RevInclude,
}

impl Capability {
    pub const ALL: [Capability; 16] = [
        Capability::SemverCanonical,
        Capability::AvoidKnownBugs,
        Capability::LenientHandling,
        Capability::PostSearch,
        Capability::SystemSearch,
        Capability::TotalAccurate,
        Capability::TextSearch,
        Capability::ContentSearch,
        Capability::FilterParameter,
        Capability::HasParameter,
        Capability::InParameter,
        Capability::MaxResults,
        Capability::TextAdvanced,
        Capability::Chaining,
        Capability::Include,
        Capability::RevInclude,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::SemverCanonical => "semver-canonical",
            Capability::AvoidKnownBugs => "avoid-known-bugs",
            Capability::LenientHandling => "lenient-handling",
            Capability::PostSearch => "post-search",
            Capability::SystemSearch => "system-search",
            Capability::TotalAccurate => "total-accurate",
            Capability::TextSearch => "text-search",
            Capability::ContentSearch => "content-search",
            Capability::FilterParameter => "filter-parameter",
            Capability::HasParameter => "has-parameter",
            Capability::InParameter => "in-parameter",
            Capability::MaxResults => "max-results",
            Capability::TextAdvanced => "text-advanced",
            Capability::Chaining => "chaining",
            Capability::Include => "include",
            Capability::RevInclude => "rev-include",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Starting point for flag resolution before per-flag overrides
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityProfile {
    /// Every optional feature claimed
    #[default]
    Full,
    /// Only widely implemented features
    Core,
}

impl CapabilityProfile {
    fn flags(&self) -> BTreeSet<Capability> {
        match self {
            CapabilityProfile::Full => Capability::ALL.into_iter().collect(),
            CapabilityProfile::Core => [
                Capability::PostSearch,
                Capability::TotalAccurate,
                Capability::Include,
                Capability::RevInclude,
                Capability::Chaining,
            ]
            .into_iter()
            .collect(),
        }
    }
}

/// Capability section of the harness configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CapabilityConfig {
    pub profile: CapabilityProfile,
    pub overrides: BTreeMap<Capability, bool>,
}

/// Resolved, immutable capability flags plus the few accessors scenarios need
#[derive(Debug, Clone)]
pub struct Capabilities {
    flags: BTreeSet<Capability>,
    base_url: String,
    known_resource: String,
    default_page_size: usize,
}

impl Capabilities {
    /// Resolve flags once from configuration
    pub fn resolve(config: &HarnessConfig) -> Self {
        let mut flags = config.capabilities.profile.flags();
        for (capability, enabled) in &config.capabilities.overrides {
            if *enabled {
                flags.insert(*capability);
            } else {
                flags.remove(capability);
            }
        }

        Self {
            flags,
            base_url: config.base_url.clone(),
            known_resource: config.known_resource.clone(),
            default_page_size: config.default_page_size,
        }
    }

    pub fn supports(&self, capability: Capability) -> bool {
        self.flags.contains(&capability)
    }

    /// First capability in `required` that is not supported, if any
    pub fn missing(&self, required: &[Capability]) -> Option<Capability> {
        required.iter().copied().find(|c| !self.supports(*c))
    }

    pub fn enabled(&self) -> impl Iterator<Item = Capability> + '_ {
        self.flags.iter().copied()
    }

    pub fn supports_semver_canonical(&self) -> bool {
        self.supports(Capability::SemverCanonical)
    }

    pub fn avoids_known_bugs(&self) -> bool {
        self.supports(Capability::AvoidKnownBugs)
    }

    pub fn supports_lenient_handling(&self) -> bool {
        self.supports(Capability::LenientHandling)
    }

    pub fn supports_post_search(&self) -> bool {
        self.supports(Capability::PostSearch)
    }

    pub fn supports_system_search(&self) -> bool {
        self.supports(Capability::SystemSearch)
    }

    pub fn supports_total_accurate(&self) -> bool {
        self.supports(Capability::TotalAccurate)
    }

    pub fn supports_text_search(&self) -> bool {
        self.supports(Capability::TextSearch)
    }

    pub fn supports_content_search(&self) -> bool {
        self.supports(Capability::ContentSearch)
    }

    pub fn supports_filter(&self) -> bool {
        self.supports(Capability::FilterParameter)
    }

    pub fn supports_has(&self) -> bool {
        self.supports(Capability::HasParameter)
    }

    pub fn supports_in(&self) -> bool {
        self.supports(Capability::InParameter)
    }

    pub fn supports_max_results(&self) -> bool {
        self.supports(Capability::MaxResults)
    }

    pub fn supports_text_advanced(&self) -> bool {
        self.supports(Capability::TextAdvanced)
    }

    pub fn supports_chaining(&self) -> bool {
        self.supports(Capability::Chaining)
    }

    pub fn supports_include(&self) -> bool {
        self.supports(Capability::Include)
    }

    pub fn supports_revinclude(&self) -> bool {
        self.supports(Capability::RevInclude)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Reference (`Type/id`) of a resource guaranteed to exist once the
    /// factory has anchored it
    pub fn known_resource(&self) -> &str {
        &self.known_resource
    }

    pub fn default_page_size(&self) -> usize {
        self.default_page_size
    }
}
