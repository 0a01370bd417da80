//! Harness configuration
//!
//! Resolved once at startup: TOML file first, then environment overrides,
//! then whatever the command line sets on top.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::auth::AuthConfig;
use crate::capability::CapabilityConfig;
use crate::error::{HarnessError, HarnessResult};

/// Identifier system used for uniqueness tags unless configured otherwise.
pub const DEFAULT_TAG_SYSTEM: &str = "urn:searchcheck:tag";

/// Harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Base URL of the FHIR endpoint under test
    pub base_url: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Log every request as it completes
    pub trace: bool,

    /// Log error payloads of failed responses
    pub verbose_errors: bool,

    /// Stop the suite after the first failing scenario
    pub fail_fast: bool,

    /// Page size the server uses when `_count` is absent
    pub default_page_size: usize,

    /// Upper bound on pages followed by the pagination walker
    pub max_pages: usize,

    /// Identifier system carrying uniqueness tags
    pub tag_system: String,

    /// A resource reference (`Type/id`) that scenarios may rely on existing
    pub known_resource: String,

    /// Directory for result and interaction dumps
    pub output_dir: PathBuf,

    /// Optional-feature support of the server under test
    pub capabilities: CapabilityConfig,

    /// How to authorize requests
    pub auth: AuthConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/fhir".to_string(),
            timeout_secs: 30,
            trace: false,
            verbose_errors: true,
            fail_fast: false,
            default_page_size: 20,
            max_pages: 100,
            tag_system: DEFAULT_TAG_SYSTEM.to_string(),
            known_resource: "Patient/searchcheck-anchor".to_string(),
            output_dir: PathBuf::from("test-results"),
            capabilities: CapabilityConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

impl HarnessConfig {
    /// Load configuration from a TOML file, falling back to defaults when the
    /// file does not exist.
    pub fn load(path: &Path) -> HarnessResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply `SEARCHCHECK_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> HarnessResult<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup. Split out so tests don't have
    /// to touch the process environment.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> HarnessResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("SEARCHCHECK_BASE_URL") {
            self.base_url = url;
        }
        if let Some(v) = lookup("SEARCHCHECK_TRACE") {
            self.trace = parse_flag("SEARCHCHECK_TRACE", &v)?;
        }
        if let Some(v) = lookup("SEARCHCHECK_VERBOSE_ERRORS") {
            self.verbose_errors = parse_flag("SEARCHCHECK_VERBOSE_ERRORS", &v)?;
        }
        if let Some(v) = lookup("SEARCHCHECK_FAIL_FAST") {
            self.fail_fast = parse_flag("SEARCHCHECK_FAIL_FAST", &v)?;
        }
        if let Some(v) = lookup("SEARCHCHECK_PAGE_SIZE") {
            self.default_page_size = v.trim().parse().map_err(|_| {
                HarnessError::InvalidConfig(format!("SEARCHCHECK_PAGE_SIZE is not a number: {}", v))
            })?;
        }
        if let Some(token) = lookup("SEARCHCHECK_TOKEN") {
            self.auth = AuthConfig::Static { token };
        }
        Ok(())
    }

    /// Reject configurations the harness cannot run with.
    pub fn validate(&self) -> HarnessResult<()> {
        let url = Url::parse(&self.base_url).map_err(|e| {
            HarnessError::InvalidConfig(format!("base_url '{}' is not a URL: {}", self.base_url, e))
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(HarnessError::InvalidConfig(format!(
                "base_url must be http or https, got '{}'",
                url.scheme()
            )));
        }
        if self.default_page_size == 0 {
            return Err(HarnessError::InvalidConfig(
                "default_page_size must be at least 1".into(),
            ));
        }
        if self.max_pages == 0 {
            return Err(HarnessError::InvalidConfig("max_pages must be at least 1".into()));
        }
        if !self.known_resource.contains('/') {
            return Err(HarnessError::InvalidConfig(format!(
                "known_resource must look like Type/id, got '{}'",
                self.known_resource
            )));
        }
        Ok(())
    }
}

fn parse_flag(key: &str, value: &str) -> HarnessResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(HarnessError::InvalidConfig(format!(
            "{} must be a boolean, got '{}'",
            key, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilityProfile;
    use std::collections::HashMap;

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = HarnessConfig::load(Path::new("/nonexistent/searchcheck.toml")).unwrap();
        assert_eq!(config.default_page_size, 20);
        assert_eq!(config.tag_system, DEFAULT_TAG_SYSTEM);
    }

    #[test]
    fn test_parse_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("searchcheck.toml");
        std::fs::write(
            &path,
            r#"
base_url = "https://fhir.example.org/r4"
default_page_size = 50
fail_fast = true

[capabilities]
profile = "core"

[capabilities.overrides]
lenient-handling = true

[auth]
kind = "static"
token = "abc"
"#,
        )
        .unwrap();

        let config = HarnessConfig::load(&path).unwrap();
        assert_eq!(config.base_url, "https://fhir.example.org/r4");
        assert_eq!(config.default_page_size, 50);
        assert!(config.fail_fast);
        assert_eq!(config.capabilities.profile, CapabilityProfile::Core);
        assert!(matches!(config.auth, AuthConfig::Static { ref token } if token == "abc"));
        config.validate().unwrap();
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("SEARCHCHECK_BASE_URL", "http://127.0.0.1:9999/fhir"),
            ("SEARCHCHECK_TRACE", "yes"),
            ("SEARCHCHECK_PAGE_SIZE", "7"),
            ("SEARCHCHECK_TOKEN", "secret"),
        ]
        .into_iter()
        .collect();

        let mut config = HarnessConfig::default();
        config
            .apply_env_from(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.base_url, "http://127.0.0.1:9999/fhir");
        assert!(config.trace);
        assert_eq!(config.default_page_size, 7);
        assert!(matches!(config.auth, AuthConfig::Static { .. }));
    }

    #[test]
    fn test_bad_flag_is_rejected() {
        let mut config = HarnessConfig::default();
        let err = config
            .apply_env_from(|k| (k == "SEARCHCHECK_FAIL_FAST").then(|| "maybe".to_string()))
            .unwrap_err();
        assert!(matches!(err, HarnessError::InvalidConfig(_)));
    }

    #[test]
    fn test_validate() {
        let mut config = HarnessConfig::default();
        config.validate().unwrap();

        config.base_url = "ftp://example.org".into();
        assert!(config.validate().is_err());

        config.base_url = "not a url".into();
        assert!(config.validate().is_err());

        config = HarnessConfig {
            default_page_size: 0,
            ..HarnessConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
