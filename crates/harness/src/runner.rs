//! Scenario runner: capability gating, recorder boundaries and reporting

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, error, info};

use crate::capability::{Capabilities, Capability};
use crate::config::HarnessConfig;
use crate::error::{HarnessError, HarnessResult};
use crate::fetch::FetchClient;
use crate::fixture::ResourceFactory;
use crate::pagination::PaginationWalker;
use crate::recorder::{HttpInteraction, InteractionRecorder};
use crate::search::SearchClient;
use crate::tag::UniquenessTag;

/// One declarative check against the server
#[async_trait]
pub trait Scenario: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str {
        ""
    }

    fn tags(&self) -> &'static [&'static str] {
        &[]
    }

    /// Capabilities the server must claim for this scenario to apply
    fn requires(&self) -> &'static [Capability] {
        &[]
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> HarnessResult<()>;
}

/// Everything a scenario body gets to work with. Built fresh, with a new
/// uniqueness tag, for every scenario.
pub struct ScenarioContext {
    pub capabilities: Capabilities,
    pub client: FetchClient,
    pub factory: ResourceFactory,
    pub search: SearchClient,
    pub walker: PaginationWalker,
    pub tag: UniquenessTag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    Passed,
    Failed,
    Skipped,
}

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub status: ScenarioStatus,
    pub duration_ms: u64,
    pub error: Option<String>,
    /// Why the scenario did not run
    pub skip_reason: Option<String>,
    /// Recorder log, kept only for failures
    pub interactions: Vec<HttpInteraction>,
}

impl ScenarioResult {
    fn skipped(name: &str, reason: String) -> Self {
        Self {
            name: name.to_string(),
            status: ScenarioStatus::Skipped,
            duration_ms: 0,
            error: None,
            skip_reason: Some(reason),
            interactions: vec![],
        }
    }

    pub fn passed(&self) -> bool {
        self.status == ScenarioStatus::Passed
    }
}

/// Result of running a set of scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub results: Vec<ScenarioResult>,
}

impl SuiteResult {
    pub fn from_results(results: Vec<ScenarioResult>, duration_ms: u64) -> Self {
        let count = |status| results.iter().filter(|r| r.status == status).count();
        Self {
            total: results.len(),
            passed: count(ScenarioStatus::Passed),
            failed: count(ScenarioStatus::Failed),
            skipped: count(ScenarioStatus::Skipped),
            duration_ms,
            results,
        }
    }

    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

pub struct TestRunner {
    config: HarnessConfig,
    capabilities: Capabilities,
    client: FetchClient,
}

impl TestRunner {
    /// Build a runner whose client records into the global recorder
    pub fn new(config: HarnessConfig) -> HarnessResult<Self> {
        config.validate()?;
        let client = FetchClient::new(&config)?;
        Ok(Self::with_client(config, client))
    }

    pub fn with_client(config: HarnessConfig, client: FetchClient) -> Self {
        Self {
            capabilities: Capabilities::resolve(&config),
            config,
            client,
        }
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn recorder(&self) -> &InteractionRecorder {
        self.client.recorder()
    }

    /// Fresh context with a new tag
    pub fn context(&self) -> ScenarioContext {
        let tag = UniquenessTag::new();
        ScenarioContext {
            capabilities: self.capabilities.clone(),
            client: self.client.clone(),
            factory: ResourceFactory::new(self.client.clone(), tag.clone(), &self.config.tag_system),
            search: SearchClient::new(self.client.clone(), &self.config.tag_system),
            walker: PaginationWalker::new(
                self.client.clone(),
                self.config.default_page_size,
                self.config.max_pages,
            ),
            tag,
        }
    }

    /// Run every scenario carrying `tag`
    pub async fn run_tagged(&self, scenarios: &[Box<dyn Scenario>], tag: &str) -> SuiteResult {
        let selected: Vec<&dyn Scenario> = scenarios
            .iter()
            .filter(|s| s.tags().contains(&tag))
            .map(|s| s.as_ref())
            .collect();
        self.run_selected(&selected).await
    }

    /// Run one scenario by name
    pub async fn run_named(
        &self,
        scenarios: &[Box<dyn Scenario>],
        name: &str,
    ) -> HarnessResult<ScenarioResult> {
        let scenario = scenarios
            .iter()
            .find(|s| s.name() == name)
            .ok_or_else(|| HarnessError::ScenarioNotFound(name.to_string()))?;
        Ok(self.run_scenario(scenario.as_ref()).await)
    }

    pub async fn run_all(&self, scenarios: &[Box<dyn Scenario>]) -> SuiteResult {
        let selected: Vec<&dyn Scenario> = scenarios.iter().map(|s| s.as_ref()).collect();
        self.run_selected(&selected).await
    }

    async fn run_selected(&self, scenarios: &[&dyn Scenario]) -> SuiteResult {
        let start = Instant::now();
        let mut results = Vec::with_capacity(scenarios.len());
        let mut aborted = false;

        info!("Running {} scenario(s) against {}", scenarios.len(), self.capabilities.base_url());

        for scenario in scenarios {
            if aborted {
                results.push(ScenarioResult::skipped(
                    scenario.name(),
                    "fail-fast: an earlier scenario failed".into(),
                ));
                continue;
            }

            let result = self.run_scenario(*scenario).await;
            match result.status {
                ScenarioStatus::Passed => info!("✓ {} ({} ms)", result.name, result.duration_ms),
                ScenarioStatus::Skipped => info!(
                    "- {} (skipped: {})",
                    result.name,
                    result.skip_reason.as_deref().unwrap_or("")
                ),
                ScenarioStatus::Failed => {
                    error!(
                        "✗ {} - {}",
                        result.name,
                        result.error.as_deref().unwrap_or("unknown error")
                    );
                    if self.config.fail_fast {
                        aborted = true;
                    }
                }
            }
            results.push(result);
        }

        let suite = SuiteResult::from_results(results, start.elapsed().as_millis() as u64);
        info!(
            "Scenario results: {} passed, {} failed, {} skipped ({} ms)",
            suite.passed, suite.failed, suite.skipped, suite.duration_ms
        );
        suite
    }

    /// Run a single scenario. The recorder is reset first; a failure carries
    /// the recorder log with it.
    pub async fn run_scenario(&self, scenario: &dyn Scenario) -> ScenarioResult {
        self.recorder().reset();

        if let Some(missing) = self.capabilities.missing(scenario.requires()) {
            return ScenarioResult::skipped(
                scenario.name(),
                format!("server does not claim {}", missing),
            );
        }

        let start = Instant::now();
        let mut ctx = self.context();
        debug!("Running scenario {} with tag {}", scenario.name(), ctx.tag);

        let outcome = scenario.run(&mut ctx).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(()) => ScenarioResult {
                name: scenario.name().to_string(),
                status: ScenarioStatus::Passed,
                duration_ms,
                error: None,
                skip_reason: None,
                interactions: vec![],
            },
            Err(e) => ScenarioResult {
                name: scenario.name().to_string(),
                status: ScenarioStatus::Failed,
                duration_ms,
                error: Some(e.to_string()),
                skip_reason: None,
                interactions: self.recorder().dump(),
            },
        }
    }

    /// Write results to `test-results.json`, and the interactions of every
    /// failed scenario to `interactions.json`
    pub fn write_results(&self, results: &SuiteResult) -> HarnessResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let path = self.config.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        let failed: Vec<(&str, &[HttpInteraction])> = results
            .results
            .iter()
            .filter(|r| r.status == ScenarioStatus::Failed)
            .map(|r| (r.name.as_str(), r.interactions.as_slice()))
            .collect();
        if !failed.is_empty() {
            let replay: std::collections::BTreeMap<&str, &[HttpInteraction]> =
                failed.into_iter().collect();
            let replay_path = self.config.output_dir.join("interactions.json");
            std::fs::write(&replay_path, serde_json::to_string_pretty(&replay)?)?;
            info!("Failed interactions written to: {}", replay_path.display());
        }

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}
