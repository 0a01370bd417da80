//! Run Command

use anyhow::{bail, Result};
use clap::Args;
use serde::Serialize;

use searchcheck_harness::scenarios::catalogue;
use searchcheck_harness::{HarnessConfig, ScenarioResult, ScenarioStatus, SuiteResult, TestRunner};

use crate::output::{print_report, print_warning, OutputFormat, TableDisplay};

#[derive(Args)]
pub struct RunArgs {
    /// Only run scenarios carrying this tag
    #[arg(long)]
    pub tag: Option<String>,

    /// Run a single scenario by name
    #[arg(long, conflicts_with = "tag")]
    pub name: Option<String>,
}

/// Scenario result display wrapper
#[derive(Serialize)]
pub struct ResultDisplay {
    pub name: String,
    pub status: ScenarioStatus,
    pub duration_ms: u64,
    pub detail: String,
}

impl From<&ScenarioResult> for ResultDisplay {
    fn from(result: &ScenarioResult) -> Self {
        let detail = match result.status {
            ScenarioStatus::Passed => String::new(),
            ScenarioStatus::Failed => result.error.clone().unwrap_or_default(),
            ScenarioStatus::Skipped => result.skip_reason.clone().unwrap_or_default(),
        };
        Self {
            name: result.name.clone(),
            status: result.status,
            duration_ms: result.duration_ms,
            detail,
        }
    }
}

impl TableDisplay for ResultDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Scenario", "Status", "Duration", "Detail"]
    }

    fn row(&self) -> Vec<String> {
        let status = match self.status {
            ScenarioStatus::Passed => "✓ passed",
            ScenarioStatus::Failed => "✗ failed",
            ScenarioStatus::Skipped => "- skipped",
        };
        vec![
            self.name.clone(),
            status.to_string(),
            format!("{}ms", self.duration_ms),
            self.detail.clone(),
        ]
    }
}

/// Run the selected scenarios. Returns the process exit code: 0 when nothing
/// failed, 1 otherwise.
pub async fn execute(args: RunArgs, config: HarnessConfig, format: OutputFormat) -> Result<i32> {
    let runner = TestRunner::new(config)?;
    let scenarios = catalogue();

    let suite = match (&args.name, &args.tag) {
        (Some(name), _) => {
            let result = runner.run_named(&scenarios, name).await?;
            let duration_ms = result.duration_ms;
            SuiteResult::from_results(vec![result], duration_ms)
        }
        (None, Some(tag)) => {
            if !scenarios.iter().any(|s| s.tags().contains(&tag.as_str())) {
                bail!("no scenario carries the tag '{}'", tag);
            }
            runner.run_tagged(&scenarios, tag).await
        }
        (None, None) => runner.run_all(&scenarios).await,
    };

    runner.write_results(&suite)?;

    let rows: Vec<ResultDisplay> = suite.results.iter().map(ResultDisplay::from).collect();
    let summary = format!(
        "{} passed, {} failed, {} skipped in {}ms",
        suite.passed, suite.failed, suite.skipped, suite.duration_ms
    );
    print_report(&suite, &rows, &summary, suite.success(), format);

    if suite.total > 0 && suite.skipped == suite.total {
        print_warning("every selected scenario was skipped; check the capability profile");
    }

    Ok(if suite.success() { 0 } else { 1 })
}
