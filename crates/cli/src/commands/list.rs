//! List Command

use serde::Serialize;

use searchcheck_harness::scenarios::catalogue;
use searchcheck_harness::{Capabilities, HarnessConfig};

use crate::output::{print_list, OutputFormat, TableDisplay};

/// Scenario display wrapper
#[derive(Serialize)]
pub struct ScenarioDisplay {
    pub name: String,
    pub tags: Vec<String>,
    pub requires: Vec<String>,
    pub runs: bool,
    pub description: String,
}

impl TableDisplay for ScenarioDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Scenario", "Tags", "Requires", "Runs", "Description"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.tags.join(", "),
            self.requires.join(", "),
            if self.runs { "yes" } else { "skipped" }.to_string(),
            self.description.clone(),
        ]
    }
}

/// List the catalogue and whether each scenario would run against the
/// configured capabilities
pub fn execute(config: &HarnessConfig, format: OutputFormat) {
    let capabilities = Capabilities::resolve(config);
    let items: Vec<ScenarioDisplay> = catalogue()
        .iter()
        .map(|s| ScenarioDisplay {
            name: s.name().to_string(),
            tags: s.tags().iter().map(|t| t.to_string()).collect(),
            requires: s.requires().iter().map(|c| c.to_string()).collect(),
            runs: capabilities.missing(s.requires()).is_none(),
            description: s.description().to_string(),
        })
        .collect();

    print_list(&items, format);
}
