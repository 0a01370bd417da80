//! Interaction recorder
//!
//! Every request the fetch client executes lands here together with its
//! outcome, in call order. The log belongs to the scenario currently running:
//! the runner calls [`InteractionRecorder::reset`] exactly once at each
//! scenario boundary and nothing else removes entries.
//!
//! A process-wide instance is available through [`InteractionRecorder::global`]
//! for reporting code that has no handle on the scenario. Clones share the
//! same log.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::error::HarnessResult;
use crate::request::RequestSpec;
use crate::response::Outcome;

static GLOBAL: Lazy<InteractionRecorder> = Lazy::new(InteractionRecorder::new);

/// One request paired with what came back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpInteraction {
    /// Position in the current scenario's log, starting at 0
    pub sequence: usize,

    /// URL the request was resolved to (the raw path if resolution failed)
    pub url: String,

    pub request: RequestSpec,
    pub outcome: Outcome,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Default)]
pub struct InteractionRecorder {
    log: Arc<Mutex<Vec<HttpInteraction>>>,
}

impl InteractionRecorder {
    /// A recorder with its own log, independent of the global one
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global() -> &'static InteractionRecorder {
        &GLOBAL
    }

    /// Append an interaction to the log
    pub fn record(&self, request: RequestSpec, url: String, outcome: Outcome, elapsed_ms: u64) {
        let mut log = self.log.lock();
        let sequence = log.len();
        log.push(HttpInteraction {
            sequence,
            url,
            request,
            outcome,
            elapsed_ms,
        });
    }

    /// Clear the log at a scenario boundary
    pub fn reset(&self) {
        self.log.lock().clear();
    }

    /// Snapshot of the full log, in call order
    pub fn dump(&self) -> Vec<HttpInteraction> {
        self.log.lock().clone()
    }

    pub fn last(&self) -> Option<HttpInteraction> {
        self.log.lock().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.log.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.lock().is_empty()
    }

    /// Write the current log as pretty JSON for replay
    pub fn write_json(&self, path: &Path) -> HarnessResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.dump())?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
