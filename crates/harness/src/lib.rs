//! searchcheck harness
//!
//! This crate drives a remote FHIR server through its search API and checks
//! that the observed behaviour matches the expected search semantics. The
//! server owns all search logic; the harness only sees HTTP and JSON.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Scenario Runner (TestRunner)                │
//! ├─────────────────────────────────────────────────────────────┤
//! │  for each Scenario:                                         │
//! │    ├── recorder.reset()                                     │
//! │    ├── capabilities gate -> skipped | run                   │
//! │    ├── run(ScenarioContext)                                 │
//! │    │     ├── ResourceFactory  -> tagged fixtures            │
//! │    │     ├── SearchClient     -> ResponseRecord             │
//! │    │     └── PaginationWalker -> Traversal                  │
//! │    └── on failure: recorder.dump() into the result          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  FetchClient                                                │
//! │    ├── resolve(path) against base URL                       │
//! │    ├── TokenProvider -> Authorization: Bearer …             │
//! │    ├── send once, never retry                               │
//! │    └── InteractionRecorder.record(request, outcome)         │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod bundle;
pub mod capability;
pub mod check;
pub mod config;
pub mod error;
pub mod fetch;
pub mod fixture;
pub mod pagination;
pub mod recorder;
pub mod request;
pub mod response;
pub mod runner;
pub mod scenarios;
pub mod search;
pub mod tag;

pub use bundle::{Bundle, BundleEntry, BundleLink, OperationOutcome, SearchMode};
pub use capability::{Capabilities, Capability, CapabilityProfile};
pub use config::HarnessConfig;
pub use error::{HarnessError, HarnessResult};
pub use fetch::FetchClient;
pub use fixture::{Fixture, PendingFixture, ResourceFactory};
pub use pagination::{LinkResolver, PaginationWalker, Traversal};
pub use recorder::{HttpInteraction, InteractionRecorder};
pub use request::{Method, RequestSpec};
pub use response::{Outcome, ResponseRecord};
pub use runner::{Scenario, ScenarioContext, ScenarioResult, ScenarioStatus, SuiteResult, TestRunner};
pub use search::{Handling, SearchClient, SearchMethod, SearchOptions};
pub use tag::UniquenessTag;
