mod common;

use common::FakeServer;
use searchcheck_harness::scenarios::catalogue;
use searchcheck_harness::{ScenarioStatus, TestRunner};

fn runner(server: &FakeServer, config: searchcheck_harness::HarnessConfig) -> TestRunner {
    let client = server.client(&config);
    TestRunner::with_client(config, client)
}

#[tokio::test]
async fn catalogue_passes_against_a_conforming_server() {
    let server = FakeServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let runner = runner(&server, server.config(dir.path()));
    let scenarios = catalogue();

    let suite = runner.run_all(&scenarios).await;
    for result in suite.results.iter().filter(|r| !r.passed()) {
        eprintln!("{}: {:?} {:?}", result.name, result.status, result.error);
    }
    assert_eq!(suite.total, scenarios.len());
    assert_eq!(suite.failed, 0);
    assert_eq!(suite.skipped, 0);
    assert_eq!(suite.passed, scenarios.len());
}

#[tokio::test]
async fn core_profile_skips_optional_scenarios() {
    let server = FakeServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let runner = runner(&server, server.core_config(dir.path()));

    let suite = runner.run_all(&catalogue()).await;
    assert_eq!(suite.failed, 0);

    let skipped: Vec<&str> = suite
        .results
        .iter()
        .filter(|r| r.status == ScenarioStatus::Skipped)
        .map(|r| r.name.as_str())
        .collect();
    assert_eq!(skipped, vec!["strict-lenient-handling"]);
}

#[tokio::test]
async fn paging_tag_selects_paging_scenarios() {
    let server = FakeServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let runner = runner(&server, server.config(dir.path()));

    let suite = runner.run_tagged(&catalogue(), "paging").await;
    assert_eq!(suite.total, 3);
    assert!(suite.success());
}

#[tokio::test]
async fn named_scenario_writes_results() {
    let server = FakeServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let runner = runner(&server, server.config(dir.path()));

    let result = runner
        .run_named(&catalogue(), "observation-subject")
        .await
        .unwrap();
    assert!(result.passed());
    assert!(result.interactions.is_empty());

    let duration_ms = result.duration_ms;
    let suite = searchcheck_harness::SuiteResult::from_results(vec![result], duration_ms);
    let path = runner.write_results(&suite).unwrap();
    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(written["passed"], 1);
    assert!(!dir.path().join("interactions.json").exists());
}

#[tokio::test]
async fn unreachable_server_fails_with_interactions() {
    let port = common::unused_port().await;
    let dir = tempfile::tempdir().unwrap();
    let config = searchcheck_harness::HarnessConfig {
        base_url: format!("http://127.0.0.1:{}/fhir", port),
        output_dir: dir.path().to_path_buf(),
        verbose_errors: false,
        fail_fast: true,
        ..Default::default()
    };
    let client = searchcheck_harness::FetchClient::new(&config)
        .unwrap()
        .with_recorder(searchcheck_harness::InteractionRecorder::new());
    let runner = TestRunner::with_client(config, client);

    let suite = runner.run_all(&catalogue()).await;
    assert_eq!(suite.failed, 1);
    assert_eq!(suite.skipped, suite.total - 1);

    let failed = &suite.results[0];
    assert_eq!(failed.status, ScenarioStatus::Failed);
    assert!(failed.error.as_deref().unwrap().contains("Patient"));
    assert_eq!(failed.interactions.len(), 1);
    assert_eq!(failed.interactions[0].outcome.status(), -1);

    runner.write_results(&suite).unwrap();
    assert!(dir.path().join("interactions.json").exists());
}
