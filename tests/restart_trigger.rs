// tests/restart_trigger.rs

use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tempfile::tempdir;

use lime::engine::{Control, ControlOptions, Supervisor};
use lime::fs::RealFileSystem;
use lime::proxy::TriggerServer;
use lime_test_utils::builders::LimeConfigBuilder;
use lime_test_utils::fake_builder::FakeBuilder;
use lime_test_utils::fake_runner::FakeRunner;
use lime_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn control_with(runner: FakeRunner) -> Arc<Control> {
    Arc::new(Control::new(
        Box::new(FakeBuilder::new()),
        Box::new(runner),
        ControlOptions {
            settle: Duration::ZERO,
            ..ControlOptions::default()
        },
    ))
}

#[tokio::test]
async fn each_hit_performs_exactly_one_cycle() -> TestResult {
    init_tracing();

    let runner = FakeRunner::new();
    let probe = runner.probe();
    let control = control_with(runner);
    control.restart().await?;

    let trigger = TriggerServer::bind(Arc::clone(&control)).await?;
    assert!(trigger.local_addr()?.ip().is_loopback());
    let url = trigger.url()?;
    trigger.spawn();

    let resp = with_timeout(reqwest::get(format!("{url}/anything"))).await?;
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    assert_eq!(control.restart_cycles(), 2);
    assert_eq!(probe.calls(), vec!["run", "kill", "run"]);

    let resp = with_timeout(reqwest::Client::new().post(&url).send()).await?;
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    assert_eq!(control.restart_cycles(), 3);
    assert_eq!(probe.max_live(), 1);
    Ok(())
}

#[tokio::test]
async fn failed_start_is_a_bad_gateway() -> TestResult {
    init_tracing();

    let runner = FakeRunner::new();
    let probe = runner.probe();
    let control = control_with(runner);
    probe.fail_next_run.store(true, Ordering::SeqCst);

    let trigger = TriggerServer::bind(Arc::clone(&control)).await?;
    let url = trigger.url()?;
    trigger.spawn();

    let resp = with_timeout(reqwest::get(&url)).await?;
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_GATEWAY);
    assert!(resp.text().await?.contains("failed to start"));
    assert_eq!(probe.live(), 0);
    Ok(())
}

#[tokio::test]
async fn supervisor_binds_endpoint_without_a_proxy() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let config = LimeConfigBuilder::new(dir.path()).build();
    assert!(config.proxy.is_none());

    let runner = FakeRunner::new();
    let probe = runner.probe();
    let supervisor = Supervisor::new(
        config,
        Box::new(FakeBuilder::new()),
        Box::new(runner),
        Arc::new(RealFileSystem),
    );

    let trigger = supervisor.start_trigger().await?;
    let url = trigger.url()?;
    trigger.spawn();

    let resp = with_timeout(reqwest::get(&url)).await?;
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    assert_eq!(probe.calls(), vec!["run"]);
    Ok(())
}
