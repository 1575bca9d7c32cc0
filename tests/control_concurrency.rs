// tests/control_concurrency.rs

use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use lime::engine::{Control, ControlOptions, Freshness};
use lime::types::{ChangeKind, RestartPolicy};
use lime_test_utils::fake_builder::FakeBuilder;
use lime_test_utils::fake_runner::FakeRunner;
use lime_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn control_with(runner: FakeRunner, immediate: bool) -> Arc<Control> {
    Arc::new(Control::new(
        Box::new(FakeBuilder::new()),
        Box::new(runner),
        ControlOptions {
            immediate,
            verbose: false,
            settle: Duration::ZERO,
        },
    ))
}

#[tokio::test]
async fn concurrent_requests_share_one_restart() -> TestResult {
    init_tracing();

    let runner = FakeRunner::new().with_kill_delay(Duration::from_millis(50));
    let probe = runner.probe();
    let control = control_with(runner, false);
    control.restart().await?;
    assert_eq!(control.restart_cycles(), 1);

    let policy = RestartPolicy::Always;
    let (a, b, c, d, e) = with_timeout(async {
        tokio::join!(
            control.ensure_fresh(policy),
            control.ensure_fresh(policy),
            control.ensure_fresh(policy),
            control.ensure_fresh(policy),
            control.ensure_fresh(policy),
        )
    })
    .await;

    let outcomes = [a?, b?, c?, d?, e?];
    let restarted = outcomes.iter().filter(|o| **o == Freshness::Restarted).count();
    let coalesced = outcomes.iter().filter(|o| **o == Freshness::Coalesced).count();

    assert_eq!(restarted, 1);
    assert_eq!(coalesced, 4);
    assert_eq!(control.restart_cycles(), 2);
    assert_eq!(probe.max_live(), 1);
    assert_eq!(probe.max_in_flight(), 1);
    Ok(())
}

#[tokio::test]
async fn sequential_requests_each_restart_under_always_policy() -> TestResult {
    init_tracing();

    let runner = FakeRunner::new();
    let probe = runner.probe();
    let control = control_with(runner, false);

    for _ in 0..3 {
        assert_eq!(
            control.ensure_fresh(RestartPolicy::Always).await?,
            Freshness::Restarted
        );
    }
    assert_eq!(probe.calls(), vec!["run", "kill", "run", "kill", "run"]);
    Ok(())
}

#[tokio::test]
async fn when_stale_policy_only_restarts_stale_backends() -> TestResult {
    init_tracing();

    let runner = FakeRunner::new();
    let probe = runner.probe();
    let control = control_with(runner, false);

    assert_eq!(
        control.ensure_fresh(RestartPolicy::WhenStale).await?,
        Freshness::Restarted,
        "nothing running yet"
    );
    assert_eq!(
        control.ensure_fresh(RestartPolicy::WhenStale).await?,
        Freshness::AlreadyFresh
    );

    probe.stale.store(true, Ordering::SeqCst);
    assert_eq!(
        control.ensure_fresh(RestartPolicy::WhenStale).await?,
        Freshness::Restarted
    );
    assert_eq!(probe.count("run"), 2);
    Ok(())
}

#[tokio::test]
async fn watch_and_proxy_restarts_never_overlap() -> TestResult {
    init_tracing();

    let runner = FakeRunner::new().with_kill_delay(Duration::from_millis(20));
    let probe = runner.probe();
    let control = control_with(runner, true);
    control.restart().await?;

    let mut tasks = Vec::new();
    for i in 0..12 {
        let control = Arc::clone(&control);
        tasks.push(tokio::spawn(async move {
            match i % 3 {
                0 => control.handle_change(ChangeKind::Build).await,
                1 => control.handle_change(ChangeKind::Restart).await,
                _ => {
                    let _ = control.ensure_fresh(RestartPolicy::Always).await;
                }
            }
        }));
    }
    for task in tasks {
        with_timeout(task).await?;
    }

    assert_eq!(probe.max_in_flight(), 1);
    assert_eq!(probe.max_live(), 1);
    assert_eq!(probe.live(), 1);
    Ok(())
}

#[tokio::test]
async fn spawn_failure_is_reported_and_leaves_nothing_running() -> TestResult {
    init_tracing();

    let runner = FakeRunner::new();
    let probe = runner.probe();
    let control = control_with(runner, false);
    probe.fail_next_run.store(true, Ordering::SeqCst);

    assert!(control.ensure_fresh(RestartPolicy::Always).await.is_err());
    assert_eq!(probe.live(), 0);
    assert_eq!(control.restart_cycles(), 0);

    assert_eq!(
        control.ensure_fresh(RestartPolicy::Always).await?,
        Freshness::Restarted
    );
    assert_eq!(probe.live(), 1);
    Ok(())
}

#[tokio::test]
async fn nothing_starts_after_shutdown() -> TestResult {
    init_tracing();

    let builder = FakeBuilder::new();
    let builds = builder.probe();
    let runner = FakeRunner::new();
    let probe = runner.probe();
    let control = Arc::new(Control::new(
        Box::new(builder),
        Box::new(runner),
        ControlOptions {
            immediate: true,
            verbose: false,
            settle: Duration::ZERO,
        },
    ));
    control.restart().await?;

    control.shutdown().await;
    assert_eq!(probe.live(), 0);

    control.restart().await?;
    control.handle_change(ChangeKind::Build).await;
    let freshness = control.ensure_fresh(RestartPolicy::Always).await?;

    assert_eq!(freshness, Freshness::AlreadyFresh);
    assert_eq!(builds.builds(), 0);
    assert_eq!(probe.calls(), vec!["run", "kill"]);
    Ok(())
}

#[tokio::test]
async fn shutdown_cancels_a_build_in_progress() -> TestResult {
    init_tracing();

    let builder = FakeBuilder::new().with_build_delay(Duration::from_secs(10));
    let builds = builder.probe();
    let runner = FakeRunner::new();
    let probe = runner.probe();
    let control = Arc::new(Control::new(
        Box::new(builder),
        Box::new(runner),
        ControlOptions {
            immediate: true,
            verbose: false,
            settle: Duration::ZERO,
        },
    ));
    control.restart().await?;

    let building = tokio::spawn({
        let control = Arc::clone(&control);
        async move { control.build().await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(builds.builds(), 1);

    let started = std::time::Instant::now();
    with_timeout(control.shutdown()).await;
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(probe.live(), 0);

    let result = with_timeout(building).await?;
    assert!(!result.success);
    assert_eq!(probe.calls(), vec!["run", "kill"]);
    Ok(())
}

#[tokio::test]
async fn restarts_proceed_while_a_build_runs() -> TestResult {
    init_tracing();

    let builder = FakeBuilder::new().with_build_delay(Duration::from_millis(300));
    let runner = FakeRunner::new();
    let probe = runner.probe();
    let control = Arc::new(Control::new(
        Box::new(builder),
        Box::new(runner),
        ControlOptions {
            immediate: false,
            verbose: false,
            settle: Duration::ZERO,
        },
    ));

    let building = tokio::spawn({
        let control = Arc::clone(&control);
        async move { control.build().await }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;

    let started = std::time::Instant::now();
    control.restart().await?;
    assert!(started.elapsed() < Duration::from_millis(250));
    assert_eq!(probe.live(), 1);

    assert!(with_timeout(building).await?.success);
    Ok(())
}

#[tokio::test]
async fn request_during_a_running_cycle_is_covered_by_it() -> TestResult {
    init_tracing();

    let runner = FakeRunner::new().with_kill_delay(Duration::from_millis(200));
    let probe = runner.probe();
    let control = control_with(runner, false);
    control.restart().await?;

    let cycling = tokio::spawn({
        let control = Arc::clone(&control);
        async move { control.restart().await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let freshness = with_timeout(control.ensure_fresh(RestartPolicy::Always)).await?;
    with_timeout(cycling).await??;

    assert_eq!(freshness, Freshness::Coalesced);
    assert_eq!(control.restart_cycles(), 2);
    assert_eq!(probe.count("run"), 2);
    Ok(())
}
