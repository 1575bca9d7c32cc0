// tests/process_runner.rs
#![cfg(unix)]

use std::error::Error;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::time::{Duration, Instant, SystemTime};

use nix::sys::signal::kill;
use nix::unistd::Pid;
use tempfile::tempdir;

use lime::config::RunConfig;
use lime::exec::{ProcessRunner, Runner};
use lime::types::OutputMode;
use lime_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn shell(script: &str) -> ProcessRunner {
    let cfg = RunConfig {
        args: vec!["-c".to_string(), script.to_string()],
        output: OutputMode::Log,
        env: vec![("PORT".to_string(), "4001".to_string())],
    };
    ProcessRunner::new("/bin/sh", &cfg).with_grace(Duration::from_millis(500))
}

fn alive(pid: u32) -> bool {
    kill(Pid::from_raw(pid as i32), None).is_ok()
}

#[tokio::test]
async fn kill_then_run_never_leaves_two_processes() -> TestResult {
    init_tracing();

    let mut runner = shell("exec sleep 30");
    runner.run().await?;
    let first = runner.pid().expect("child spawned");
    assert!(alive(first));

    runner.kill().await?;
    assert!(!alive(first), "old child must be gone before run");
    runner.run().await?;
    let second = runner.pid().expect("child spawned");

    assert_ne!(first, second);
    assert!(alive(second));
    assert!(!alive(first));

    runner.kill().await?;
    assert!(!alive(second));
    assert!(!runner.is_running());
    Ok(())
}

#[tokio::test]
async fn run_while_running_keeps_the_same_child() -> TestResult {
    init_tracing();

    let mut runner = shell("exec sleep 30");
    runner.run().await?;
    let pid = runner.pid();
    runner.run().await?;
    assert_eq!(runner.pid(), pid);

    runner.kill().await?;
    Ok(())
}

#[tokio::test]
async fn kill_without_child_is_a_noop() -> TestResult {
    init_tracing();

    let mut runner = shell("exec sleep 30");
    runner.kill().await?;
    runner.kill().await?;
    assert!(runner.pid().is_none());
    Ok(())
}

#[tokio::test]
async fn child_ignoring_interrupt_is_force_killed_after_grace() -> TestResult {
    init_tracing();

    // Ignored dispositions survive exec, so sleep ignores SIGINT too.
    let mut runner = shell("trap '' INT; exec sleep 30");
    runner.run().await?;
    let pid = runner.pid().expect("child spawned");
    tokio::time::sleep(Duration::from_millis(100)).await;

    let started = Instant::now();
    with_timeout(runner.kill()).await?;
    assert!(started.elapsed() >= Duration::from_millis(500));
    assert!(!alive(pid));
    Ok(())
}

#[tokio::test]
async fn exited_child_is_noticed_and_restartable() -> TestResult {
    init_tracing();

    // Exits early unless PORT reached the child.
    let mut runner = shell(r#"test "$PORT" = 4001 || exit 3; exec sleep 30"#);
    runner.run().await?;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(runner.is_running(), "PORT should be passed to the child");
    runner.kill().await?;

    let mut short = shell("exit 0");
    short.run().await?;
    let deadline = Instant::now() + Duration::from_secs(5);
    while short.is_running() {
        assert!(Instant::now() < deadline, "child never exited");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(short.needs_refresh());
    short.run().await?;
    short.kill().await?;
    Ok(())
}

#[tokio::test]
async fn missing_binary_is_a_spawn_error() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let cfg = RunConfig {
        args: Vec::new(),
        output: OutputMode::Inherit,
        env: Vec::new(),
    };
    let mut runner = ProcessRunner::new(dir.path().join("nope"), &cfg);

    let err = runner.run().await.expect_err("spawn must fail");
    assert!(matches!(err, lime::errors::LimeError::SpawnError(_)));
    assert!(!runner.is_running());
    Ok(())
}

#[tokio::test]
async fn newer_binary_marks_running_child_stale() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let bin = dir.path().join("app");
    fs::write(&bin, "#!/bin/sh\nexec sleep 30\n")?;
    fs::set_permissions(&bin, fs::Permissions::from_mode(0o755))?;
    let old = SystemTime::now() - Duration::from_secs(60);
    fs::File::open(&bin)?.set_modified(old)?;

    let cfg = RunConfig {
        args: Vec::new(),
        output: OutputMode::Inherit,
        env: Vec::new(),
    };
    let mut runner = ProcessRunner::new(&bin, &cfg);
    runner.run().await?;
    assert!(!runner.needs_refresh());

    let newer = SystemTime::now() + Duration::from_secs(60);
    fs::File::open(&bin)?.set_modified(newer)?;
    assert!(runner.needs_refresh());

    runner.kill().await?;
    Ok(())
}
