// src/exec/runner.rs

//! Child process runner.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, SystemTime};

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::build::BoxFuture;
use crate::config::RunConfig;
use crate::errors::{LimeError, Result};
use crate::types::OutputMode;

/// How long a child gets to exit after the soft signal before it is killed.
pub const DEFAULT_KILL_GRACE: Duration = Duration::from_secs(3);

/// Trait abstracting the lifecycle of the supervised process.
///
/// Production code uses [`ProcessRunner`]; tests provide fakes that only
/// record calls.
pub trait Runner: Send {
    /// Start the binary unless it is already running. Returns right after
    /// spawning.
    fn run(&mut self) -> BoxFuture<'_, Result<()>>;

    /// Stop the current child, if any, and wait until it has exited.
    fn kill(&mut self) -> BoxFuture<'_, Result<()>>;

    /// Whether a child is currently alive.
    fn is_running(&mut self) -> bool;

    /// True when no child is running or the binary on disk is newer than
    /// the running child.
    fn needs_refresh(&mut self) -> bool;
}

enum RunnerState {
    NotRunning,
    Running { child: Child, started: SystemTime },
}

/// Owns at most one child process of the built binary.
pub struct ProcessRunner {
    binary: PathBuf,
    args: Vec<String>,
    env: Vec<(String, String)>,
    output: OutputMode,
    grace: Duration,
    state: RunnerState,
}

impl std::fmt::Debug for ProcessRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessRunner")
            .field("binary", &self.binary)
            .field("args", &self.args)
            .field("pid", &self.pid())
            .finish_non_exhaustive()
    }
}

impl ProcessRunner {
    pub fn new(binary: impl Into<PathBuf>, cfg: &RunConfig) -> Self {
        Self {
            binary: binary.into(),
            args: cfg.args.clone(),
            env: cfg.env.clone(),
            output: cfg.output,
            grace: DEFAULT_KILL_GRACE,
            state: RunnerState::NotRunning,
        }
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Pid of the current child, if one was spawned and not yet reaped.
    pub fn pid(&self) -> Option<u32> {
        match &self.state {
            RunnerState::Running { child, .. } => child.id(),
            RunnerState::NotRunning => None,
        }
    }

    fn spawn(&mut self) -> Result<()> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(&self.args)
            .envs(self.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .kill_on_drop(true);

        match self.output {
            OutputMode::Inherit => {
                cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
            }
            OutputMode::Log => {
                cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
            }
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| LimeError::SpawnError(format!("{:?}: {e}", self.binary)))?;

        if let Some(stdout) = child.stdout.take() {
            forward_lines(stdout, "stdout");
        }
        if let Some(stderr) = child.stderr.take() {
            forward_lines(stderr, "stderr");
        }

        info!(binary = ?self.binary, pid = ?child.id(), "started application");
        self.state = RunnerState::Running {
            child,
            started: SystemTime::now(),
        };
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        let RunnerState::Running { mut child, .. } =
            std::mem::replace(&mut self.state, RunnerState::NotRunning)
        else {
            return Ok(());
        };

        if let Ok(Some(status)) = child.try_wait() {
            debug!(%status, "application had already exited");
            return Ok(());
        }

        let pid = child.id();
        send_soft_stop(&mut child);

        match tokio::time::timeout(self.grace, child.wait()).await {
            Ok(status) => {
                let status = status.context("waiting for application to exit")?;
                info!(pid = ?pid, %status, "application stopped");
            }
            Err(_) => {
                warn!(pid = ?pid, grace = ?self.grace, "application ignored stop signal; killing");
                child
                    .kill()
                    .await
                    .context("force-killing application")?;
            }
        }
        Ok(())
    }
}

impl Runner for ProcessRunner {
    fn run(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            if self.is_running() {
                debug!(pid = ?self.pid(), "application already running; run is a no-op");
                return Ok(());
            }
            self.spawn()
        })
    }

    fn kill(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(self.stop())
    }

    fn is_running(&mut self) -> bool {
        let RunnerState::Running { child, .. } = &mut self.state else {
            return false;
        };
        match child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                info!(%status, "application exited");
                self.state = RunnerState::NotRunning;
                false
            }
            Err(err) => {
                warn!(error = %err, "cannot query application status");
                true
            }
        }
    }

    fn needs_refresh(&mut self) -> bool {
        if !self.is_running() {
            return true;
        }
        let RunnerState::Running { started, .. } = &self.state else {
            return true;
        };
        match std::fs::metadata(&self.binary).and_then(|m| m.modified()) {
            Ok(mtime) => mtime > *started,
            Err(_) => true,
        }
    }
}

/// Ask the child to shut down: SIGINT on unix, a hard kill elsewhere.
#[cfg(unix)]
fn send_soft_stop(child: &mut Child) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id().and_then(|p| i32::try_from(p).ok()) else {
        return;
    };
    if let Err(errno) = kill(Pid::from_raw(pid), Signal::SIGINT) {
        debug!(pid, %errno, "sending SIGINT failed");
    }
}

#[cfg(not(unix))]
fn send_soft_stop(child: &mut Child) {
    if let Err(err) = child.start_kill() {
        debug!(error = %err, "start_kill failed");
    }
}

/// Consume a child pipe and emit each line through tracing.
fn forward_lines<R>(pipe: R, stream: &'static str)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(pipe).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            info!(target: "lime::app", stream, "{}", line);
        }
    });
}
