// src/engine/control.rs

//! Serialised build / restart state.
//!
//! Every operation that touches the runner goes through one
//! `tokio::sync::Mutex`, so a watch-triggered restart, a request-triggered
//! restart and the shutdown kill can never interleave their `kill()` /
//! `run()` calls. Builds are serialised by a second lock and never hold the
//! runner lock while the toolchain runs; shutdown cancels a build in flight.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tracing::{debug, error, info, warn};

use crate::build::{BuildResult, Builder, remediate};
use crate::errors::Result;
use crate::exec::Runner;
use crate::types::{ChangeKind, RestartPolicy};

const SHUTTING_DOWN: &str = "supervisor is shutting down";

/// Pause after each build, letting the toolchain settle.
pub const BUILD_SETTLE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy)]
pub struct ControlOptions {
    /// Restart the application after every successful build.
    pub immediate: bool,
    /// Log build durations.
    pub verbose: bool,
    pub settle: Duration,
}

impl Default for ControlOptions {
    fn default() -> Self {
        Self {
            immediate: false,
            verbose: false,
            settle: BUILD_SETTLE,
        }
    }
}

/// What [`Control::ensure_fresh`] did for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// This call performed a kill/run cycle.
    Restarted,
    /// A cycle that began after the call arrived already covered it.
    Coalesced,
    /// The running process is current; nothing to do.
    AlreadyFresh,
}

struct ControlState {
    runner: Box<dyn Runner>,
}

/// Owner of the builder and the runner.
pub struct Control {
    builder: Box<dyn Builder>,
    state: Mutex<ControlState>,
    /// Held for the duration of a build; stores the latest result.
    builds: Mutex<Option<BuildResult>>,
    /// Flipped once by [`Control::shutdown`].
    closed: watch::Sender<bool>,
    /// Completed kill/run cycles.
    cycles: AtomicU64,
    options: ControlOptions,
}

impl std::fmt::Debug for Control {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Control")
            .field("binary", &self.builder.binary())
            .field("cycles", &self.cycles.load(Ordering::SeqCst))
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Control {
    pub fn new(builder: Box<dyn Builder>, runner: Box<dyn Runner>, options: ControlOptions) -> Self {
        Self {
            builder,
            state: Mutex::new(ControlState { runner }),
            builds: Mutex::new(None),
            closed: watch::Sender::new(false),
            cycles: AtomicU64::new(0),
            options,
        }
    }

    /// Number of completed restart cycles.
    pub fn restart_cycles(&self) -> u64 {
        self.cycles.load(Ordering::SeqCst)
    }

    /// Result of the most recent build, if any ran.
    pub async fn last_build(&self) -> Option<BuildResult> {
        self.builds.lock().await.clone()
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Dispatch a classified file change.
    pub async fn handle_change(&self, kind: ChangeKind) {
        match kind {
            ChangeKind::Build => {
                self.build().await;
            }
            ChangeKind::Restart => {
                if let Err(err) = self.restart().await {
                    error!(error = %err, "restart failed");
                }
            }
        }
    }

    /// Build once. On failure the running application is left alone and
    /// missing dependencies are fetched; on success the application is
    /// restarted when `immediate` is set.
    ///
    /// A shutdown while the toolchain runs drops the build (and with it the
    /// compiler process) and returns a failed result.
    pub async fn build(&self) -> BuildResult {
        let mut last = self.builds.lock().await;
        if self.is_closed() {
            return BuildResult::failed(SHUTTING_DOWN, Duration::ZERO);
        }

        info!("Build started");
        let result = tokio::select! {
            result = self.builder.build() => result,
            _ = closed(self.closed.subscribe()) => {
                info!("build abandoned: shutting down");
                return BuildResult::failed(SHUTTING_DOWN, Duration::ZERO);
            }
        };

        if result.success {
            info!("Build Successful");
            if self.options.verbose {
                info!("Build time: {:?}", result.duration);
            }
            if self.options.immediate {
                let mut state = self.state.lock().await;
                if !self.is_closed() {
                    if let Err(err) = self.cycle(&mut state).await {
                        error!(error = %err, "starting application after build failed");
                    }
                }
            }
        } else {
            error!("ERROR! Build failed");
            error!("{}", result.diagnostics);
            tokio::select! {
                fetched = remediate(self.builder.as_ref(), &result.diagnostics) => {
                    if fetched > 0 {
                        info!(fetched, "dependencies fetched; next change will rebuild");
                    }
                }
                _ = closed(self.closed.subscribe()) => {}
            }
        }

        *last = Some(result.clone());
        tokio::time::sleep(self.options.settle).await;
        result
    }

    /// Kill then run, unconditionally.
    pub async fn restart(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if self.is_closed() {
            return Ok(());
        }
        self.cycle(&mut state).await
    }

    /// Make sure a current backend is running before a request is forwarded.
    ///
    /// With [`RestartPolicy::Always`], a request is satisfied by any cycle
    /// that completes after it arrived, including one that was already in
    /// progress at that moment. Only a request that finds no such cycle
    /// restarts the application itself.
    pub async fn ensure_fresh(&self, policy: RestartPolicy) -> Result<Freshness> {
        let ticket = self.cycles.load(Ordering::SeqCst);
        let mut state = self.state.lock().await;
        if self.is_closed() {
            return Ok(Freshness::AlreadyFresh);
        }

        match policy {
            RestartPolicy::Always => {
                if self.cycles.load(Ordering::SeqCst) > ticket {
                    debug!(ticket, "restart already performed since request arrived");
                    return Ok(Freshness::Coalesced);
                }
            }
            RestartPolicy::WhenStale => {
                if !state.runner.needs_refresh() {
                    return Ok(Freshness::AlreadyFresh);
                }
            }
        }

        self.cycle(&mut state).await?;
        Ok(Freshness::Restarted)
    }

    /// Stop the application for good. Later calls to any operation are
    /// no-ops, so no child can be started after this returns.
    pub async fn shutdown(&self) {
        self.closed.send_replace(true);
        let mut state = self.state.lock().await;
        if let Err(err) = state.runner.kill().await {
            warn!(error = %err, "Error killing application");
        }
    }

    /// A failed kill aborts the cycle so two instances never overlap.
    async fn cycle(&self, state: &mut ControlState) -> Result<()> {
        state.runner.kill().await?;
        state.runner.run().await?;
        self.cycles.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Resolves once the closed flag is set.
async fn closed(mut rx: watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
