use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lime::build::BoxFuture;
use lime::errors::{LimeError, Result};
use lime::exec::Runner;

/// Shared view of a [`FakeRunner`].
#[derive(Debug, Default)]
pub struct RunnerProbe {
    /// Ordered log of "run" / "kill" calls that changed state.
    pub calls: Mutex<Vec<&'static str>>,
    pub live: AtomicUsize,
    pub max_live: AtomicUsize,
    /// Calls currently executing; > 1 means two calls overlapped.
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub fail_next_run: AtomicBool,
    pub stale: AtomicBool,
}

impl RunnerProbe {
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| **c == call).count()
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn max_live(&self) -> usize {
        self.max_live.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn enter(&self) {
        let n = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(n, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A runner that spawns nothing. `kill` takes `kill_delay` to "exit", which
/// widens the window for overlapping calls in concurrency tests.
pub struct FakeRunner {
    probe: Arc<RunnerProbe>,
    kill_delay: Duration,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self {
            probe: Arc::new(RunnerProbe::default()),
            kill_delay: Duration::ZERO,
        }
    }

    pub fn with_kill_delay(mut self, delay: Duration) -> Self {
        self.kill_delay = delay;
        self
    }

    pub fn probe(&self) -> Arc<RunnerProbe> {
        Arc::clone(&self.probe)
    }
}

impl Default for FakeRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl Runner for FakeRunner {
    fn run(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let p = &self.probe;
            p.enter();
            let out = if p.fail_next_run.swap(false, Ordering::SeqCst) {
                Err(LimeError::SpawnError("scripted spawn failure".to_string()))
            } else {
                if p.live.load(Ordering::SeqCst) == 0 {
                    let n = p.live.fetch_add(1, Ordering::SeqCst) + 1;
                    p.max_live.fetch_max(n, Ordering::SeqCst);
                    p.stale.store(false, Ordering::SeqCst);
                    p.calls.lock().unwrap().push("run");
                }
                Ok(())
            };
            p.leave();
            out
        })
    }

    fn kill(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let p = Arc::clone(&self.probe);
            p.enter();
            if p.live.load(Ordering::SeqCst) > 0 {
                tokio::time::sleep(self.kill_delay).await;
                p.live.fetch_sub(1, Ordering::SeqCst);
                p.calls.lock().unwrap().push("kill");
            }
            p.leave();
            Ok(())
        })
    }

    fn is_running(&mut self) -> bool {
        self.probe.live() > 0
    }

    fn needs_refresh(&mut self) -> bool {
        !self.is_running() || self.probe.stale.load(Ordering::SeqCst)
    }
}
