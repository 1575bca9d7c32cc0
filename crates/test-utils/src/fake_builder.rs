use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lime::build::{BoxFuture, BuildResult, Builder};
use lime::errors::Result;

/// Shared view of what a [`FakeBuilder`] was asked to do.
#[derive(Debug, Default)]
pub struct BuilderProbe {
    pub builds: Mutex<usize>,
    pub fetched: Mutex<Vec<String>>,
}

impl BuilderProbe {
    pub fn builds(&self) -> usize {
        *self.builds.lock().unwrap()
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

/// A builder that:
/// - pops scripted results (success once the script is exhausted)
/// - records each build and each dependency fetch
/// - optionally takes `build_delay` to finish, like a slow toolchain.
pub struct FakeBuilder {
    binary: PathBuf,
    build_delay: Duration,
    script: Mutex<VecDeque<BuildResult>>,
    probe: Arc<BuilderProbe>,
}

impl FakeBuilder {
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from("/tmp/lime-fake-bin"),
            build_delay: Duration::ZERO,
            script: Mutex::new(VecDeque::new()),
            probe: Arc::new(BuilderProbe::default()),
        }
    }

    pub fn with_build_delay(mut self, delay: Duration) -> Self {
        self.build_delay = delay;
        self
    }

    /// Queue a failing build with the given diagnostics.
    pub fn then_fail(self, diagnostics: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(BuildResult::failed(diagnostics, Duration::from_millis(1)));
        self
    }

    /// Queue a successful build.
    pub fn then_succeed(self) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(BuildResult::ok(Duration::from_millis(1)));
        self
    }

    pub fn probe(&self) -> Arc<BuilderProbe> {
        Arc::clone(&self.probe)
    }
}

impl Default for FakeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder for FakeBuilder {
    fn binary(&self) -> &Path {
        &self.binary
    }

    fn build(&self) -> BoxFuture<'_, BuildResult> {
        Box::pin(async move {
            *self.probe.builds.lock().unwrap() += 1;
            if !self.build_delay.is_zero() {
                tokio::time::sleep(self.build_delay).await;
            }
            let next = self.script.lock().unwrap().pop_front();
            next.unwrap_or_else(|| BuildResult::ok(Duration::from_millis(1)))
        })
    }

    fn fetch_dependency<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.probe.fetched.lock().unwrap().push(name.to_string());
            Ok(())
        })
    }
}
