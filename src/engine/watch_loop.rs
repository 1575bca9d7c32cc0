// src/engine/watch_loop.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tracing::{debug, info, warn};

use crate::engine::control::Control;
use crate::fs::FileSystem;
use crate::watch::{ChangeEvent, Watermark, WatchPatterns, scan};

/// Polls every watch root once per cycle and hands at most one change per
/// root to [`Control`].
pub struct WatchLoop {
    fs: Arc<dyn FileSystem>,
    roots: Vec<PathBuf>,
    patterns: Arc<WatchPatterns>,
    interval: Duration,
    watermark: Arc<Watermark>,
    control: Arc<Control>,
}

impl std::fmt::Debug for WatchLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchLoop")
            .field("roots", &self.roots)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

impl WatchLoop {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        roots: Vec<PathBuf>,
        patterns: WatchPatterns,
        interval: Duration,
        watermark: Arc<Watermark>,
        control: Arc<Control>,
    ) -> Self {
        Self {
            fs,
            roots,
            patterns: Arc::new(patterns),
            interval,
            watermark,
            control,
        }
    }

    pub fn watermark(&self) -> &Arc<Watermark> {
        &self.watermark
    }

    /// Scan forever, sleeping `interval` between passes.
    pub async fn run(&self) {
        info!(roots = ?self.roots, interval = ?self.interval, "watching for changes");
        loop {
            self.run_cycle().await;
            tokio::time::sleep(self.interval).await;
        }
    }

    /// One pass over all roots. Returns the changes that were acted upon.
    pub async fn run_cycle(&self) -> Vec<ChangeEvent> {
        let cycle_start = SystemTime::now();
        let mut acted = Vec::new();

        for root in &self.roots {
            let Some(event) = self.first_change(root).await else {
                continue;
            };

            info!("Detected file changes:\n  {}", event.path.display());
            // Advance before acting so the same save cannot fire again while
            // the build is still running.
            self.watermark.advance_now();
            self.control.handle_change(event.kind).await;
            acted.push(event);
        }

        self.watermark.advance_to(cycle_start);
        acted
    }

    async fn first_change(&self, root: &Path) -> Option<ChangeEvent> {
        let fs = Arc::clone(&self.fs);
        let patterns = Arc::clone(&self.patterns);
        let root = root.to_path_buf();
        let since = self.watermark.get();

        let scanned =
            tokio::task::spawn_blocking(move || scan(fs.as_ref(), &root, &patterns, since).next())
                .await;

        match scanned {
            Ok(Some(event)) => {
                debug!(path = ?event.path, kind = ?event.kind, "classified change");
                Some(event)
            }
            Ok(None) => None,
            Err(err) => {
                warn!(error = %err, "scan task failed");
                None
            }
        }
    }
}
