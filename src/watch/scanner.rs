// src/watch/scanner.rs

//! Lazy, restartable walk over one watch root.
//!
//! A [`Scan`] is an iterator: the watch loop pulls events from it and simply
//! drops it once it has seen enough, which stops the walk. Ignored paths are
//! pruned before descending, so large ignored trees cost one regex match per
//! cycle.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{trace, warn};

use crate::fs::FileSystem;
use crate::types::ChangeKind;
use crate::watch::patterns::WatchPatterns;

/// A classified file change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
    pub modified: SystemTime,
}

/// One pass over `root`, yielding files modified strictly after `since`
/// whose extension matches the build or restart pattern.
///
/// Unreadable entries are logged and skipped; they never end the walk.
pub struct Scan<'a> {
    fs: &'a dyn FileSystem,
    patterns: &'a WatchPatterns,
    since: SystemTime,
    stack: Vec<PathBuf>,
}

impl std::fmt::Debug for Scan<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scan")
            .field("since", &self.since)
            .field("pending", &self.stack.len())
            .finish_non_exhaustive()
    }
}

/// Start a scan of `root`.
pub fn scan<'a>(
    fs: &'a dyn FileSystem,
    root: &Path,
    patterns: &'a WatchPatterns,
    since: SystemTime,
) -> Scan<'a> {
    Scan {
        fs,
        patterns,
        since,
        stack: vec![root.to_path_buf()],
    }
}

impl Scan<'_> {
    fn visit_file(&self, path: &Path) -> Option<ChangeEvent> {
        let modified = match self.fs.modified(path) {
            Ok(t) => t,
            Err(err) => {
                warn!(path = ?path, error = %err, "cannot stat file; skipping");
                return None;
            }
        };
        if modified <= self.since {
            return None;
        }
        let kind = self.patterns.classify(path)?;
        Some(ChangeEvent {
            path: path.to_path_buf(),
            kind,
            modified,
        })
    }

    fn descend(&mut self, dir: &Path) {
        match self.fs.read_dir(dir) {
            Ok(children) => {
                // Reverse so entries pop in listing order.
                self.stack.extend(children.into_iter().rev());
            }
            Err(err) => {
                warn!(path = ?dir, error = %err, "cannot read directory; skipping subtree");
            }
        }
    }
}

impl Iterator for Scan<'_> {
    type Item = ChangeEvent;

    fn next(&mut self) -> Option<ChangeEvent> {
        while let Some(path) = self.stack.pop() {
            if self.patterns.is_ignored(&path) {
                trace!(path = ?path, "ignored");
                continue;
            }

            if self.fs.is_dir(&path) {
                self.descend(&path);
            } else if self.fs.is_file(&path) {
                if let Some(event) = self.visit_file(&path) {
                    return Some(event);
                }
            } else if !self.fs.exists(&path) {
                warn!(path = ?path, "watch path does not exist; skipping");
            }
        }
        None
    }
}
