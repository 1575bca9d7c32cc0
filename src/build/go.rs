// src/build/go.rs

//! Go toolchain builder.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use anyhow::{Context, anyhow};
use tokio::process::Command;
use tracing::{debug, info};

use super::{BoxFuture, BuildResult, Builder};
use crate::config::BuildConfig;
use crate::errors::{LimeError, Result};

/// Builds with `go build` (or `godep go build`) into a temporary sibling of
/// the target and renames it into place only when the build succeeds.
#[derive(Debug, Clone)]
pub struct GoBuilder {
    dir: PathBuf,
    binary: PathBuf,
    go: PathBuf,
    godep: Option<PathBuf>,
}

impl GoBuilder {
    /// Resolve the toolchain on `PATH`. A missing `go` (or `godep` when
    /// requested) is a startup error.
    pub fn new(cfg: &BuildConfig) -> Result<Self> {
        let go = which::which("go")
            .map_err(|e| LimeError::ToolchainMissing(format!("go: {e}")))?;
        let godep = if cfg.godep {
            Some(
                which::which("godep")
                    .map_err(|e| LimeError::ToolchainMissing(format!("godep: {e}")))?,
            )
        } else {
            None
        };

        debug!(go = ?go, godep = ?godep, dir = ?cfg.dir, "go toolchain resolved");

        Ok(Self {
            dir: cfg.dir.clone(),
            binary: cfg.binary.clone(),
            go,
            godep,
        })
    }

    fn staging_path(&self) -> PathBuf {
        let name = self
            .binary
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "lime-bin".to_string());
        self.binary.with_file_name(format!(".{name}.lime-tmp"))
    }

    fn build_command(&self, out: &Path) -> Command {
        let mut cmd = match &self.godep {
            Some(godep) => {
                let mut c = Command::new(godep);
                c.arg("go");
                c
            }
            None => Command::new(&self.go),
        };
        cmd.arg("build")
            .arg("-o")
            .arg(out)
            .current_dir(&self.dir)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        cmd
    }

    async fn build_inner(&self) -> BuildResult {
        let started = Instant::now();
        let staging = self.staging_path();

        let output = match self.build_command(&staging).output().await {
            Ok(o) => o,
            Err(err) => {
                return BuildResult::failed(
                    format!("failed to run go build: {err}"),
                    started.elapsed(),
                );
            }
        };

        if !output.status.success() {
            let _ = tokio::fs::remove_file(&staging).await;
            let mut diagnostics = String::from_utf8_lossy(&output.stderr).into_owned();
            diagnostics.push_str(&String::from_utf8_lossy(&output.stdout));
            return BuildResult::failed(diagnostics, started.elapsed());
        }

        if let Err(err) = tokio::fs::rename(&staging, &self.binary).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return BuildResult::failed(
                format!("moving {:?} to {:?}: {err}", staging, self.binary),
                started.elapsed(),
            );
        }

        BuildResult::ok(started.elapsed())
    }
}

impl Builder for GoBuilder {
    fn binary(&self) -> &Path {
        &self.binary
    }

    fn build(&self) -> BoxFuture<'_, BuildResult> {
        Box::pin(self.build_inner())
    }

    fn fetch_dependency<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            info!("go get -u {name}");
            let output = Command::new(&self.go)
                .arg("get")
                .arg("-u")
                .arg(name)
                .current_dir(&self.dir)
                .stdin(Stdio::null())
                .output()
                .await
                .with_context(|| format!("running go get for {name}"))?;

            if !output.status.success() {
                return Err(anyhow!(
                    "go get -u {name} exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                )
                .into());
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(godep: bool) -> BuildConfig {
        BuildConfig {
            dir: PathBuf::from("/work"),
            binary: PathBuf::from("/work/bin/server"),
            godep,
        }
    }

    #[test]
    fn toolchain_lookup_matches_path_search() {
        let has_go = which::which("go").is_ok();
        let has_godep = which::which("godep").is_ok();

        match GoBuilder::new(&config(true)) {
            Ok(builder) => {
                assert!(has_go && has_godep);
                assert!(builder.godep.is_some());
            }
            Err(LimeError::ToolchainMissing(msg)) => {
                if has_go {
                    assert!(msg.starts_with("godep"), "{msg}");
                } else {
                    assert!(msg.starts_with("go"), "{msg}");
                }
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn staging_file_sits_next_to_the_binary() {
        let builder = GoBuilder {
            dir: PathBuf::from("/work"),
            binary: PathBuf::from("/work/bin/server"),
            go: PathBuf::from("/usr/bin/go"),
            godep: None,
        };
        assert_eq!(
            builder.staging_path(),
            PathBuf::from("/work/bin/.server.lime-tmp")
        );
    }
}
