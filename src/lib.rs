// src/lib.rs

pub mod build;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod proxy;
pub mod types;
pub mod watch;

use std::sync::Arc;

use tracing::debug;

use crate::build::{Builder, GoBuilder};
use crate::cli::CliArgs;
use crate::config::load_config;
use crate::engine::Supervisor;
use crate::errors::Result;
use crate::exec::ProcessRunner;
use crate::fs::RealFileSystem;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and pattern compilation
/// - the Go builder and the process runner
/// - (optional) the reverse proxy
/// - signal handling
/// - the watch loop
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_config(&args)?;
    debug!(?cfg, "resolved configuration");

    let builder = GoBuilder::new(&cfg.build)?;
    let runner = ProcessRunner::new(builder.binary(), &cfg.run);

    let supervisor = Supervisor::new(
        cfg,
        Box::new(builder),
        Box::new(runner),
        Arc::new(RealFileSystem),
    );
    supervisor.run().await
}
