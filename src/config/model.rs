// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use crate::types::{OutputMode, RestartPolicy};
use crate::watch::WatchPatterns;

/// Fully resolved configuration, built once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct LimeConfig {
    pub watch: WatchConfiguration,
    pub build: BuildConfig,
    pub run: RunConfig,
    /// `None` when no proxy port was given.
    pub proxy: Option<ProxyConfig>,
    /// Start the binary after every successful build.
    pub immediate: bool,
    /// Log build durations.
    pub verbose: bool,
}

/// Roots to scan plus the compiled ignore / build / restart patterns.
#[derive(Debug, Clone)]
pub struct WatchConfiguration {
    pub roots: Vec<PathBuf>,
    pub patterns: WatchPatterns,
    /// Sleep between two full passes over all roots.
    pub interval: Duration,
}

#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Directory the toolchain is invoked in.
    pub dir: PathBuf,
    /// Absolute path of the produced binary.
    pub binary: PathBuf,
    pub godep: bool,
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub args: Vec<String>,
    pub output: OutputMode,
    /// Extra environment for the child (e.g. `PORT` when proxied).
    pub env: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Port the proxy listens on.
    pub port: u16,
    /// Host the backend is reached at.
    pub backend_host: String,
    /// Port the backend listens on.
    pub backend_port: u16,
    pub policy: RestartPolicy,
    /// Upper bound on waiting for the backend to accept connections.
    pub backend_timeout: Duration,
}

impl ProxyConfig {
    /// `host:port` of the backend.
    pub fn backend_authority(&self) -> String {
        format!("{}:{}", self.backend_host, self.backend_port)
    }
}
