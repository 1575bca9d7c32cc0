// src/config/file.rs

use serde::Deserialize;

use crate::types::{OutputMode, RestartPolicy};

/// Optional `Lime.toml` as read from disk.
///
/// ```toml
/// [watch]
/// paths = ["cmd", "internal", "web"]
/// ignore = "(vendor|node_modules)"
/// build = "(\\.go)"
/// run = "(\\.html|\\.css|\\.js)"
///
/// [build]
/// bin = "bin/server"
/// immediate = true
///
/// [run]
/// args = ["--dev"]
///
/// [proxy]
/// port = 3000
/// ```
///
/// Every field is optional; CLI flags take precedence over anything here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub watch: WatchSection,

    #[serde(default)]
    pub build: BuildSection,

    #[serde(default)]
    pub run: RunSection,

    /// The proxy is only enabled when `[proxy].port` is set.
    #[serde(default)]
    pub proxy: ProxySection,
}

/// `[watch]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WatchSection {
    /// Roots to scan, relative to the working directory.
    #[serde(default)]
    pub paths: Option<Vec<String>>,

    #[serde(default)]
    pub ignore: Option<String>,

    #[serde(default)]
    pub build: Option<String>,

    #[serde(default)]
    pub run: Option<String>,

    #[serde(default)]
    pub interval_ms: Option<u64>,
}

/// `[build]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildSection {
    /// Directory the build runs in.
    #[serde(default)]
    pub path: Option<String>,

    /// Output binary, relative to the build directory.
    #[serde(default)]
    pub bin: Option<String>,

    #[serde(default)]
    pub godep: bool,

    /// Start the binary right after every successful build.
    #[serde(default)]
    pub immediate: bool,
}

/// `[run]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunSection {
    #[serde(default)]
    pub args: Option<Vec<String>>,

    #[serde(default)]
    pub output: Option<OutputMode>,
}

/// `[proxy]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProxySection {
    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub app_port: Option<u16>,

    #[serde(default)]
    pub host: Option<String>,

    #[serde(default)]
    pub policy: Option<RestartPolicy>,

    #[serde(default)]
    pub backend_timeout_ms: Option<u64>,
}
