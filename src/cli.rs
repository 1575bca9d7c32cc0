// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! Most flags are optional so that values from a `Lime.toml` file can fill
//! the gaps; built-in defaults are applied last by the config loader.

use clap::{Parser, ValueEnum};

use crate::types::{OutputMode, RestartPolicy};

/// Command-line arguments for `lime`.
#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "lime",
    version,
    about = "A live reload utility for Go applications.",
    long_about = None
)]
pub struct CliArgs {
    /// Port for the proxy server. The proxy is disabled when omitted.
    #[arg(long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Port the application listens on (default: proxy port + 1).
    #[arg(long, value_name = "PORT")]
    pub app_port: Option<u16>,

    /// Path of the generated binary file (default: `lime-bin`).
    #[arg(long, short = 'b', value_name = "PATH")]
    pub bin: Option<String>,

    /// Regex matched against full paths; matching files and directories are skipped.
    #[arg(long, value_name = "REGEX")]
    pub ignore_pattern: Option<String>,

    /// Regex matched against file extensions that trigger a rebuild.
    #[arg(long, value_name = "REGEX")]
    pub build_pattern: Option<String>,

    /// Regex matched against file extensions that trigger a restart only.
    #[arg(long, value_name = "REGEX")]
    pub run_pattern: Option<String>,

    /// Comma-separated list of paths to watch, relative to the working directory.
    #[arg(long, short = 't', value_name = "PATHS")]
    pub path: Option<String>,

    /// Run the server immediately after it's built.
    #[arg(long, short = 'i')]
    pub immediate: bool,

    /// Show verbose output.
    #[arg(long)]
    pub verbose: bool,

    /// Use godep when building.
    #[arg(long, short = 'g')]
    pub godep: bool,

    /// When the proxy restarts the backend.
    #[arg(long, value_name = "POLICY", value_parser = parse_policy)]
    pub restart_policy: Option<RestartPolicy>,

    /// Where the application's stdout/stderr go.
    #[arg(long, value_name = "MODE", value_parser = parse_output)]
    pub output: Option<OutputMode>,

    /// How long the proxy waits for the backend to accept connections.
    #[arg(long, value_name = "MS")]
    pub backend_timeout_ms: Option<u64>,

    /// Delay between two scans of the watched paths.
    #[arg(long, value_name = "MS")]
    pub interval_ms: Option<u64>,

    /// Optional config file (TOML). `Lime.toml` is used when present.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `--verbose`, `LIME_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Directory to build (default: working directory).
    #[arg(value_name = "BUILD_PATH")]
    pub build_path: Option<String>,

    /// Arguments passed to the application.
    #[arg(value_name = "APP_ARGS", trailing_var_arg = true, allow_hyphen_values = true)]
    pub app_args: Vec<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

fn parse_policy(s: &str) -> Result<RestartPolicy, String> {
    s.parse()
}

fn parse_output(s: &str) -> Result<OutputMode, String> {
    s.parse()
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
