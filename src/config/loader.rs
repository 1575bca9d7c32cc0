// src/config/loader.rs

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use crate::cli::CliArgs;
use crate::config::file::FileConfig;
use crate::config::model::{BuildConfig, LimeConfig, ProxyConfig, RunConfig, WatchConfiguration};
use crate::errors::{LimeError, Result};
use crate::watch::WatchPatterns;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "Lime.toml";

const DEFAULT_BIN: &str = "lime-bin";
const DEFAULT_BUILD_PATTERN: &str = r"(\.go)";
const DEFAULT_RUN_PATTERN: &str = r"(\.html|\.css|\.js)";
const DEFAULT_WATCH_PATH: &str = ".";
const DEFAULT_INTERVAL_MS: u64 = 500;
const DEFAULT_BACKEND_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_BACKEND_HOST: &str = "localhost";

/// Read and deserialize a TOML config file.
pub fn load_file(path: impl AsRef<Path>) -> Result<FileConfig> {
    let contents = fs::read_to_string(path.as_ref())?;
    let file: FileConfig = toml::from_str(&contents)?;
    Ok(file)
}

/// Resolve the full runtime configuration for the current process.
///
/// Uses the process working directory and either the `--config` file or
/// `Lime.toml` if one exists there.
pub fn load_config(args: &CliArgs) -> Result<LimeConfig> {
    let workdir = std::env::current_dir()?;

    let file = match &args.config {
        Some(path) => {
            let path = workdir.join(path);
            debug!(config = ?path, "loading config file");
            load_file(&path)?
        }
        None => {
            let path = workdir.join(DEFAULT_CONFIG_FILE);
            if path.is_file() {
                debug!(config = ?path, "loading default config file");
                load_file(&path)?
            } else {
                FileConfig::default()
            }
        }
    };

    resolve_config(args, &file, &workdir)
}

/// Merge CLI flags over file values over defaults, validating as we go.
///
/// Pattern syntax errors surface here so they are fatal at startup.
pub fn resolve_config(args: &CliArgs, file: &FileConfig, workdir: &Path) -> Result<LimeConfig> {
    let patterns = WatchPatterns::compile(
        pick_str(&args.ignore_pattern, &file.watch.ignore, None),
        pick_str(&args.build_pattern, &file.watch.build, Some(DEFAULT_BUILD_PATTERN)),
        pick_str(&args.run_pattern, &file.watch.run, Some(DEFAULT_RUN_PATTERN)),
    )?;

    let targets: Vec<String> = match (&args.path, &file.watch.paths) {
        (Some(csv), _) => csv.split(',').map(str::to_string).collect(),
        (None, Some(list)) => list.clone(),
        (None, None) => vec![DEFAULT_WATCH_PATH.to_string()],
    };
    let roots: Vec<PathBuf> = targets
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(|t| clean_path(&workdir.join(t)))
        .collect();
    if roots.is_empty() {
        return Err(LimeError::ConfigError(
            "at least one watch path is required".to_string(),
        ));
    }

    let interval_ms = args
        .interval_ms
        .or(file.watch.interval_ms)
        .unwrap_or(DEFAULT_INTERVAL_MS);
    if interval_ms == 0 {
        return Err(LimeError::ConfigError(
            "watch interval must be >= 1ms (got 0)".to_string(),
        ));
    }

    let build_dir = match args.build_path.as_ref().or(file.build.path.as_ref()) {
        Some(p) => clean_path(&workdir.join(p)),
        None => workdir.to_path_buf(),
    };
    let bin = args
        .bin
        .as_deref()
        .or(file.build.bin.as_deref())
        .unwrap_or(DEFAULT_BIN);
    if bin.trim().is_empty() {
        return Err(LimeError::ConfigError("binary path must not be empty".to_string()));
    }
    let binary = clean_path(&build_dir.join(with_exe_suffix(bin)));

    let proxy = resolve_proxy(args, file)?;

    let mut env = Vec::new();
    if let Some(p) = &proxy {
        env.push(("PORT".to_string(), p.backend_port.to_string()));
    }

    let run_args = if args.app_args.is_empty() {
        file.run.args.clone().unwrap_or_default()
    } else {
        args.app_args.clone()
    };

    Ok(LimeConfig {
        watch: WatchConfiguration {
            roots,
            patterns,
            interval: Duration::from_millis(interval_ms),
        },
        build: BuildConfig {
            dir: build_dir,
            binary,
            godep: args.godep || file.build.godep,
        },
        run: RunConfig {
            args: run_args,
            output: args.output.or(file.run.output).unwrap_or_default(),
            env,
        },
        proxy,
        immediate: args.immediate || file.build.immediate,
        verbose: args.verbose,
    })
}

fn resolve_proxy(args: &CliArgs, file: &FileConfig) -> Result<Option<ProxyConfig>> {
    let Some(port) = args.port.or(file.proxy.port).filter(|p| *p > 0) else {
        return Ok(None);
    };

    let backend_port = match args.app_port.or(file.proxy.app_port).filter(|p| *p > 0) {
        Some(p) => p,
        None => port.checked_add(1).ok_or_else(|| {
            LimeError::ConfigError(format!(
                "cannot derive app port from proxy port {port}; pass --app-port"
            ))
        })?,
    };
    if backend_port == port {
        return Err(LimeError::ConfigError(format!(
            "proxy port and app port must differ (both {port})"
        )));
    }

    let timeout_ms = args
        .backend_timeout_ms
        .or(file.proxy.backend_timeout_ms)
        .unwrap_or(DEFAULT_BACKEND_TIMEOUT_MS);

    Ok(Some(ProxyConfig {
        port,
        backend_host: file
            .proxy
            .host
            .clone()
            .unwrap_or_else(|| DEFAULT_BACKEND_HOST.to_string()),
        backend_port,
        policy: args.restart_policy.or(file.proxy.policy).unwrap_or_default(),
        backend_timeout: Duration::from_millis(timeout_ms),
    }))
}

/// CLI value, else file value, else default. An explicitly empty string
/// disables the matcher, so `--run-pattern ""` turns restart events off.
fn pick_str<'a>(
    cli: &'a Option<String>,
    file: &'a Option<String>,
    default: Option<&'a str>,
) -> Option<&'a str> {
    cli.as_deref()
        .or(file.as_deref())
        .or(default)
        .filter(|s| !s.is_empty())
}

fn with_exe_suffix(bin: &str) -> String {
    if cfg!(windows) && !bin.ends_with(".exe") {
        format!("{bin}.exe")
    } else {
        bin.to_string()
    }
}

/// Lexically normalise `.` and `..` components without touching the disk.
fn clean_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}
