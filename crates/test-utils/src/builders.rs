use std::path::{Path, PathBuf};
use std::time::Duration;

use lime::config::{BuildConfig, LimeConfig, ProxyConfig, RunConfig, WatchConfiguration};
use lime::types::{OutputMode, RestartPolicy};
use lime::watch::WatchPatterns;

/// Builder for `LimeConfig` to simplify test setup.
///
/// Defaults mirror the CLI: build on `.go`, restart on `.html/.css/.js`,
/// no ignore pattern, no proxy.
pub struct LimeConfigBuilder {
    root: PathBuf,
    ignore: Option<String>,
    build: Option<String>,
    run: Option<String>,
    interval: Duration,
    immediate: bool,
    proxy: Option<ProxyConfig>,
}

impl LimeConfigBuilder {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            ignore: None,
            build: Some(r"(\.go)".to_string()),
            run: Some(r"(\.html|\.css|\.js)".to_string()),
            interval: Duration::from_millis(20),
            immediate: false,
            proxy: None,
        }
    }

    pub fn ignore(mut self, pattern: &str) -> Self {
        self.ignore = Some(pattern.to_string());
        self
    }

    pub fn immediate(mut self, val: bool) -> Self {
        self.immediate = val;
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn proxy(mut self, backend_port: u16, policy: RestartPolicy) -> Self {
        self.proxy = Some(proxy_config(backend_port, policy));
        self
    }

    pub fn build(self) -> LimeConfig {
        let patterns = WatchPatterns::compile(
            self.ignore.as_deref(),
            self.build.as_deref(),
            self.run.as_deref(),
        )
        .expect("test patterns compile");

        LimeConfig {
            watch: WatchConfiguration {
                roots: vec![self.root.clone()],
                patterns,
                interval: self.interval,
            },
            build: BuildConfig {
                dir: self.root.clone(),
                binary: self.root.join("lime-bin"),
                godep: false,
            },
            run: RunConfig {
                args: Vec::new(),
                output: OutputMode::Inherit,
                env: Vec::new(),
            },
            proxy: self.proxy,
            immediate: self.immediate,
            verbose: false,
        }
    }
}

/// Proxy config listening on an ephemeral port.
pub fn proxy_config(backend_port: u16, policy: RestartPolicy) -> ProxyConfig {
    ProxyConfig {
        port: 0,
        backend_host: "127.0.0.1".to_string(),
        backend_port,
        policy,
        backend_timeout: Duration::from_secs(2),
    }
}
