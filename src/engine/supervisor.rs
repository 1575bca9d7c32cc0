// src/engine/supervisor.rs

use std::sync::Arc;

use tracing::info;

use crate::build::Builder;
use crate::config::LimeConfig;
use crate::engine::control::{Control, ControlOptions};
use crate::engine::shutdown::{self, ShutdownHandle};
use crate::engine::watch_loop::WatchLoop;
use crate::errors::{LimeError, Result};
use crate::exec::Runner;
use crate::fs::FileSystem;
use crate::proxy::{ProxyServer, RequestGate, TriggerServer};
use crate::watch::Watermark;

/// Wires the builder, runner, watch loop, restart endpoint, proxy and
/// signal handling together and runs the startup sequence.
#[derive(Debug)]
pub struct Supervisor {
    config: LimeConfig,
    control: Arc<Control>,
    fs: Arc<dyn FileSystem>,
}

impl Supervisor {
    pub fn new(
        config: LimeConfig,
        builder: Box<dyn Builder>,
        runner: Box<dyn Runner>,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        let options = ControlOptions {
            immediate: config.immediate,
            verbose: config.verbose,
            ..ControlOptions::default()
        };
        Self {
            control: Arc::new(Control::new(builder, runner, options)),
            config,
            fs,
        }
    }

    pub fn control(&self) -> Arc<Control> {
        Arc::clone(&self.control)
    }

    /// Build the watch loop for this configuration. The watermark starts at
    /// the current time, so only files saved from now on trigger.
    pub fn watch_loop(&self) -> WatchLoop {
        WatchLoop::new(
            Arc::clone(&self.fs),
            self.config.watch.roots.clone(),
            self.config.watch.patterns.clone(),
            self.config.watch.interval,
            Arc::new(Watermark::now()),
            Arc::clone(&self.control),
        )
    }

    /// Bind the proxy if one is configured. Bind errors are fatal.
    pub async fn start_proxy(&self) -> Result<Option<ProxyServer>> {
        let Some(proxy) = self.config.proxy.clone() else {
            return Ok(None);
        };
        let backend = proxy.backend_authority();
        let gate = RequestGate::new(Arc::clone(&self.control), proxy)?;
        let server = ProxyServer::bind(gate).await?;
        info!(
            "Starting lime proxy at http://localhost:{} -> http://{}",
            server.local_addr()?.port(),
            backend
        );
        Ok(Some(server))
    }

    /// Bind the loopback restart endpoint. Bind errors are fatal.
    pub async fn start_trigger(&self) -> Result<TriggerServer> {
        let trigger = TriggerServer::bind(Arc::clone(&self.control)).await?;
        info!("Starting lime server at: {}", trigger.url()?);
        Ok(trigger)
    }

    /// Run with OS signal handling until a signal arrives.
    pub async fn run(self) -> Result<()> {
        let trigger = self.start_trigger().await?;
        let proxy = self.start_proxy().await?;
        let shutdown = shutdown::install(self.control())?;
        let _trigger_task = trigger.spawn();
        let _proxy_task = proxy.map(ProxyServer::spawn);
        self.run_until(shutdown).await
    }

    /// Initial build, then the watch loop, until `shutdown` resolves.
    ///
    /// Always returns `Err(LimeError::Terminated)` once shut down; the
    /// application has been stopped by then.
    pub async fn run_until(self, shutdown: ShutdownHandle) -> Result<()> {
        let watch = self.watch_loop();
        let control = self.control();

        let main = async {
            control.build().await;
            watch.run().await;
        };

        tokio::select! {
            biased;
            sig = shutdown.wait() => Err(LimeError::Terminated(sig)),
            _ = main => Ok(()),
        }
    }
}
