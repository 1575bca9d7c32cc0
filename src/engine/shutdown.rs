// src/engine/shutdown.rs

//! Signal-driven shutdown.
//!
//! A background task waits for SIGINT / SIGTERM, kills the application
//! through [`Control::shutdown`] and then reports the signal name. The caller
//! exits with a non-zero status once [`ShutdownHandle::wait`] resolves.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::info;

use crate::engine::control::Control;
use crate::errors::Result;

/// Resolves once the application has been stopped because of a signal.
#[derive(Debug)]
pub struct ShutdownHandle {
    rx: oneshot::Receiver<String>,
}

impl ShutdownHandle {
    /// Wait for the shutdown to complete; yields the signal name.
    pub async fn wait(self) -> String {
        match self.rx.await {
            Ok(sig) => sig,
            // The shutdown task was dropped with the runtime.
            Err(_) => "runtime shutdown".to_string(),
        }
    }
}

/// Register OS signal handlers and spawn the shutdown task.
///
/// Registration happens before this returns, so signals delivered during
/// startup are not lost.
pub fn install(control: Arc<Control>) -> Result<ShutdownHandle> {
    let signal = os_signal()?;
    Ok(spawn_on(control, signal))
}

/// Spawn the shutdown task on an arbitrary trigger future.
pub fn spawn_on<F>(control: Arc<Control>, trigger: F) -> ShutdownHandle
where
    F: Future<Output = String> + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        let sig = trigger.await;
        info!("Got signal: {sig}");
        control.shutdown().await;
        let _ = tx.send(sig);
    });
    ShutdownHandle { rx }
}

#[cfg(unix)]
fn os_signal() -> Result<impl Future<Output = String> + Send + 'static> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    Ok(async move {
        tokio::select! {
            _ = interrupt.recv() => "SIGINT".to_string(),
            _ = terminate.recv() => "SIGTERM".to_string(),
        }
    })
}

#[cfg(not(unix))]
fn os_signal() -> Result<impl Future<Output = String> + Send + 'static> {
    Ok(async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        "Ctrl-C".to_string()
    })
}
