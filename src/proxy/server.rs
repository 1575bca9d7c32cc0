// src/proxy/server.rs

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::errors::Result;
use crate::proxy::gate::{RequestGate, proxy_handler};

/// Bound proxy listener, not yet serving.
#[derive(Debug)]
pub struct ProxyServer {
    listener: TcpListener,
    gate: Arc<RequestGate>,
}

impl ProxyServer {
    /// Bind on all interfaces at the configured port (0 picks a free one).
    pub async fn bind(gate: RequestGate) -> Result<Self> {
        let addr = SocketAddr::from(([0, 0, 0, 0], gate.config().port));
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            gate: Arc::new(gate),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Every path and method goes through the gate.
    pub fn router(gate: Arc<RequestGate>) -> Router {
        Router::new().fallback(proxy_handler).with_state(gate)
    }

    /// Serve in a background task.
    pub fn spawn(self) -> JoinHandle<()> {
        if let Ok(addr) = self.listener.local_addr() {
            info!("listening on port {}", addr.port());
        }
        let app = Self::router(self.gate);
        tokio::spawn(async move {
            if let Err(err) = axum::serve(self.listener, app).await {
                error!(error = %err, "proxy server stopped");
            }
        })
    }
}
