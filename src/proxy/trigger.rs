// src/proxy/trigger.rs

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, warn};

use crate::engine::Control;
use crate::errors::Result;
use crate::proxy::forward::error_response;

/// Loopback endpoint where every request, whatever its path or method,
/// forces one kill/run cycle of the application.
#[derive(Debug)]
pub struct TriggerServer {
    listener: TcpListener,
    control: Arc<Control>,
}

impl TriggerServer {
    /// Bind on `127.0.0.1` at a free port.
    pub async fn bind(control: Arc<Control>) -> Result<Self> {
        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        Ok(Self { listener, control })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn url(&self) -> Result<String> {
        Ok(format!("http://{}", self.local_addr()?))
    }

    pub fn router(control: Arc<Control>) -> Router {
        Router::new().fallback(restart_handler).with_state(control)
    }

    pub fn spawn(self) -> JoinHandle<()> {
        let app = Self::router(self.control);
        tokio::spawn(async move {
            if let Err(err) = axum::serve(self.listener, app).await {
                error!(error = %err, "restart endpoint stopped");
            }
        })
    }
}

async fn restart_handler(State(control): State<Arc<Control>>) -> Response {
    match control.restart().await {
        Ok(()) => error_response(StatusCode::OK, "restarted\n".to_string()),
        Err(err) => {
            warn!(error = %err, "restart requested over http failed");
            error_response(
                StatusCode::BAD_GATEWAY,
                format!("lime: failed to start application: {err}"),
            )
        }
    }
}
