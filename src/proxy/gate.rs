// src/proxy/gate.rs

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::response::Response;
use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::config::ProxyConfig;
use crate::engine::Control;
use crate::errors::Result;
use crate::proxy::forward::{client, error_response, forward};

const PROBE_INTERVAL: Duration = Duration::from_millis(50);

/// Makes sure the backend is fresh and reachable before a request is
/// forwarded.
///
/// Request lifecycle: received → ensuring fresh (restart through `Control`,
/// shared with concurrent requests) → waiting for the backend port →
/// forwarding → completed.
#[derive(Debug)]
pub struct RequestGate {
    control: Arc<Control>,
    config: ProxyConfig,
    client: reqwest::Client,
}

impl RequestGate {
    pub fn new(control: Arc<Control>, config: ProxyConfig) -> Result<Self> {
        let client = client().map_err(anyhow::Error::from)?;
        Ok(Self {
            control,
            config,
            client,
        })
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Handle one inbound request end to end.
    pub async fn handle(&self, req: Request) -> Response {
        match self.control.ensure_fresh(self.config.policy).await {
            Ok(freshness) => debug!(?freshness, uri = %req.uri(), "backend ready for request"),
            Err(err) => {
                warn!(error = %err, "could not start backend for request");
                return error_response(
                    StatusCode::BAD_GATEWAY,
                    format!("lime: failed to start application: {err}"),
                );
            }
        }

        let authority = self.config.backend_authority();
        if let Err(msg) = wait_until_reachable(&authority, self.config.backend_timeout).await {
            warn!("{msg}");
            return error_response(StatusCode::BAD_GATEWAY, msg);
        }

        forward(&self.client, &authority, req).await
    }
}

/// Axum handler adapter.
pub async fn proxy_handler(State(gate): State<Arc<RequestGate>>, req: Request) -> Response {
    gate.handle(req).await
}

/// Poll `authority` until it accepts a TCP connection or `timeout` elapses.
pub async fn wait_until_reachable(
    authority: &str,
    timeout: Duration,
) -> std::result::Result<(), String> {
    let started = Instant::now();
    let mut last_err = String::from("no attempt made");

    loop {
        let remaining = timeout.saturating_sub(started.elapsed());
        if remaining.is_zero() {
            return Err(format!(
                "lime: application at {authority} not reachable after {timeout:?}: {last_err}"
            ));
        }

        match tokio::time::timeout(remaining, TcpStream::connect(authority)).await {
            Ok(Ok(_stream)) => return Ok(()),
            Ok(Err(err)) => last_err = err.to_string(),
            Err(_) => last_err = "connect timed out".to_string(),
        }

        tokio::time::sleep(PROBE_INTERVAL.min(timeout.saturating_sub(started.elapsed()))).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reachable_listener_is_detected() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        wait_until_reachable(&addr, Duration::from_secs(2)).await.unwrap();
    }

    #[tokio::test]
    async fn closed_port_times_out_with_message() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let started = Instant::now();
        let err = wait_until_reachable(&addr, Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(err.contains("not reachable"), "{err}");
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
