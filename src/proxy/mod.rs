// src/proxy/mod.rs

//! Request-gated reverse proxy.
//!
//! - [`gate`]: per-request freshness check (restart via `Control`) and the
//!   bounded wait for the backend to accept connections.
//! - [`forward`]: transparent forwarding of one request to the backend.
//! - [`server`]: the listener and axum router.
//! - [`trigger`]: the loopback endpoint that restarts the application on
//!   every request, started whether or not the proxy is enabled.

pub mod forward;
pub mod gate;
pub mod server;
pub mod trigger;

pub use gate::RequestGate;
pub use server::ProxyServer;
pub use trigger::TriggerServer;
