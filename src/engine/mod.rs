// src/engine/mod.rs

//! Orchestration engine for lime.
//!
//! This module ties together:
//! - [`control`]: the single lock serialising builds, restarts and shutdown
//!   across the watch loop, the proxy and the signal handler
//! - [`watch_loop`]: polling the watch roots and dispatching changes
//! - [`shutdown`]: signal-driven termination that never leaks the child
//! - [`supervisor`]: the startup sequence wiring everything up

pub mod control;
pub mod shutdown;
pub mod supervisor;
pub mod watch_loop;

pub use control::{Control, ControlOptions, Freshness};
pub use shutdown::ShutdownHandle;
pub use supervisor::Supervisor;
pub use watch_loop::WatchLoop;
