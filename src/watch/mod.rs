// src/watch/mod.rs

//! Polling change detection.
//!
//! This module is responsible for:
//! - Compiling the ignore / build / restart regexes (`patterns`).
//! - Walking a watch root lazily and classifying files newer than the
//!   build watermark (`scanner`).
//! - The shared watermark itself (`watermark`).
//!
//! It does **not** build or restart anything; the engine consumes the events.

pub mod patterns;
pub mod scanner;
pub mod watermark;

pub use patterns::WatchPatterns;
pub use scanner::{ChangeEvent, Scan, scan};
pub use watermark::Watermark;
