// src/exec/mod.rs

//! Process lifecycle layer.
//!
//! - [`runner`] defines the [`Runner`] trait the engine drives (`run` /
//!   `kill`, never a combined restart) and [`ProcessRunner`], which owns at
//!   most one live child process of the built binary.

pub mod runner;

pub use runner::{ProcessRunner, Runner, DEFAULT_KILL_GRACE};
