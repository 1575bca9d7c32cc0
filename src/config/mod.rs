// src/config/mod.rs

//! Configuration loading for lime.
//!
//! Responsibilities:
//! - Define the optional TOML file model (`file.rs`).
//! - Define the validated, immutable runtime configuration (`model.rs`).
//! - Merge CLI flags, file values and defaults, compiling patterns once (`loader.rs`).

pub mod file;
pub mod loader;
pub mod model;

pub use file::{BuildSection, FileConfig, ProxySection, RunSection, WatchSection};
pub use loader::{DEFAULT_CONFIG_FILE, load_config, load_file, resolve_config};
pub use model::{BuildConfig, LimeConfig, ProxyConfig, RunConfig, WatchConfiguration};
