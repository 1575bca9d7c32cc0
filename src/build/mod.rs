// src/build/mod.rs

//! Build collaborator.
//!
//! The engine only talks to the [`Builder`] trait: run one build, report
//! pass/fail plus diagnostics, and fetch a named dependency on request.
//!
//! - [`go`] is the production implementation driving the Go toolchain.
//! - [`remediation`] extracts "missing package" names from diagnostics and
//!   asks the builder to fetch each one.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::time::Duration;

use crate::errors::Result;

pub mod go;
pub mod remediation;

pub use go::GoBuilder;
pub use remediation::{missing_packages, remediate};

/// Boxed future used by the collaborator traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Outcome of one build.
///
/// A failed build is a normal value, not an error: the diagnostics are meant
/// for the developer and the watch loop keeps going.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildResult {
    pub success: bool,
    pub diagnostics: String,
    pub duration: Duration,
}

impl BuildResult {
    pub fn ok(duration: Duration) -> Self {
        Self {
            success: true,
            diagnostics: String::new(),
            duration,
        }
    }

    pub fn failed(diagnostics: impl Into<String>, duration: Duration) -> Self {
        Self {
            success: false,
            diagnostics: diagnostics.into(),
            duration,
        }
    }
}

/// Trait abstracting how the service gets built.
///
/// Implementations must be safe to call repeatedly and must never leave a
/// partially written binary at [`Builder::binary`].
pub trait Builder: Send + Sync {
    /// Path of the binary a successful build produces.
    fn binary(&self) -> &Path;

    /// Perform one build.
    fn build(&self) -> BoxFuture<'_, BuildResult>;

    /// Best-effort fetch of a dependency named in build diagnostics.
    fn fetch_dependency<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<()>>;
}
