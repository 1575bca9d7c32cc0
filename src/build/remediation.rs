// src/build/remediation.rs

use std::sync::LazyLock;

use regex::Regex;
use tracing::{info, warn};

use super::Builder;

static MISSING_PACKAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"cannot find package "([^"]+)""#).expect("static regex is valid")
});

/// Distinct package names from `cannot find package "..."` lines, in order of
/// first appearance.
pub fn missing_packages(diagnostics: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for caps in MISSING_PACKAGE.captures_iter(diagnostics) {
        let name = caps[1].trim();
        if !name.is_empty() && !found.iter().any(|f| f == name) {
            found.push(name.to_string());
        }
    }
    found
}

/// Ask the builder to fetch every missing package named in `diagnostics`.
///
/// Fetch failures are logged and otherwise ignored; the build is not retried
/// here. Returns how many fetches were attempted.
pub async fn remediate(builder: &dyn Builder, diagnostics: &str) -> usize {
    let packages = missing_packages(diagnostics);
    for pkg in &packages {
        info!(package = %pkg, "fetching missing dependency");
        if let Err(err) = builder.fetch_dependency(pkg).await {
            warn!(package = %pkg, error = %err, "dependency fetch failed");
        }
    }
    packages.len()
}
