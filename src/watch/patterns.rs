// src/watch/patterns.rs

use std::path::Path;

use regex::Regex;

use crate::errors::Result;
use crate::types::ChangeKind;

/// The three optional matchers applied while scanning.
///
/// - `ignore` is matched against the full path; a match prunes the whole
///   subtree.
/// - `build` and `run` are matched against the file extension (".go",
///   ".css", ...), `build` first.
#[derive(Debug, Clone, Default)]
pub struct WatchPatterns {
    ignore: Option<Regex>,
    build: Option<Regex>,
    run: Option<Regex>,
}

impl WatchPatterns {
    /// Compile the patterns; `None` leaves a matcher unset.
    pub fn compile(
        ignore: Option<&str>,
        build: Option<&str>,
        run: Option<&str>,
    ) -> Result<Self> {
        Ok(Self {
            ignore: ignore.map(Regex::new).transpose()?,
            build: build.map(Regex::new).transpose()?,
            run: run.map(Regex::new).transpose()?,
        })
    }

    /// True if the path (file or directory) should not be looked at.
    pub fn is_ignored(&self, path: &Path) -> bool {
        match &self.ignore {
            Some(re) => re.is_match(&path.to_string_lossy()),
            None => false,
        }
    }

    /// Classify a changed file by its extension. First match wins.
    pub fn classify(&self, path: &Path) -> Option<ChangeKind> {
        let ext = extension_of(path);
        if self.build.as_ref().is_some_and(|re| re.is_match(&ext)) {
            return Some(ChangeKind::Build);
        }
        if self.run.as_ref().is_some_and(|re| re.is_match(&ext)) {
            return Some(ChangeKind::Restart);
        }
        None
    }
}

/// Extension including the leading dot, or "" when there is none.
fn extension_of(path: &Path) -> String {
    match path.extension() {
        Some(ext) => format!(".{}", ext.to_string_lossy()),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn go_patterns() -> WatchPatterns {
        WatchPatterns::compile(
            Some("(vendor|/\\.git)"),
            Some(r"(\.go)"),
            Some(r"(\.html|\.css|\.js)"),
        )
        .unwrap()
    }

    #[test]
    fn build_pattern_wins_over_run_pattern() {
        let p = WatchPatterns::compile(None, Some(r"\.go"), Some(r"\.go|\.css")).unwrap();
        assert_eq!(p.classify(Path::new("a/main.go")), Some(ChangeKind::Build));
        assert_eq!(p.classify(Path::new("a/site.css")), Some(ChangeKind::Restart));
    }

    #[test]
    fn classification_uses_extension_only() {
        let p = go_patterns();
        // "go" appears in the directory name but not in the extension.
        assert_eq!(p.classify(Path::new("/src/go.html/readme.md")), None);
        assert_eq!(p.classify(Path::new("/src/Makefile")), None);
        assert_eq!(p.classify(Path::new("/src/web/index.html")), Some(ChangeKind::Restart));
    }

    #[test]
    fn ignore_matches_full_path() {
        let p = go_patterns();
        assert!(p.is_ignored(Path::new("/src/vendor/github.com/x/y.go")));
        assert!(!p.is_ignored(Path::new("/src/cmd/main.go")));
    }

    #[test]
    fn unset_matchers_never_match() {
        let p = WatchPatterns::default();
        assert!(!p.is_ignored(Path::new("/anything")));
        assert_eq!(p.classify(Path::new("/anything.go")), None);
    }
}
