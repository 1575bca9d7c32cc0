use std::str::FromStr;
use serde::Deserialize;

/// What a classified file change asks the supervisor to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Source changed: rebuild, then restart if the build succeeds.
    Build,
    /// Asset changed: restart the running binary without rebuilding.
    Restart,
}

/// How the proxy decides whether a request needs a fresh backend.
///
/// - `Always`: every request kills and restarts the backend before it is
///   forwarded (overlapping requests share one restart).
/// - `WhenStale`: only restart when the backend is not running or the binary
///   on disk is newer than the running process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestartPolicy {
    Always,
    WhenStale,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        RestartPolicy::Always
    }
}

impl FromStr for RestartPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "always" => Ok(RestartPolicy::Always),
            "when-stale" | "when_stale" => Ok(RestartPolicy::WhenStale),
            other => Err(format!(
                "invalid restart policy: {other} (expected \"always\" or \"when-stale\")"
            )),
        }
    }
}

/// Where the child service's stdout/stderr go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Child shares our stdout/stderr.
    Inherit,
    /// Child output is read line by line and emitted through `tracing`.
    Log,
}

impl Default for OutputMode {
    fn default() -> Self {
        OutputMode::Inherit
    }
}

impl FromStr for OutputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "inherit" => Ok(OutputMode::Inherit),
            "log" => Ok(OutputMode::Log),
            other => Err(format!(
                "invalid output mode: {other} (expected \"inherit\" or \"log\")"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restart_policy_parses_both_spellings() {
        assert_eq!("always".parse::<RestartPolicy>(), Ok(RestartPolicy::Always));
        assert_eq!(" When-Stale ".parse::<RestartPolicy>(), Ok(RestartPolicy::WhenStale));
        assert_eq!("when_stale".parse::<RestartPolicy>(), Ok(RestartPolicy::WhenStale));
        assert!("sometimes".parse::<RestartPolicy>().is_err());
    }

    #[test]
    fn output_mode_rejects_unknown() {
        assert_eq!("log".parse::<OutputMode>(), Ok(OutputMode::Log));
        assert!("file".parse::<OutputMode>().is_err());
    }
}
