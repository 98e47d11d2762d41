//! Core types shared by the package-manager backends.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::runner::RunError;

// ============================================================================
// Installed packages
// ============================================================================

/// A package as the native manager reports it.
///
/// The identifier is whatever the manager lists, which is not always a
/// catalog name (flatpak reports reverse-domain application IDs, winget
/// reports package IDs).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledPackage {
    /// Identifier as listed by the manager.
    pub name: String,
    /// Installed version, when the listing carries one.
    pub version: Option<String>,
    /// Newest version the manager knows, when the listing carries one.
    pub latest: Option<String>,
}

impl InstalledPackage {
    /// Create an entry, version optional.
    pub fn new(name: impl Into<String>, version: Option<String>) -> Self {
        Self {
            name: name.into(),
            version,
            latest: None,
        }
    }

    /// Attach the newest known version.
    #[must_use]
    pub fn with_latest(mut self, latest: impl Into<String>) -> Self {
        self.latest = Some(latest.into());
        self
    }
}

/// Combined answer to "what does the manager know about this name".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageProbe {
    /// Whether the package is installed.
    pub installed: bool,
    /// Installed version, `None` when unknown.
    pub version: Option<String>,
    /// Newest available version, `None` when unknown.
    pub latest: Option<String>,
}

// ============================================================================
// Failures
// ============================================================================

/// Why a request could not be satisfied.
///
/// Serialized with a `kind` tag so consumers can branch without string
/// matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Failure {
    /// The command exceeded its time budget and was killed. Not retried.
    Timeout {
        /// Budget that was exceeded, in seconds.
        seconds: u64,
    },
    /// The mutation needs elevated privileges and the active policy does
    /// not prompt. `command` is the exact line to run manually.
    RequiresElevation {
        /// Full command line including the elevation prefix.
        command: String,
    },
    /// The requested name is not known.
    UnknownPackage,
    /// No supported package manager was detected on this host.
    NoPackageManager,
    /// The manager ran and refused.
    Command {
        /// Trailing diagnostic from the manager.
        message: String,
    },
}

impl Failure {
    /// Build a `Command` failure from captured stderr, keeping only the
    /// last non-empty line (managers print long transcripts).
    pub fn from_stderr(stderr: &str) -> Self {
        let message = stderr
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or("command failed")
            .to_string();
        Self::Command { message }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout { seconds } => write!(f, "timed out after {seconds}s"),
            Self::RequiresElevation { command } => {
                write!(f, "requires elevation, run manually: {command}")
            }
            Self::UnknownPackage => write!(f, "unknown package"),
            Self::NoPackageManager => write!(f, "no package manager detected"),
            Self::Command { message } => write!(f, "{message}"),
        }
    }
}

impl From<RunError> for Failure {
    fn from(err: RunError) -> Self {
        match err {
            RunError::Timeout { limit, .. } => Self::Timeout {
                seconds: limit.as_secs(),
            },
            RunError::ElevationDeclined { command } => Self::RequiresElevation { command },
            other => Self::Command {
                message: other.to_string(),
            },
        }
    }
}

// ============================================================================
// Mutation outcomes
// ============================================================================

/// Result of an install request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum InstallOutcome {
    /// The package was installed.
    Installed,
    /// The package was already installed. Not an error.
    AlreadyPresent,
    /// The install did not happen.
    Failed {
        /// What went wrong.
        failure: Failure,
    },
}

impl InstallOutcome {
    /// Shorthand for a failed outcome.
    pub fn failed(failure: impl Into<Failure>) -> Self {
        Self::Failed {
            failure: failure.into(),
        }
    }
}

/// Result of an upgrade request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum UpgradeOutcome {
    /// The package was upgraded.
    Upgraded,
    /// The installed version is already the newest known. Not an error.
    AlreadyLatest,
    /// The upgrade did not happen.
    Failed {
        /// What went wrong.
        failure: Failure,
    },
}

impl UpgradeOutcome {
    /// Shorthand for a failed outcome.
    pub fn failed(failure: impl Into<Failure>) -> Self {
        Self::Failed {
            failure: failure.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn installed_package_builder() {
        let pkg = InstalledPackage::new("firefox", Some("128.0".to_string())).with_latest("129.0");
        assert_eq!(pkg.name, "firefox");
        assert_eq!(pkg.version.as_deref(), Some("128.0"));
        assert_eq!(pkg.latest.as_deref(), Some("129.0"));
    }

    #[test]
    fn from_stderr_keeps_last_line() {
        let failure = Failure::from_stderr("Reading package lists...\nE: broken packages\n\n");
        assert_eq!(
            failure,
            Failure::Command {
                message: "E: broken packages".to_string()
            }
        );
    }

    #[test]
    fn from_stderr_empty_input() {
        let failure = Failure::from_stderr("");
        assert_eq!(
            failure,
            Failure::Command {
                message: "command failed".to_string()
            }
        );
    }

    #[test]
    fn failure_serializes_with_kind_tag() {
        let json = serde_json::to_value(Failure::RequiresElevation {
            command: "sudo apt-get install -y firefox".to_string(),
        })
        .unwrap();
        assert_eq!(json["kind"], "requires_elevation");
        assert_eq!(json["command"], "sudo apt-get install -y firefox");

        let json = serde_json::to_value(Failure::UnknownPackage).unwrap();
        assert_eq!(json["kind"], "unknown_package");
    }

    #[test]
    fn outcome_serializes_with_result_tag() {
        let json = serde_json::to_value(InstallOutcome::Installed).unwrap();
        assert_eq!(json["result"], "installed");

        let json = serde_json::to_value(UpgradeOutcome::failed(Failure::Timeout { seconds: 60 }))
            .unwrap();
        assert_eq!(json["result"], "failed");
        assert_eq!(json["failure"]["kind"], "timeout");
        assert_eq!(json["failure"]["seconds"], 60);
    }

    #[test]
    fn run_error_maps_to_failure() {
        let err = RunError::Timeout {
            command: "dpkg -l".to_string(),
            limit: std::time::Duration::from_secs(60),
        };
        assert_eq!(Failure::from(err), Failure::Timeout { seconds: 60 });

        let err = RunError::ElevationDeclined {
            command: "sudo dnf install -y firefox".to_string(),
        };
        assert_eq!(
            Failure::from(err),
            Failure::RequiresElevation {
                command: "sudo dnf install -y firefox".to_string()
            }
        );
    }
}
