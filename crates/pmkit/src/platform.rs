//! Host platform and package-manager detection.
//!
//! Detection answers two questions at startup: what OS family is this, and
//! which supported package manager is present. Both answers are
//! deterministic for a given host, so they are computed once and carried in
//! a [`HostIdentity`] that is never reassigned.
//!
//! # Example
//!
//! ```
//! use pmkit::platform::HostIdentity;
//!
//! let identity = HostIdentity::detect();
//! println!("{} / {:?}", identity.os, identity.manager);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Operating-system family, from the compile-time target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    /// macOS.
    #[serde(rename = "macos")]
    MacOs,
    /// Any Linux distribution.
    Linux,
    /// Windows.
    Windows,
    /// Anything else: no manager candidates, queries degrade gracefully.
    Unknown,
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MacOs => "macos",
            Self::Linux => "linux",
            Self::Windows => "windows",
            Self::Unknown => "unknown",
        };
        write!(f, "{name}")
    }
}

/// Detect the OS family of the running host.
#[must_use]
pub fn detect_os() -> OsFamily {
    match std::env::consts::OS {
        "macos" => OsFamily::MacOs,
        "linux" => OsFamily::Linux,
        "windows" => OsFamily::Windows,
        _ => OsFamily::Unknown,
    }
}

/// Native package managers the backend layer can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManagerKind {
    /// Homebrew (macOS).
    Brew,
    /// apt / dpkg (Debian family).
    Apt,
    /// dnf over rpm (Fedora family).
    Dnf,
    /// yum over rpm (older Red Hat family).
    Yum,
    /// Flatpak (distro-agnostic Linux fallback).
    Flatpak,
    /// winget (Windows).
    Winget,
}

impl ManagerKind {
    /// Executable probed on `PATH` and used to drive the manager.
    #[must_use]
    pub const fn command(self) -> &'static str {
        match self {
            Self::Brew => "brew",
            Self::Apt => "apt-get",
            Self::Dnf => "dnf",
            Self::Yum => "yum",
            Self::Flatpak => "flatpak",
            Self::Winget => "winget",
        }
    }

    /// Candidate managers for an OS family, highest priority first.
    ///
    /// On Linux the distro-native manager outranks flatpak; flatpak is the
    /// fallback when no native manager is present.
    #[must_use]
    pub const fn candidates(os: OsFamily) -> &'static [Self] {
        match os {
            OsFamily::MacOs => &[Self::Brew],
            OsFamily::Linux => &[Self::Apt, Self::Dnf, Self::Yum, Self::Flatpak],
            OsFamily::Windows => &[Self::Winget],
            OsFamily::Unknown => &[],
        }
    }

    /// Whether the manager's executable is on `PATH`.
    #[must_use]
    pub fn is_available(self) -> bool {
        which::which(self.command()).is_ok()
    }
}

impl fmt::Display for ManagerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Brew => "brew",
            Self::Apt => "apt",
            Self::Dnf => "dnf",
            Self::Yum => "yum",
            Self::Flatpak => "flatpak",
            Self::Winget => "winget",
        };
        write!(f, "{name}")
    }
}

impl FromStr for ManagerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "brew" | "homebrew" => Ok(Self::Brew),
            "apt" | "apt-get" => Ok(Self::Apt),
            "dnf" => Ok(Self::Dnf),
            "yum" => Ok(Self::Yum),
            "flatpak" => Ok(Self::Flatpak),
            "winget" => Ok(Self::Winget),
            other => Err(format!("unknown package manager: {other}")),
        }
    }
}

/// Probe `PATH` for the highest-priority manager available on this OS.
///
/// Returns `None` when no candidate is present; that is a reportable state,
/// not an error. Probing is read-only and repeatable: for an unchanged
/// `PATH` the answer never varies within a process.
#[must_use]
pub fn detect_manager(os: OsFamily) -> Option<ManagerKind> {
    let found = ManagerKind::candidates(os)
        .iter()
        .copied()
        .find(|kind| kind.is_available());
    match found {
        Some(kind) => log::debug!("detected package manager: {kind}"),
        None => log::debug!("no package manager found for {os}"),
    }
    found
}

/// What detection found at startup. Selected once, never reassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostIdentity {
    /// OS family of the host.
    pub os: OsFamily,
    /// Detected manager, `None` when the host has no supported one.
    #[serde(rename = "package_manager")]
    pub manager: Option<ManagerKind>,
}

impl HostIdentity {
    /// Probe the running host.
    #[must_use]
    pub fn detect() -> Self {
        let os = detect_os();
        Self {
            os,
            manager: detect_manager(os),
        }
    }

    /// Identity with a manager chosen by the caller instead of probed.
    #[must_use]
    pub fn with_manager(os: OsFamily, manager: ManagerKind) -> Self {
        Self {
            os,
            manager: Some(manager),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn os_detection_is_idempotent() {
        assert_eq!(detect_os(), detect_os());
    }

    #[test]
    fn os_matches_compile_target() {
        let os = detect_os();
        #[cfg(target_os = "linux")]
        assert_eq!(os, OsFamily::Linux);
        #[cfg(target_os = "macos")]
        assert_eq!(os, OsFamily::MacOs);
        #[cfg(target_os = "windows")]
        assert_eq!(os, OsFamily::Windows);
    }

    #[test]
    fn manager_detection_is_idempotent() {
        let os = detect_os();
        assert_eq!(detect_manager(os), detect_manager(os));
    }

    #[test]
    fn linux_candidates_prefer_native_over_flatpak() {
        let candidates = ManagerKind::candidates(OsFamily::Linux);
        assert_eq!(candidates.first(), Some(&ManagerKind::Apt));
        assert_eq!(candidates.last(), Some(&ManagerKind::Flatpak));
    }

    #[test]
    fn unknown_os_has_no_candidates() {
        assert!(ManagerKind::candidates(OsFamily::Unknown).is_empty());
    }

    #[test]
    fn apt_probes_apt_get() {
        assert_eq!(ManagerKind::Apt.command(), "apt-get");
    }

    #[test]
    fn manager_parses_from_str() {
        assert_eq!("apt-get".parse::<ManagerKind>(), Ok(ManagerKind::Apt));
        assert_eq!("Brew".parse::<ManagerKind>(), Ok(ManagerKind::Brew));
        assert!("pacman".parse::<ManagerKind>().is_err());
    }

    #[test]
    fn display_matches_wire_names() {
        assert_eq!(ManagerKind::Apt.to_string(), "apt");
        assert_eq!(OsFamily::MacOs.to_string(), "macos");
        let json = serde_json::to_value(ManagerKind::Winget).unwrap();
        assert_eq!(json, "winget");
    }

    #[test]
    fn identity_serializes_manager_field() {
        let identity = HostIdentity::with_manager(OsFamily::Linux, ManagerKind::Apt);
        let json = serde_json::to_value(identity).unwrap();
        assert_eq!(json["os"], "linux");
        assert_eq!(json["package_manager"], "apt");
    }
}
