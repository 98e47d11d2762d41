//! Flatpak backend, the distro-agnostic Linux fallback.
//!
//! Flatpak identifies applications by reverse-domain IDs
//! (`org.libreoffice.LibreOffice`) while catalogs declare bare names, so
//! matching accepts either the full ID or its final segment.

use std::sync::Arc;

use crate::backend::Backend;
use crate::platform::ManagerKind;
use crate::runner::{CommandOutput, CommandRunner, CommandSpec};
use crate::types::{Failure, InstallOutcome, InstalledPackage, PackageProbe, UpgradeOutcome};

/// Remote new installs come from.
const DEFAULT_REMOTE: &str = "flathub";

/// Backend driving the `flatpak` CLI.
pub struct FlatpakBackend {
    runner: Arc<dyn CommandRunner>,
}

enum UpdateCheck {
    Candidate(String),
    Current,
    Unknown,
}

impl FlatpakBackend {
    /// Create a backend over the given runner.
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    fn query(&self, spec: &CommandSpec) -> Option<CommandOutput> {
        match self.runner.run(spec) {
            Ok(output) => Some(output),
            Err(err) => {
                log::warn!("flatpak: {err}");
                None
            }
        }
    }

    /// Tab-separated `application<TAB>version` rows of installed apps.
    fn installed_rows(&self) -> Vec<(String, Option<String>)> {
        let spec = CommandSpec::new("flatpak", &["list", "--app", "--columns=application,version"]);
        let Some(output) = self.query(&spec) else {
            return Vec::new();
        };
        if !output.success() {
            return Vec::new();
        }
        parse_columns(&output.stdout)
    }

    fn remote_update(&self, name: &str) -> UpdateCheck {
        let spec = CommandSpec::new(
            "flatpak",
            &["remote-ls", "--updates", "--app", "--columns=application,version"],
        );
        let Some(output) = self.query(&spec) else {
            return UpdateCheck::Unknown;
        };
        if !output.success() {
            return UpdateCheck::Unknown;
        }
        for (id, version) in parse_columns(&output.stdout) {
            if id_matches(name, &id) {
                return version.map_or(UpdateCheck::Unknown, UpdateCheck::Candidate);
            }
        }
        UpdateCheck::Current
    }
}

impl Backend for FlatpakBackend {
    fn kind(&self) -> ManagerKind {
        ManagerKind::Flatpak
    }

    fn is_installed(&self, name: &str) -> bool {
        self.installed_rows()
            .iter()
            .any(|(id, _)| id_matches(name, id))
    }

    fn installed_version(&self, name: &str) -> Option<String> {
        self.installed_rows()
            .into_iter()
            .find(|(id, _)| id_matches(name, id))
            .and_then(|(_, version)| version)
    }

    fn latest_version(&self, name: &str) -> Option<String> {
        match self.remote_update(name) {
            UpdateCheck::Candidate(candidate) => Some(candidate),
            UpdateCheck::Current => self.installed_version(name),
            UpdateCheck::Unknown => None,
        }
    }

    fn probe(&self, name: &str) -> PackageProbe {
        let row = self
            .installed_rows()
            .into_iter()
            .find(|(id, _)| id_matches(name, id));
        let Some((_, version)) = row else {
            return PackageProbe::default();
        };
        let latest = match self.remote_update(name) {
            UpdateCheck::Candidate(candidate) => Some(candidate),
            UpdateCheck::Current => version.clone(),
            UpdateCheck::Unknown => None,
        };
        PackageProbe {
            installed: true,
            version,
            latest,
        }
    }

    fn install(&self, name: &str) -> InstallOutcome {
        let spec = CommandSpec::new("flatpak", &["install", "-y", DEFAULT_REMOTE, name]);
        let output = match self.runner.run(&spec) {
            Ok(output) => output,
            Err(err) => return InstallOutcome::failed(Failure::from(err)),
        };

        if mentions_already_installed(&output) {
            return InstallOutcome::AlreadyPresent;
        }
        if output.success() {
            return InstallOutcome::Installed;
        }
        if output.stderr.contains("No remote refs found")
            || output.stderr.contains("Nothing matches")
        {
            return InstallOutcome::failed(Failure::UnknownPackage);
        }
        InstallOutcome::failed(Failure::from_stderr(&output.stderr))
    }

    fn upgrade(&self, name: &str) -> UpgradeOutcome {
        let spec = CommandSpec::new("flatpak", &["update", "-y", name]);
        let output = match self.runner.run(&spec) {
            Ok(output) => output,
            Err(err) => return UpgradeOutcome::failed(Failure::from(err)),
        };

        if output.success() {
            if output.stdout.contains("Nothing to do") {
                return UpgradeOutcome::AlreadyLatest;
            }
            return UpgradeOutcome::Upgraded;
        }
        UpgradeOutcome::failed(Failure::from_stderr(&output.stderr))
    }

    fn list_installed(&self) -> Vec<InstalledPackage> {
        self.installed_rows()
            .into_iter()
            .map(|(id, version)| InstalledPackage::new(id, version))
            .collect()
    }

    fn matches(&self, declared: &str, installed: &str) -> bool {
        id_matches(declared, installed)
    }
}

/// Whether a reverse-domain application ID satisfies a declared name:
/// full-ID equality, or the ID's final segment as a bare-name fallback.
fn id_matches(declared: &str, id: &str) -> bool {
    if declared.eq_ignore_ascii_case(id) {
        return true;
    }
    id.rsplit('.')
        .next()
        .is_some_and(|leaf| leaf.eq_ignore_ascii_case(declared))
}

fn parse_columns(stdout: &str) -> Vec<(String, Option<String>)> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let mut columns = line.split('\t');
            let id = columns.next().unwrap_or_default().trim().to_string();
            let version = columns
                .next()
                .map(str::trim)
                .filter(|version| !version.is_empty())
                .map(ToString::to_string);
            (id, version)
        })
        .filter(|(id, _)| !id.is_empty())
        .collect()
}

fn mentions_already_installed(output: &CommandOutput) -> bool {
    output.stdout.contains("already installed") || output.stderr.contains("already installed")
}
