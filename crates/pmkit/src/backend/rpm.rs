//! Red Hat family backend: `rpm` for state, `dnf` or `yum` for mutations.
//!
//! dnf and yum share the rpm database and near-identical CLI surfaces, so
//! one backend drives both, parameterized by front-end.

use std::sync::Arc;

use regex::Regex;

use crate::backend::Backend;
use crate::platform::ManagerKind;
use crate::runner::{CommandOutput, CommandRunner, CommandSpec};
use crate::types::{Failure, InstallOutcome, InstalledPackage, PackageProbe, UpgradeOutcome};

/// Exit code `check-update` uses to signal "updates exist".
const CHECK_UPDATE_AVAILABLE: i32 = 100;

/// Backend driving `dnf` or `yum` over the rpm database.
pub struct RpmBackend {
    frontend: ManagerKind,
    runner: Arc<dyn CommandRunner>,
}

impl RpmBackend {
    /// Backend using the `dnf` front-end.
    pub fn dnf(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            frontend: ManagerKind::Dnf,
            runner,
        }
    }

    /// Backend using the `yum` front-end.
    pub fn yum(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            frontend: ManagerKind::Yum,
            runner,
        }
    }

    fn query(&self, spec: &CommandSpec) -> Option<CommandOutput> {
        match self.runner.run(spec) {
            Ok(output) => Some(output),
            Err(err) => {
                log::warn!("{}: {err}", spec.program);
                None
            }
        }
    }

    /// `rpm -q <name>` output when installed: `name-version-release.arch`.
    fn rpm_query(&self, name: &str) -> Option<String> {
        let output = self.query(&CommandSpec::new("rpm", &["-q", name]))?;
        if !output.success() {
            return None;
        }
        output.stdout.lines().next().map(|line| line.trim().to_string())
    }

    fn check_update(&self, name: &str) -> UpdateCheck {
        let spec = CommandSpec::new(self.frontend.command(), &["check-update", "-q", name]);
        let Some(output) = self.query(&spec) else {
            return UpdateCheck::Unknown;
        };
        match output.code {
            Some(0) => UpdateCheck::Current,
            Some(CHECK_UPDATE_AVAILABLE) => {
                match parse_check_update_row(&output.stdout, name) {
                    Some(candidate) => UpdateCheck::Candidate(candidate),
                    None => UpdateCheck::Current,
                }
            }
            _ => UpdateCheck::Unknown,
        }
    }
}

enum UpdateCheck {
    Candidate(String),
    Current,
    Unknown,
}

impl Backend for RpmBackend {
    fn kind(&self) -> ManagerKind {
        self.frontend
    }

    fn is_installed(&self, name: &str) -> bool {
        self.rpm_query(name).is_some()
    }

    fn installed_version(&self, name: &str) -> Option<String> {
        extract_version(&self.rpm_query(name)?)
    }

    fn latest_version(&self, name: &str) -> Option<String> {
        match self.check_update(name) {
            UpdateCheck::Candidate(candidate) => Some(candidate),
            UpdateCheck::Current => self.installed_version(name),
            UpdateCheck::Unknown => None,
        }
    }

    fn probe(&self, name: &str) -> PackageProbe {
        let Some(row) = self.rpm_query(name) else {
            return PackageProbe::default();
        };
        let version = extract_version(&row);
        let latest = match self.check_update(name) {
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
        let spec = CommandSpec::root(self.frontend.command(), &["install", "-y", name]);
        let output = match self.runner.run(&spec) {
            Ok(output) => output,
            Err(err) => return InstallOutcome::failed(Failure::from(err)),
        };

        if output.success() {
            if output.stdout.contains("already installed")
                || output.stdout.contains("Nothing to do")
            {
                return InstallOutcome::AlreadyPresent;
            }
            return InstallOutcome::Installed;
        }
        if no_match(&output) {
            return InstallOutcome::failed(Failure::UnknownPackage);
        }
        InstallOutcome::failed(Failure::from_stderr(&output.stderr))
    }

    fn upgrade(&self, name: &str) -> UpgradeOutcome {
        let spec = CommandSpec::root(self.frontend.command(), &["upgrade", "-y", name]);
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
        if no_match(&output) {
            return UpgradeOutcome::failed(Failure::UnknownPackage);
        }
        UpgradeOutcome::failed(Failure::from_stderr(&output.stderr))
    }

    fn list_installed(&self) -> Vec<InstalledPackage> {
        let spec = CommandSpec::new("rpm", &["-qa", "--qf", "%{NAME} %{VERSION}\n"]);
        let Some(output) = self.query(&spec) else {
            return Vec::new();
        };
        if !output.success() {
            return Vec::new();
        }
        output
            .stdout
            .lines()
            .filter_map(|line| {
                let (name, version) = line.trim().split_once(' ')?;
                Some(InstalledPackage::new(name, Some(version.to_string())))
            })
            .collect()
    }
}

/// Pull the version out of an rpm package label like
/// `firefox-128.0-1.fc40.x86_64`.
fn extract_version(label: &str) -> Option<String> {
    let pattern = Regex::new(r"-(\d+\.\d+(?:\.\d+)?)").ok()?;
    Some(pattern.captures(label)?.get(1)?.as_str().to_string())
}

/// Candidate version from a `check-update` row:
/// `firefox.x86_64   129.0-1.fc40   updates`.
fn parse_check_update_row(stdout: &str, name: &str) -> Option<String> {
    for line in stdout.lines() {
        let mut fields = line.split_whitespace();
        let Some(label) = fields.next() else {
            continue;
        };
        let row_name = label.rsplit_once('.').map_or(label, |(head, _)| head);
        if !row_name.eq_ignore_ascii_case(name) {
            continue;
        }
        let version_release = fields.next()?;
        let version = version_release
            .split_once('-')
            .map_or(version_release, |(version, _)| version);
        return Some(version.to_string());
    }
    None
}

fn no_match(output: &CommandOutput) -> bool {
    let all = format!("{}\n{}", output.stdout, output.stderr);
    all.contains("No match for argument") || all.contains("Unable to find a match")
}
