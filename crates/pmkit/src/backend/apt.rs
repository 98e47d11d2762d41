//! Debian-family backend: `dpkg` for state, `apt-get` for mutations.

use std::sync::Arc;

use crate::backend::Backend;
use crate::platform::ManagerKind;
use crate::runner::{CommandOutput, CommandRunner, CommandSpec};
use crate::types::{Failure, InstallOutcome, InstalledPackage, PackageProbe, UpgradeOutcome};

/// Backend driving `apt-get`/`dpkg`.
pub struct AptBackend {
    runner: Arc<dyn CommandRunner>,
}

/// What `apt list --upgradable` said about one package.
enum UpgradeCheck {
    /// A newer version is available.
    Candidate(String),
    /// The listing ran and shows no pending upgrade.
    Current,
    /// The listing could not be obtained.
    Unknown,
}

impl AptBackend {
    /// Create a backend over the given runner.
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
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

    /// Installed state and version from one `dpkg -l` invocation.
    fn dpkg_status(&self, name: &str) -> Option<(String, String)> {
        let output = self.query(&CommandSpec::new("dpkg", &["-l", name]))?;
        if !output.success() {
            return None;
        }
        output
            .stdout
            .lines()
            .filter_map(parse_dpkg_row)
            .find(|(pkg, _)| pkg.eq_ignore_ascii_case(name))
    }

    fn upgradable(&self, name: &str) -> UpgradeCheck {
        let spec = CommandSpec::new("apt", &["list", "--upgradable", name]);
        let Some(output) = self.query(&spec) else {
            return UpgradeCheck::Unknown;
        };
        if !output.success() {
            return UpgradeCheck::Unknown;
        }
        match parse_upgradable_candidate(&output.stdout, name) {
            Some(candidate) => UpgradeCheck::Candidate(candidate),
            None => UpgradeCheck::Current,
        }
    }
}

impl Backend for AptBackend {
    fn kind(&self) -> ManagerKind {
        ManagerKind::Apt
    }

    fn is_installed(&self, name: &str) -> bool {
        self.dpkg_status(name).is_some()
    }

    fn installed_version(&self, name: &str) -> Option<String> {
        self.dpkg_status(name).map(|(_, version)| version)
    }

    fn latest_version(&self, name: &str) -> Option<String> {
        match self.upgradable(name) {
            UpgradeCheck::Candidate(candidate) => Some(candidate),
            UpgradeCheck::Current => self.installed_version(name),
            UpgradeCheck::Unknown => None,
        }
    }

    fn probe(&self, name: &str) -> PackageProbe {
        let Some((_, version)) = self.dpkg_status(name) else {
            return PackageProbe::default();
        };
        let latest = match self.upgradable(name) {
            UpgradeCheck::Candidate(candidate) => Some(candidate),
            UpgradeCheck::Current => Some(version.clone()),
            UpgradeCheck::Unknown => None,
        };
        PackageProbe {
            installed: true,
            version: Some(version),
            latest,
        }
    }

    fn install(&self, name: &str) -> InstallOutcome {
        let spec = CommandSpec::root("apt-get", &["install", "-y", name]);
        let output = match self.runner.run(&spec) {
            Ok(output) => output,
            Err(err) => return InstallOutcome::failed(Failure::from(err)),
        };

        if output.success() {
            if output.stdout.contains("is already the newest version") {
                return InstallOutcome::AlreadyPresent;
            }
            return InstallOutcome::Installed;
        }
        if unable_to_locate(&output) {
            return InstallOutcome::failed(Failure::UnknownPackage);
        }
        InstallOutcome::failed(Failure::from_stderr(&output.stderr))
    }

    fn upgrade(&self, name: &str) -> UpgradeOutcome {
        let spec = CommandSpec::root("apt-get", &["install", "--only-upgrade", "-y", name]);
        let output = match self.runner.run(&spec) {
            Ok(output) => output,
            Err(err) => return UpgradeOutcome::failed(Failure::from(err)),
        };

        if output.success() {
            if output.stdout.contains("is already the newest version") {
                return UpgradeOutcome::AlreadyLatest;
            }
            // --only-upgrade exits zero for packages that were never
            // installed; report that instead of claiming an upgrade.
            if output.stdout.contains("is not installed")
                || output.stdout.contains("only upgrades are requested")
            {
                return UpgradeOutcome::failed(Failure::Command {
                    message: format!("{name} is not installed"),
                });
            }
            return UpgradeOutcome::Upgraded;
        }
        if unable_to_locate(&output) {
            return UpgradeOutcome::failed(Failure::UnknownPackage);
        }
        UpgradeOutcome::failed(Failure::from_stderr(&output.stderr))
    }

    fn list_installed(&self) -> Vec<InstalledPackage> {
        let Some(output) = self.query(&CommandSpec::new("dpkg", &["-l"])) else {
            return Vec::new();
        };
        if !output.success() {
            return Vec::new();
        }
        output
            .stdout
            .lines()
            .filter_map(parse_dpkg_row)
            .map(|(name, version)| InstalledPackage::new(name, Some(version)))
            .collect()
    }
}

/// Parse one `dpkg -l` row into (name, version). Only rows in the
/// desired=installed, status=installed state (`ii`) count; the
/// architecture suffix (`firefox:amd64`) is stripped.
fn parse_dpkg_row(line: &str) -> Option<(String, String)> {
    let mut fields = line.split_whitespace();
    if fields.next()? != "ii" {
        return None;
    }
    let name = fields.next()?.split(':').next()?;
    let version = fields.next()?;
    Some((name.to_string(), version.to_string()))
}

/// Candidate version from an `apt list --upgradable` row for `name`:
/// `name/suite <candidate> <arch> [upgradable from: <current>]`.
fn parse_upgradable_candidate(stdout: &str, name: &str) -> Option<String> {
    for line in stdout.lines() {
        let Some((head, _)) = line.split_once('/') else {
            continue;
        };
        if !head.eq_ignore_ascii_case(name) {
            continue;
        }
        if !line.contains("upgradable") {
            continue;
        }
        let candidate = line.split_whitespace().nth(1)?;
        return Some(candidate.to_string());
    }
    None
}

fn unable_to_locate(output: &CommandOutput) -> bool {
    output.stderr.contains("Unable to locate package")
        || output.stdout.contains("Unable to locate package")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elevate::Headless;
    use crate::runner::{FakeRunner, SystemRunner};

    const DPKG_FIREFOX: &str = "\
Desired=Unknown/Install/Remove/Purge/Hold
| Status=Not/Inst/Conf-files/Unpacked/halF-conf/Half-inst/trig-aWait/Trig-pend
|/ Err?=(none)/Reinst-required (Status,Err: uppercase=bad)
||/ Name           Version                Architecture Description
+++-==============-======================-============-==========================
ii  firefox:amd64  128.0+build2-0ubuntu1  amd64        Safe and easy web browser
";

    const APT_UPGRADABLE: &str = "\
Listing... Done
firefox/noble-updates 129.0-1ubuntu1 amd64 [upgradable from: 128.0+build2-0ubuntu1]
";

    fn backend(runner: FakeRunner) -> (Arc<FakeRunner>, AptBackend) {
        let runner = Arc::new(runner);
        (runner.clone(), AptBackend::new(runner))
    }

    #[test]
    fn dpkg_row_parses_fixed_width_listing() {
        assert_eq!(
            parse_dpkg_row("ii  firefox:amd64  128.0  amd64  Safe browser"),
            Some(("firefox".to_string(), "128.0".to_string()))
        );
        assert_eq!(parse_dpkg_row("rc  old-pkg  1.0  amd64  removed"), None);
        assert_eq!(parse_dpkg_row("||/ Name Version Architecture"), None);
        assert_eq!(parse_dpkg_row(""), None);
    }

    #[test]
    fn probe_reads_installed_and_candidate_versions() {
        let (_, backend) = backend(
            FakeRunner::new()
                .ok("dpkg -l firefox", DPKG_FIREFOX)
                .ok("apt list --upgradable firefox", APT_UPGRADABLE),
        );
        let probe = backend.probe("firefox");
        assert!(probe.installed);
        assert_eq!(probe.version.as_deref(), Some("128.0+build2-0ubuntu1"));
        assert_eq!(probe.latest.as_deref(), Some("129.0-1ubuntu1"));
    }

    #[test]
    fn probe_without_upgradable_row_is_current() {
        let (_, backend) = backend(
            FakeRunner::new()
                .ok("dpkg -l firefox", DPKG_FIREFOX)
                .ok("apt list --upgradable firefox", "Listing... Done\n"),
        );
        let probe = backend.probe("firefox");
        assert_eq!(probe.version, probe.latest);
    }

    #[test]
    fn not_installed_probe_skips_upgradable_lookup() {
        let (runner, backend) = backend(FakeRunner::new().fail(
            "dpkg -l gimp",
            1,
            "dpkg-query: no packages found matching gimp",
        ));
        let probe = backend.probe("gimp");
        assert!(!probe.installed);
        assert_eq!(runner.calls(), vec!["dpkg -l gimp".to_string()]);
    }

    #[test]
    fn install_maps_unable_to_locate_to_unknown_package() {
        let (_, backend) = backend(FakeRunner::new().fail(
            "apt-get install -y nonexistent",
            100,
            "E: Unable to locate package nonexistent",
        ));
        assert_eq!(
            backend.install("nonexistent"),
            InstallOutcome::failed(Failure::UnknownPackage)
        );
    }

    #[test]
    fn install_already_newest_is_already_present() {
        let (_, backend) = backend(FakeRunner::new().ok(
            "apt-get install -y firefox",
            "firefox is already the newest version (128.0+build2-0ubuntu1).\n0 upgraded, 0 newly installed.",
        ));
        assert_eq!(backend.install("firefox"), InstallOutcome::AlreadyPresent);
    }

    #[test]
    fn upgrade_of_uninstalled_package_fails() {
        let (_, backend) = backend(FakeRunner::new().ok(
            "apt-get install --only-upgrade -y gimp",
            "Skipping gimp, it is not installed and only upgrades are requested.",
        ));
        match backend.upgrade("gimp") {
            UpgradeOutcome::Failed {
                failure: Failure::Command { message },
            } => assert!(message.contains("not installed")),
            other => panic!("expected command failure, got {other:?}"),
        }
    }

    #[test]
    fn headless_elevation_surfaces_exact_command() {
        let runner = Arc::new(SystemRunner::with_elevation(Box::new(Headless)));
        let backend = AptBackend::new(runner);
        assert_eq!(
            backend.install("firefox"),
            InstallOutcome::failed(Failure::RequiresElevation {
                command: "sudo apt-get install -y firefox".to_string()
            })
        );
    }

    #[test]
    fn install_timeout_is_reported_not_retried() {
        let (runner, backend) =
            backend(FakeRunner::new().timeout("apt-get install -y libreoffice"));
        match backend.install("libreoffice") {
            InstallOutcome::Failed {
                failure: Failure::Timeout { .. },
            } => {}
            other => panic!("expected timeout, got {other:?}"),
        }
        assert_eq!(runner.call_count(), 1);
    }

    #[test]
    fn list_installed_collects_ii_rows() {
        let listing = format!("{DPKG_FIREFOX}ii  vlc  3.0.20-1  amd64  multimedia player\n");
        let (_, backend) = backend(FakeRunner::new().ok("dpkg -l", &listing));
        let installed = backend.list_installed();
        assert_eq!(installed.len(), 2);
        assert_eq!(installed[1].name, "vlc");
        assert_eq!(installed[1].version.as_deref(), Some("3.0.20-1"));
    }
}
