//! Homebrew backend using `brew` and its JSON interface.
//!
//! Desktop applications ship as casks, so every operation tries the cask
//! namespace first and falls back to the formula namespace only when brew
//! distinguishably reports the cask as unknown. Any other failure is
//! reported as-is; a blind retry could rerun an operation that already
//! half-happened.

use std::sync::Arc;

use crate::backend::Backend;
use crate::platform::ManagerKind;
use crate::runner::{CommandOutput, CommandRunner, CommandSpec, RunError};
use crate::types::{Failure, InstallOutcome, InstalledPackage, PackageProbe, UpgradeOutcome};

/// Backend driving the `brew` CLI.
pub struct BrewBackend {
    runner: Arc<dyn CommandRunner>,
}

/// One namespace attempt: finished with an outcome, or unknown to brew.
enum Attempt<T> {
    Done(T),
    NotFound,
}

/// One namespace lookup.
enum Lookup {
    Found(PackageProbe),
    NotFound,
    Unavailable,
}

impl BrewBackend {
    /// Create a backend over the given runner.
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    fn brew(&self, args: &[&str]) -> Result<CommandOutput, RunError> {
        self.runner.run(&CommandSpec::new("brew", args))
    }

    /// Query one namespace (`--cask` or `--formula`) via `brew info --json=v2`.
    fn lookup(&self, flag: &str, name: &str) -> Lookup {
        let output = match self.brew(&["info", "--json=v2", flag, name]) {
            Ok(output) => output,
            Err(err) => {
                log::warn!("brew info {flag} {name}: {err}");
                return Lookup::Unavailable;
            }
        };

        if !output.success() {
            if is_not_found(&output.stderr) {
                return Lookup::NotFound;
            }
            log::warn!("brew info {flag} {name} exited {:?}", output.code);
            return Lookup::Unavailable;
        }

        let json: serde_json::Value = match serde_json::from_str(&output.stdout) {
            Ok(json) => json,
            Err(err) => {
                log::warn!("brew info {flag} {name}: bad JSON: {err}");
                return Lookup::Unavailable;
            }
        };

        let probe = if flag == "--cask" {
            parse_cask_probe(&json)
        } else {
            parse_formula_probe(&json)
        };
        match probe {
            Some(probe) => Lookup::Found(probe),
            None => Lookup::NotFound,
        }
    }

    /// Cask-first query with formula fallback on not-found only.
    fn query(&self, name: &str) -> PackageProbe {
        match self.lookup("--cask", name) {
            Lookup::Found(probe) => probe,
            Lookup::NotFound => match self.lookup("--formula", name) {
                Lookup::Found(probe) => probe,
                Lookup::NotFound | Lookup::Unavailable => PackageProbe::default(),
            },
            Lookup::Unavailable => PackageProbe::default(),
        }
    }

    fn try_install(&self, args: &[&str]) -> Attempt<InstallOutcome> {
        let output = match self.brew(args) {
            Ok(output) => output,
            Err(err) => return Attempt::Done(InstallOutcome::failed(Failure::from(err))),
        };

        if output.success() {
            if mentions_already_installed(&output) {
                return Attempt::Done(InstallOutcome::AlreadyPresent);
            }
            return Attempt::Done(InstallOutcome::Installed);
        }
        if is_not_found(&output.stderr) {
            return Attempt::NotFound;
        }
        if mentions_already_installed(&output) {
            return Attempt::Done(InstallOutcome::AlreadyPresent);
        }
        Attempt::Done(InstallOutcome::failed(Failure::from_stderr(&output.stderr)))
    }

    fn try_upgrade(&self, args: &[&str]) -> Attempt<UpgradeOutcome> {
        let output = match self.brew(args) {
            Ok(output) => output,
            Err(err) => return Attempt::Done(UpgradeOutcome::failed(Failure::from(err))),
        };

        if output.success() {
            if mentions_already_current(&output) {
                return Attempt::Done(UpgradeOutcome::AlreadyLatest);
            }
            return Attempt::Done(UpgradeOutcome::Upgraded);
        }
        if is_not_found(&output.stderr) {
            return Attempt::NotFound;
        }
        if mentions_already_current(&output) {
            return Attempt::Done(UpgradeOutcome::AlreadyLatest);
        }
        Attempt::Done(UpgradeOutcome::failed(Failure::from_stderr(&output.stderr)))
    }
}

impl Backend for BrewBackend {
    fn kind(&self) -> ManagerKind {
        ManagerKind::Brew
    }

    fn is_installed(&self, name: &str) -> bool {
        self.query(name).installed
    }

    fn installed_version(&self, name: &str) -> Option<String> {
        self.query(name).version
    }

    fn latest_version(&self, name: &str) -> Option<String> {
        self.query(name).latest
    }

    fn probe(&self, name: &str) -> PackageProbe {
        self.query(name)
    }

    fn install(&self, name: &str) -> InstallOutcome {
        match self.try_install(&["install", "--cask", name]) {
            Attempt::Done(outcome) => outcome,
            Attempt::NotFound => match self.try_install(&["install", name]) {
                Attempt::Done(outcome) => outcome,
                Attempt::NotFound => InstallOutcome::failed(Failure::UnknownPackage),
            },
        }
    }

    fn upgrade(&self, name: &str) -> UpgradeOutcome {
        match self.try_upgrade(&["upgrade", "--cask", name]) {
            Attempt::Done(outcome) => outcome,
            Attempt::NotFound => match self.try_upgrade(&["upgrade", name]) {
                Attempt::Done(outcome) => outcome,
                Attempt::NotFound => UpgradeOutcome::failed(Failure::UnknownPackage),
            },
        }
    }

    fn list_installed(&self) -> Vec<InstalledPackage> {
        let output = match self.brew(&["info", "--json=v2", "--installed"]) {
            Ok(output) if output.success() => output,
            Ok(output) => {
                log::warn!("brew info --installed exited {:?}", output.code);
                return Vec::new();
            }
            Err(err) => {
                log::warn!("brew info --installed: {err}");
                return Vec::new();
            }
        };

        let json: serde_json::Value = match serde_json::from_str(&output.stdout) {
            Ok(json) => json,
            Err(err) => {
                log::warn!("brew info --installed: bad JSON: {err}");
                return Vec::new();
            }
        };

        let mut packages = Vec::new();
        if let Some(casks) = json["casks"].as_array() {
            for cask in casks {
                let Some(token) = cask["token"].as_str() else {
                    continue;
                };
                let mut pkg = InstalledPackage::new(
                    token,
                    cask["installed"].as_str().map(ToString::to_string),
                );
                if let Some(latest) = cask["version"].as_str() {
                    pkg = pkg.with_latest(latest);
                }
                packages.push(pkg);
            }
        }
        if let Some(formulae) = json["formulae"].as_array() {
            for formula in formulae {
                let Some(name) = formula["name"].as_str() else {
                    continue;
                };
                let version = formula["installed"]
                    .as_array()
                    .and_then(|arr| arr.first())
                    .and_then(|entry| entry["version"].as_str())
                    .map(ToString::to_string);
                let mut pkg = InstalledPackage::new(name, version);
                if let Some(stable) = formula["versions"]["stable"].as_str() {
                    pkg = pkg.with_latest(stable);
                }
                packages.push(pkg);
            }
        }
        packages
    }
}

/// Stderr patterns brew uses for names that do not exist in a namespace.
fn is_not_found(stderr: &str) -> bool {
    let stderr = stderr.to_lowercase();
    stderr.contains("no available formula")
        || stderr.contains("no formulae found")
        || stderr.contains("no cask with this name")
        || stderr.contains("no formula or cask found")
        || stderr.contains("is unavailable")
        || stderr.contains("couldn't find")
}

fn mentions_already_installed(output: &CommandOutput) -> bool {
    let stdout = output.stdout.to_lowercase();
    let stderr = output.stderr.to_lowercase();
    stdout.contains("already installed") || stderr.contains("already installed")
}

fn mentions_already_current(output: &CommandOutput) -> bool {
    mentions_already_installed(output) || {
        let stderr = output.stderr.to_lowercase();
        let stdout = output.stdout.to_lowercase();
        stderr.contains("already up-to-date")
            || stdout.contains("already up-to-date")
            || stdout.contains("not outdated")
            || stderr.contains("not outdated")
    }
}

fn parse_cask_probe(json: &serde_json::Value) -> Option<PackageProbe> {
    let cask = json["casks"].as_array().and_then(|arr| arr.first())?;
    let version = cask["installed"].as_str().map(ToString::to_string);
    Some(PackageProbe {
        installed: version.is_some(),
        latest: cask["version"].as_str().map(ToString::to_string),
        version,
    })
}

fn parse_formula_probe(json: &serde_json::Value) -> Option<PackageProbe> {
    let formula = json["formulae"].as_array().and_then(|arr| arr.first())?;
    let version = formula["installed"]
        .as_array()
        .and_then(|arr| arr.first())
        .and_then(|entry| entry["version"].as_str())
        .map(ToString::to_string);
    Some(PackageProbe {
        installed: version.is_some(),
        latest: formula["versions"]["stable"].as_str().map(ToString::to_string),
        version,
    })
}
