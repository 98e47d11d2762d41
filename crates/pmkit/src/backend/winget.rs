//! Winget backend for Windows hosts.
//!
//! `winget list` prints a fixed-width table whose column boundaries are only
//! knowable from the header row, so parsing slices each data row at the byte
//! offsets where the header labels start.

use std::sync::Arc;

use crate::backend::Backend;
use crate::platform::ManagerKind;
use crate::runner::{CommandOutput, CommandRunner, CommandSpec};
use crate::types::{Failure, InstallOutcome, InstalledPackage, PackageProbe, UpgradeOutcome};

/// Non-interactive flags winget needs before it will touch sources.
const AGREEMENT_FLAGS: [&str; 2] = ["--accept-source-agreements", "--accept-package-agreements"];

/// Backend driving the `winget` CLI.
pub struct WingetBackend {
    runner: Arc<dyn CommandRunner>,
}

#[derive(Debug, PartialEq, Eq)]
struct TableRow {
    name: String,
    id: String,
    version: Option<String>,
    available: Option<String>,
}

impl WingetBackend {
    /// Create a backend over the given runner.
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    fn listing(&self) -> Vec<TableRow> {
        let spec = CommandSpec::new("winget", &["list"]);
        let output = match self.runner.run(&spec) {
            Ok(output) => output,
            Err(err) => {
                log::warn!("winget: {err}");
                return Vec::new();
            }
        };
        if !output.success() {
            return Vec::new();
        }
        parse_table(&output.stdout)
    }

    fn find_row(&self, name: &str) -> Option<TableRow> {
        self.listing().into_iter().find(|row| row.is_for(name))
    }

    fn mutate(&self, verb: &str, name: &str) -> Result<CommandOutput, Failure> {
        let mut args = vec![verb, "-e", "--id", name];
        args.extend(AGREEMENT_FLAGS);
        let spec = CommandSpec::new("winget", &args);
        self.runner.run(&spec).map_err(Failure::from)
    }
}

impl Backend for WingetBackend {
    fn kind(&self) -> ManagerKind {
        ManagerKind::Winget
    }

    fn is_installed(&self, name: &str) -> bool {
        self.find_row(name).is_some()
    }

    fn installed_version(&self, name: &str) -> Option<String> {
        self.find_row(name).and_then(|row| row.version)
    }

    fn latest_version(&self, name: &str) -> Option<String> {
        self.find_row(name).and_then(|row| row.newest())
    }

    fn probe(&self, name: &str) -> PackageProbe {
        let Some(row) = self.find_row(name) else {
            return PackageProbe::default();
        };
        PackageProbe {
            installed: true,
            latest: row.newest(),
            version: row.version,
        }
    }

    fn install(&self, name: &str) -> InstallOutcome {
        let output = match self.mutate("install", name) {
            Ok(output) => output,
            Err(failure) => return InstallOutcome::failed(failure),
        };

        if diagnostic_text(&output).contains("already installed") {
            return InstallOutcome::AlreadyPresent;
        }
        if output.success() {
            return InstallOutcome::Installed;
        }
        if diagnostic_text(&output).contains("No package found matching input criteria") {
            return InstallOutcome::failed(Failure::UnknownPackage);
        }
        InstallOutcome::failed(Failure::from_stderr(diagnostic_text(&output)))
    }

    fn upgrade(&self, name: &str) -> UpgradeOutcome {
        let output = match self.mutate("upgrade", name) {
            Ok(output) => output,
            Err(failure) => return UpgradeOutcome::failed(failure),
        };

        let text = diagnostic_text(&output);
        if text.contains("No available upgrade found") || text.contains("No applicable update") {
            return UpgradeOutcome::AlreadyLatest;
        }
        if text.contains("No installed package found") {
            return UpgradeOutcome::failed(Failure::UnknownPackage);
        }
        if output.success() {
            return UpgradeOutcome::Upgraded;
        }
        UpgradeOutcome::failed(Failure::from_stderr(text))
    }

    fn list_installed(&self) -> Vec<InstalledPackage> {
        self.listing()
            .into_iter()
            .map(|row| {
                let newest = row.newest();
                let mut package = InstalledPackage::new(row.id, row.version);
                if let Some(newest) = newest {
                    package = package.with_latest(newest);
                }
                package
            })
            .collect()
    }

    fn matches(&self, declared: &str, installed: &str) -> bool {
        id_matches(declared, installed)
    }
}

impl TableRow {
    fn is_for(&self, name: &str) -> bool {
        id_matches(name, &self.id) || self.name.eq_ignore_ascii_case(name)
    }

    /// Newest known version: the Available column when populated, otherwise
    /// the row is current and the installed version stands.
    fn newest(&self) -> Option<String> {
        self.available.clone().or_else(|| self.version.clone())
    }
}

/// Whether a publisher-prefixed ID satisfies a declared name: full-ID
/// equality, or the ID's final dot-segment as a bare-name fallback.
fn id_matches(declared: &str, id: &str) -> bool {
    if declared.eq_ignore_ascii_case(id) {
        return true;
    }
    id.rsplit('.')
        .next()
        .is_some_and(|leaf| leaf.eq_ignore_ascii_case(declared))
}

/// Winget interleaves progress spinners before the table, so the header is
/// located by finding the all-dashes separator under it.
fn parse_table(stdout: &str) -> Vec<TableRow> {
    let lines: Vec<&str> = stdout.lines().collect();
    let Some(separator) = lines.iter().position(|line| {
        let trimmed = line.trim();
        !trimmed.is_empty() && trimmed.chars().all(|ch| ch == '-')
    }) else {
        return Vec::new();
    };
    if separator == 0 {
        return Vec::new();
    }
    let header = lines[separator - 1];

    let Some(name_at) = header.find("Name") else {
        return Vec::new();
    };
    let Some(id_at) = header.find("Id") else {
        return Vec::new();
    };
    let Some(version_at) = header.find("Version") else {
        return Vec::new();
    };
    let available_at = header.find("Available");
    let source_at = header.find("Source");
    let version_end = available_at.or(source_at);

    lines[separator + 1..]
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|row| TableRow {
            name: column(row, name_at, Some(id_at)).to_string(),
            id: column(row, id_at, Some(version_at)).to_string(),
            version: non_empty(column(row, version_at, version_end)),
            available: available_at.and_then(|start| non_empty(column(row, start, source_at))),
        })
        .filter(|row| !row.id.is_empty())
        .collect()
}

fn column(row: &str, start: usize, end: Option<usize>) -> &str {
    let end = end.unwrap_or(row.len()).min(row.len());
    if start >= end {
        return "";
    }
    row.get(start..end).unwrap_or("").trim()
}

fn non_empty(text: &str) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Winget reports most errors on stdout, not stderr.
fn diagnostic_text(output: &CommandOutput) -> &str {
    if output.stderr.trim().is_empty() {
        &output.stdout
    } else {
        &output.stderr
    }
}
