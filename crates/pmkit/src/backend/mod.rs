//! Backend abstraction over native package managers.
//!
//! Each backend translates one manager's command dialect into the neutral
//! adapter contract. The contract is total: a missing manager binary, a
//! timeout, or a non-zero exit degrades a query to "unknown" and a mutation
//! to a failed outcome. Nothing panics and no raw error crosses the trait
//! boundary, so callers never need manager-specific handling.

use std::sync::Arc;

use crate::platform::ManagerKind;
use crate::runner::CommandRunner;
use crate::types::{InstallOutcome, InstalledPackage, PackageProbe, UpgradeOutcome};

pub mod apt;
pub mod brew;
pub mod flatpak;
pub mod rpm;
pub mod winget;

pub use apt::AptBackend;
pub use brew::BrewBackend;
pub use flatpak::FlatpakBackend;
pub use rpm::RpmBackend;
pub use winget::WingetBackend;

/// Adapter contract every supported package manager implements.
///
/// Backends are stateless beyond their runner handle; all system state
/// lives in the manager itself.
pub trait Backend: Send + Sync {
    /// Which manager this backend drives.
    fn kind(&self) -> ManagerKind;

    /// Whether `name` is currently installed.
    fn is_installed(&self, name: &str) -> bool;

    /// Installed version of `name`, `None` when not installed or not
    /// determinable.
    fn installed_version(&self, name: &str) -> Option<String>;

    /// Newest version the manager knows for `name`. Best-effort: `None`
    /// means unknown, not "no update".
    fn latest_version(&self, name: &str) -> Option<String>;

    /// Install `name`.
    fn install(&self, name: &str) -> InstallOutcome;

    /// Upgrade `name` to the newest available version.
    fn upgrade(&self, name: &str) -> UpgradeOutcome;

    /// Everything the manager reports installed, empty when the listing
    /// cannot be obtained.
    fn list_installed(&self) -> Vec<InstalledPackage>;

    /// Whether an installed identifier satisfies a declared name.
    ///
    /// Case-insensitive equality by default. Managers whose installed
    /// identifiers are not catalog names (flatpak application IDs)
    /// override this.
    fn matches(&self, declared: &str, installed: &str) -> bool {
        declared.eq_ignore_ascii_case(installed)
    }

    /// Installed state and versions for one name.
    ///
    /// The default composes the single queries and skips version lookups
    /// for packages that are not installed. Backends with a cheaper
    /// combined form override it.
    fn probe(&self, name: &str) -> PackageProbe {
        if !self.is_installed(name) {
            return PackageProbe::default();
        }
        PackageProbe {
            installed: true,
            version: self.installed_version(name),
            latest: self.latest_version(name),
        }
    }
}

/// Construct the backend for a manager kind.
pub fn backend_for(kind: ManagerKind, runner: Arc<dyn CommandRunner>) -> Box<dyn Backend> {
    match kind {
        ManagerKind::Brew => Box::new(BrewBackend::new(runner)),
        ManagerKind::Apt => Box::new(AptBackend::new(runner)),
        ManagerKind::Dnf => Box::new(RpmBackend::dnf(runner)),
        ManagerKind::Yum => Box::new(RpmBackend::yum(runner)),
        ManagerKind::Flatpak => Box::new(FlatpakBackend::new(runner)),
        ManagerKind::Winget => Box::new(WingetBackend::new(runner)),
    }
}
