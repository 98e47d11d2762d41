//! Scripted backend for cache, executor and engine tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use pmkit::backend::Backend;
use pmkit::platform::ManagerKind;
use pmkit::types::{InstallOutcome, InstalledPackage, PackageProbe, UpgradeOutcome};

/// Shared call counters that outlive the boxed backend.
#[derive(Clone, Default)]
pub(crate) struct CallCounts {
    probe: Arc<AtomicUsize>,
    list: Arc<AtomicUsize>,
    install: Arc<AtomicUsize>,
    upgrade: Arc<AtomicUsize>,
}

impl CallCounts {
    pub fn probes(&self) -> usize {
        self.probe.load(Ordering::SeqCst)
    }

    pub fn lists(&self) -> usize {
        self.list.load(Ordering::SeqCst)
    }

    pub fn installs(&self) -> usize {
        self.install.load(Ordering::SeqCst)
    }

    pub fn upgrades(&self) -> usize {
        self.upgrade.load(Ordering::SeqCst)
    }

    /// Every adapter touch, query or mutation.
    pub fn total(&self) -> usize {
        self.probes() + self.lists() + self.installs() + self.upgrades()
    }
}

/// Backend whose answers are scripted up front.
///
/// Unscripted probes report "not installed"; unscripted mutations succeed.
pub(crate) struct MockBackend {
    probes: HashMap<String, PackageProbe>,
    listing: Vec<InstalledPackage>,
    install_results: HashMap<String, InstallOutcome>,
    upgrade_results: HashMap<String, UpgradeOutcome>,
    leaf_matching: bool,
    counts: CallCounts,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            probes: HashMap::new(),
            listing: Vec::new(),
            install_results: HashMap::new(),
            upgrade_results: HashMap::new(),
            leaf_matching: false,
            counts: CallCounts::default(),
        }
    }

    /// Handle onto the call counters, kept alive by clones.
    pub fn counts(&self) -> CallCounts {
        self.counts.clone()
    }

    #[must_use]
    pub fn probe_result(mut self, name: &str, probe: PackageProbe) -> Self {
        self.probes.insert(name.to_string(), probe);
        self
    }

    /// Script a probe for a package installed at `version` with `latest`
    /// known.
    #[must_use]
    pub fn installed(self, name: &str, version: &str, latest: &str) -> Self {
        self.probe_result(
            name,
            PackageProbe {
                installed: true,
                version: Some(version.to_string()),
                latest: Some(latest.to_string()),
            },
        )
    }

    #[must_use]
    pub fn listed(mut self, package: InstalledPackage) -> Self {
        self.listing.push(package);
        self
    }

    #[must_use]
    pub fn install_result(mut self, name: &str, outcome: InstallOutcome) -> Self {
        self.install_results.insert(name.to_string(), outcome);
        self
    }

    #[must_use]
    pub fn upgrade_result(mut self, name: &str, outcome: UpgradeOutcome) -> Self {
        self.upgrade_results.insert(name.to_string(), outcome);
        self
    }

    /// Match reverse-domain installed IDs by their final segment, the way
    /// the flatpak backend does.
    #[must_use]
    pub fn with_leaf_matching(mut self) -> Self {
        self.leaf_matching = true;
        self
    }

    fn scripted(&self, name: &str) -> PackageProbe {
        self.probes.get(name).cloned().unwrap_or_default()
    }
}

impl Backend for MockBackend {
    fn kind(&self) -> ManagerKind {
        ManagerKind::Brew
    }

    fn is_installed(&self, name: &str) -> bool {
        self.scripted(name).installed
    }

    fn installed_version(&self, name: &str) -> Option<String> {
        self.scripted(name).version
    }

    fn latest_version(&self, name: &str) -> Option<String> {
        self.scripted(name).latest
    }

    fn probe(&self, name: &str) -> PackageProbe {
        self.counts.probe.fetch_add(1, Ordering::SeqCst);
        self.scripted(name)
    }

    fn install(&self, name: &str) -> InstallOutcome {
        self.counts.install.fetch_add(1, Ordering::SeqCst);
        self.install_results
            .get(name)
            .cloned()
            .unwrap_or(InstallOutcome::Installed)
    }

    fn upgrade(&self, name: &str) -> UpgradeOutcome {
        self.counts.upgrade.fetch_add(1, Ordering::SeqCst);
        self.upgrade_results
            .get(name)
            .cloned()
            .unwrap_or(UpgradeOutcome::Upgraded)
    }

    fn list_installed(&self) -> Vec<InstalledPackage> {
        self.counts.list.fetch_add(1, Ordering::SeqCst);
        self.listing.clone()
    }

    fn matches(&self, declared: &str, installed: &str) -> bool {
        if declared.eq_ignore_ascii_case(installed) {
            return true;
        }
        self.leaf_matching
            && installed
                .rsplit('.')
                .next()
                .is_some_and(|leaf| leaf.eq_ignore_ascii_case(declared))
    }
}
