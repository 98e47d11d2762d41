//! Reconciliation cache: a TTL snapshot of merged package state.
//!
//! Recomputing sweeps the package manager once per catalog entry plus one
//! full listing, so snapshots are reused aggressively. A snapshot is either
//! fresh (younger than the TTL, not invalidated) or stale; there is no
//! partial patching, a stale snapshot is replaced wholesale.

use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};
use std::time::{Duration, Instant};

use pmkit::backend::Backend;
use pmkit::types::{InstalledPackage, PackageProbe};

use crate::types::{PackageDecl, PackageStatus};

/// Default snapshot lifetime.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

/// Tuning for [`StatusCache`].
#[derive(Debug, Clone)]
pub struct CacheOptions {
    /// How long a snapshot stays fresh.
    pub ttl: Duration,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self { ttl: DEFAULT_TTL }
    }
}

struct Snapshot {
    statuses: Vec<PackageStatus>,
    computed_at: Instant,
    dirty: bool,
}

impl Snapshot {
    fn is_fresh(&self, ttl: Duration) -> bool {
        !self.dirty && self.computed_at.elapsed() < ttl
    }
}

/// TTL cache over the merged catalog and manager view.
///
/// The snapshot lock is held only to copy data in or out; the recompute
/// lock spans the manager sweep. A reader that finds a sweep in progress
/// serves the previous snapshot when one exists and only blocks for the
/// very first computation.
pub struct StatusCache {
    ttl: Duration,
    snapshot: Mutex<Option<Snapshot>>,
    recompute: Mutex<()>,
}

impl StatusCache {
    /// An empty cache; the first read computes.
    pub fn new(options: CacheOptions) -> Self {
        Self {
            ttl: options.ttl,
            snapshot: Mutex::new(None),
            recompute: Mutex::new(()),
        }
    }

    /// The merged view, recomputed first when the snapshot is stale.
    pub fn read(
        &self,
        declarations: &[PackageDecl],
        backend: Option<&dyn Backend>,
    ) -> Vec<PackageStatus> {
        if let Some(statuses) = self.fresh() {
            log::debug!("status cache hit");
            return statuses;
        }

        let guard = match self.recompute.try_lock() {
            Ok(guard) => Some(guard),
            Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => None,
        };

        match guard {
            Some(guard) => self.recompute(&guard, declarations, backend),
            None => {
                // A sweep is in flight on another thread.
                if let Some(stale) = self.any() {
                    log::debug!("status cache serving stale snapshot during recompute");
                    return stale;
                }
                let guard = self
                    .recompute
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                self.recompute(&guard, declarations, backend)
            }
        }
    }

    /// Mark the current snapshot stale; the next read recomputes.
    pub fn invalidate(&self) {
        let mut slot = self.slot();
        if let Some(snapshot) = slot.as_mut() {
            snapshot.dirty = true;
            log::debug!("status cache invalidated");
        }
    }

    fn recompute(
        &self,
        _recompute_guard: &MutexGuard<'_, ()>,
        declarations: &[PackageDecl],
        backend: Option<&dyn Backend>,
    ) -> Vec<PackageStatus> {
        // Another thread may have finished a sweep while this one waited on
        // the guard.
        if let Some(statuses) = self.fresh() {
            return statuses;
        }

        log::debug!("status cache miss, sweeping {} declarations", declarations.len());
        let statuses = merge(declarations, backend);

        let mut slot = self.slot();
        *slot = Some(Snapshot {
            statuses: statuses.clone(),
            computed_at: Instant::now(),
            dirty: false,
        });
        statuses
    }

    fn fresh(&self) -> Option<Vec<PackageStatus>> {
        let slot = self.slot();
        slot.as_ref()
            .filter(|snapshot| snapshot.is_fresh(self.ttl))
            .map(|snapshot| snapshot.statuses.clone())
    }

    fn any(&self) -> Option<Vec<PackageStatus>> {
        let slot = self.slot();
        slot.as_ref().map(|snapshot| snapshot.statuses.clone())
    }

    fn slot(&self) -> MutexGuard<'_, Option<Snapshot>> {
        self.snapshot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One wholesale merge: every declaration probed in catalog order, then
/// installed packages the catalog does not declare appended as adopted rows.
fn merge(declarations: &[PackageDecl], backend: Option<&dyn Backend>) -> Vec<PackageStatus> {
    let Some(backend) = backend else {
        log::warn!("no package manager detected, reporting catalog state only");
        return declarations
            .iter()
            .map(|decl| declared_status(decl, &PackageProbe::default()))
            .collect();
    };

    let mut statuses: Vec<PackageStatus> = declarations
        .iter()
        .map(|decl| declared_status(decl, &backend.probe(&decl.name)))
        .collect();

    for installed in backend.list_installed() {
        let declared = declarations
            .iter()
            .any(|decl| backend.matches(&decl.name, &installed.name));
        if !declared {
            statuses.push(adopted_status(installed));
        }
    }

    statuses
}

fn declared_status(decl: &PackageDecl, probe: &PackageProbe) -> PackageStatus {
    let update_available = probe.installed && differs(&probe.version, &probe.latest);
    PackageStatus {
        name: decl.name.clone(),
        description: decl.description.clone(),
        enabled: decl.enabled,
        declared: true,
        installed: probe.installed,
        version: probe.version.clone(),
        update_available,
        new_version: if update_available {
            probe.latest.clone()
        } else {
            None
        },
    }
}

fn adopted_status(installed: InstalledPackage) -> PackageStatus {
    let update_available = differs(&installed.version, &installed.latest);
    PackageStatus {
        name: installed.name,
        description: None,
        enabled: false,
        declared: false,
        installed: true,
        version: installed.version,
        update_available,
        new_version: if update_available {
            installed.latest
        } else {
            None
        },
    }
}

/// Both versions known and not equal.
fn differs(version: &Option<String>, latest: &Option<String>) -> bool {
    match (version, latest) {
        (Some(version), Some(latest)) => version != latest,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBackend;

    fn declarations(names: &[&str]) -> Vec<PackageDecl> {
        names.iter().copied().map(PackageDecl::new).collect()
    }

    fn hour_cache() -> StatusCache {
        StatusCache::new(CacheOptions {
            ttl: Duration::from_secs(3600),
        })
    }

    #[test]
    fn fresh_snapshot_serves_without_adapter_calls() {
        let decls = declarations(&["firefox", "gimp"]);
        let backend = MockBackend::new().installed("firefox", "128.0", "128.0");
        let counts = backend.counts();
        let cache = hour_cache();

        let first = cache.read(&decls, Some(&backend));
        let after_first = counts.total();
        let second = cache.read(&decls, Some(&backend));

        assert_eq!(first, second);
        assert_eq!(counts.total(), after_first);
    }

    #[test]
    fn expired_snapshot_recomputes() {
        let decls = declarations(&["firefox"]);
        let backend = MockBackend::new();
        let counts = backend.counts();
        let cache = StatusCache::new(CacheOptions { ttl: Duration::ZERO });

        cache.read(&decls, Some(&backend));
        cache.read(&decls, Some(&backend));

        assert_eq!(counts.probes(), 2);
        assert_eq!(counts.lists(), 2);
    }

    #[test]
    fn invalidate_forces_one_recompute() {
        let decls = declarations(&["firefox"]);
        let backend = MockBackend::new();
        let counts = backend.counts();
        let cache = hour_cache();

        cache.read(&decls, Some(&backend));
        cache.invalidate();
        cache.read(&decls, Some(&backend));
        cache.read(&decls, Some(&backend));

        assert_eq!(counts.probes(), 2);
    }

    #[test]
    fn declared_statuses_keep_catalog_order() {
        let decls = vec![
            PackageDecl::new("zsh"),
            PackageDecl::new("antigen").disabled(),
            PackageDecl::new("bat"),
        ];
        let cache = hour_cache();
        let statuses = cache.read(&decls, Some(&MockBackend::new()));

        let names: Vec<_> = statuses.iter().map(|status| status.name.as_str()).collect();
        assert_eq!(names, ["zsh", "antigen", "bat"]);
        assert!(!statuses[1].enabled);
        assert!(statuses.iter().all(|status| status.declared));
    }

    #[test]
    fn version_divergence_flags_update() {
        let decls = declarations(&["libreoffice"]);
        let backend = MockBackend::new().installed("libreoffice", "7.6.2", "7.6.4");
        let cache = hour_cache();

        let statuses = cache.read(&decls, Some(&backend));
        assert!(statuses[0].installed);
        assert!(statuses[0].update_available);
        assert_eq!(statuses[0].new_version.as_deref(), Some("7.6.4"));
    }

    #[test]
    fn equal_versions_mean_no_update() {
        let decls = declarations(&["firefox"]);
        let backend = MockBackend::new().installed("firefox", "128.0", "128.0");
        let statuses = hour_cache().read(&decls, Some(&backend));
        assert!(!statuses[0].update_available);
        assert_eq!(statuses[0].new_version, None);
    }

    #[test]
    fn unknown_latest_means_no_update() {
        let decls = declarations(&["firefox"]);
        let backend = MockBackend::new().probe_result(
            "firefox",
            PackageProbe {
                installed: true,
                version: Some("128.0".to_string()),
                latest: None,
            },
        );
        let statuses = hour_cache().read(&decls, Some(&backend));
        assert!(statuses[0].installed);
        assert!(!statuses[0].update_available);
    }

    #[test]
    fn undeclared_installed_packages_are_adopted() {
        let decls = declarations(&["firefox"]);
        let backend = MockBackend::new()
            .installed("firefox", "128.0", "128.0")
            .listed(InstalledPackage::new("firefox", Some("128.0".to_string())))
            .listed(InstalledPackage::new("vlc", Some("3.0.20".to_string())));
        let statuses = hour_cache().read(&decls, Some(&backend));

        assert_eq!(statuses.len(), 2);
        let adopted = &statuses[1];
        assert_eq!(adopted.name, "vlc");
        assert!(adopted.installed);
        assert!(!adopted.declared);
        assert!(!adopted.enabled);
    }

    #[test]
    fn adoption_dedups_through_the_backend_matcher() {
        let decls = declarations(&["libreoffice"]);
        let backend = MockBackend::new()
            .with_leaf_matching()
            .installed("libreoffice", "24.2.3", "24.2.3")
            .listed(InstalledPackage::new(
                "org.libreoffice.LibreOffice",
                Some("24.2.3".to_string()),
            ));
        let statuses = hour_cache().read(&decls, Some(&backend));

        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].name, "libreoffice");
    }

    #[test]
    fn no_backend_reports_catalog_only() {
        let decls = vec![PackageDecl::new("firefox").with_description("Browser")];
        let statuses = hour_cache().read(&decls, None);

        assert_eq!(statuses.len(), 1);
        assert!(!statuses[0].installed);
        assert_eq!(statuses[0].version, None);
        assert_eq!(statuses[0].description.as_deref(), Some("Browser"));
    }
}
