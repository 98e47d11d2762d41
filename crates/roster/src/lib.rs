//! # roster
//!
//! Declarative package catalogs reconciled against the host's native
//! package manager.
//!
//! This crate provides functionality for:
//! - Parsing and generating plain-text package catalogs
//! - A TTL-cached reconciliation of catalog declarations with installed
//!   state
//! - Sequential install/update batches with independent per-item outcomes
//! - A serde-serializable wire contract for embedding layers
//!
//! ## Example
//!
//! ```no_run
//! use roster::{Engine, EngineOptions};
//!
//! let engine = Engine::new("desktop.conf", &EngineOptions::default())
//!     .expect("catalog must exist");
//!
//! for status in engine.status().expect("reconcile failed") {
//!     println!("{}: installed={}", status.name, status.installed);
//! }
//!
//! let report = engine.install(&["libreoffice".to_string()]);
//! if !report.is_success() {
//!     eprintln!("{} packages failed", report.failed());
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod catalog;
pub mod error;
mod executor;
#[cfg(test)]
mod mock;
pub mod types;

pub use cache::{CacheOptions, DEFAULT_TTL, StatusCache};
pub use error::{Error, Result};
pub use types::{
    BatchItem, BatchReport, ItemOutcome, PackageDecl, PackageStatus, UpdateMode, UpdateRequest,
};

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use pmkit::backend::{Backend, backend_for};
use pmkit::elevate::{Elevation, Headless, SudoPrompt};
use pmkit::platform::{HostIdentity, ManagerKind, detect_os};
use pmkit::runner::{DEFAULT_TIMEOUT, SystemRunner};
use serde::{Deserialize, Serialize};

/// How root-privileged commands get authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElevationMode {
    /// Prepend sudo and let it prompt.
    #[default]
    Sudo,
    /// Refuse and report the exact command line for manual execution.
    Manual,
}

/// Construction-time tuning for [`Engine`].
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Snapshot lifetime of the status cache.
    pub ttl: Duration,
    /// Time budget for each manager command.
    pub timeout: Duration,
    /// Authorization policy for root-privileged commands.
    pub elevation: ElevationMode,
    /// Skip detection and force this manager.
    pub manager: Option<ManagerKind>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            timeout: DEFAULT_TIMEOUT,
            elevation: ElevationMode::Sudo,
            manager: None,
        }
    }
}

/// The reconciliation engine: one catalog, one detected manager, one cache.
///
/// Constructed once per process and shared behind `Arc` where needed; every
/// operation takes `&self`.
pub struct Engine {
    identity: HostIdentity,
    backend: Option<Box<dyn Backend>>,
    declarations: Mutex<Vec<PackageDecl>>,
    cache: StatusCache,
    catalog_path: PathBuf,
}

impl Engine {
    /// Detect the platform, select a backend and load the catalog.
    ///
    /// A missing catalog file is the only fatal condition; a host without a
    /// supported manager still constructs, and every operation degrades the
    /// way the adapter contract prescribes.
    pub fn new(catalog_path: impl Into<PathBuf>, options: &EngineOptions) -> Result<Self> {
        let catalog_path = catalog_path.into();
        let declarations = catalog::parse_file(&catalog_path)?;

        let identity = match options.manager {
            Some(manager) => HostIdentity::with_manager(detect_os(), manager),
            None => HostIdentity::detect(),
        };
        log::debug!(
            "engine: os {}, manager {:?}, {} declarations",
            identity.os,
            identity.manager,
            declarations.len()
        );

        let backend = identity.manager.map(|kind| {
            let elevation: Box<dyn Elevation> = match options.elevation {
                ElevationMode::Sudo => Box::new(SudoPrompt),
                ElevationMode::Manual => Box::new(Headless),
            };
            let runner = SystemRunner::with_elevation(elevation).with_timeout(options.timeout);
            backend_for(kind, Arc::new(runner))
        });

        Ok(Self {
            identity,
            backend,
            declarations: Mutex::new(declarations),
            cache: StatusCache::new(CacheOptions { ttl: options.ttl }),
            catalog_path,
        })
    }

    /// Engine over an injected backend, for tests and embedding layers.
    pub fn with_backend(
        declarations: Vec<PackageDecl>,
        backend: Box<dyn Backend>,
        options: &EngineOptions,
    ) -> Self {
        let identity = HostIdentity::with_manager(detect_os(), backend.kind());
        Self {
            identity,
            backend: Some(backend),
            declarations: Mutex::new(declarations),
            cache: StatusCache::new(CacheOptions { ttl: options.ttl }),
            catalog_path: PathBuf::new(),
        }
    }

    /// Host identity selected at construction.
    pub fn identity(&self) -> &HostIdentity {
        &self.identity
    }

    /// Reconciled view of every declaration plus adopted installs, served
    /// from the cache when fresh.
    pub fn status(&self) -> Result<Vec<PackageStatus>> {
        let declarations = self.snapshot_declarations();
        Ok(self.cache.read(&declarations, self.backend.as_deref()))
    }

    /// Invalidate the cache and recompute immediately.
    pub fn refresh(&self) -> Result<Vec<PackageStatus>> {
        self.cache.invalidate();
        self.status()
    }

    /// Install the named packages. Per-item outcomes, request order.
    pub fn install(&self, names: &[String]) -> BatchReport {
        let declarations = self.snapshot_declarations();
        executor::install_batch(names, &declarations, self.backend.as_deref(), &self.cache)
    }

    /// Upgrade per the request's selection mode.
    pub fn update(&self, request: &UpdateRequest) -> BatchReport {
        let declarations = self.snapshot_declarations();
        executor::update_batch(request, &declarations, self.backend.as_deref(), &self.cache)
    }

    /// Re-read the catalog file and invalidate the cache. Returns the new
    /// declaration count.
    pub fn reload_catalog(&self) -> Result<usize> {
        let declarations = catalog::parse_file(&self.catalog_path)?;
        let count = declarations.len();
        *self
            .declarations
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = declarations;
        self.cache.invalidate();
        log::debug!("catalog reloaded, {count} declarations");
        Ok(count)
    }

    /// The loaded declarations, in file order.
    pub fn declarations(&self) -> Vec<PackageDecl> {
        self.snapshot_declarations()
    }

    fn snapshot_declarations(&self) -> Vec<PackageDecl> {
        self.declarations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
