//! # pmkit
//!
//! Pure Rust library for driving native package managers.
//!
//! This crate provides functionality for:
//! - Detecting the host OS and which package manager it runs
//! - A uniform [`backend::Backend`] contract over brew, apt, dnf, yum,
//!   flatpak and winget
//! - Executing manager CLIs with timeouts and privilege elevation
//! - A scriptable fake runner for testing adapter behavior offline
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use pmkit::backend::backend_for;
//! use pmkit::platform::HostIdentity;
//! use pmkit::runner::SystemRunner;
//!
//! let identity = HostIdentity::detect();
//! let manager = identity.manager.expect("no package manager on this host");
//! let backend = backend_for(manager, Arc::new(SystemRunner::new()));
//!
//! if backend.is_installed("git") {
//!     println!("git is present: {:?}", backend.installed_version("git"));
//! }
//! ```
//!
//! ## Never-fault queries
//!
//! Query methods on [`backend::Backend`] return plain values and degrade to
//! "not installed" / "unknown" when the underlying CLI is missing or
//! misbehaves. Mutations report failures as data through
//! [`types::InstallOutcome`] and [`types::UpgradeOutcome`] so callers can
//! keep processing a batch after one package goes wrong.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod elevate;
pub mod platform;
pub mod runner;
pub mod types;

pub use backend::{Backend, backend_for};
pub use elevate::{Authorization, Elevation, Headless, SudoPrompt};
pub use platform::{HostIdentity, ManagerKind, OsFamily};
pub use runner::{
    CommandOutput, CommandRunner, CommandSpec, FakeRunner, Privilege, RunError, SystemRunner,
};
pub use types::{Failure, InstallOutcome, InstalledPackage, PackageProbe, UpgradeOutcome};
