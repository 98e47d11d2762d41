//! Core types of the reconciliation engine.
//!
//! Everything here derives serde so embedding layers can relay engine
//! results as JSON unchanged.

use pmkit::types::{Failure, InstallOutcome, UpgradeOutcome};
use serde::{Deserialize, Serialize};

/// One declaration from the package catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDecl {
    /// Package name as the native manager knows it.
    pub name: String,
    /// Human-readable description shown in listings.
    pub description: Option<String>,
    /// Disabled declarations stay in the file with a leading marker and are
    /// reported but never auto-selected.
    pub enabled: bool,
}

impl PackageDecl {
    /// An enabled declaration without a description.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            enabled: true,
        }
    }

    /// Attach a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Mark the declaration disabled.
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Reconciled view of one package: catalog declaration merged with what the
/// package manager reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageStatus {
    /// Package (or installed artifact) name.
    pub name: String,
    /// Description from the catalog, when declared.
    pub description: Option<String>,
    /// Whether the declaration is enabled. Always false for adopted rows.
    pub enabled: bool,
    /// True when the name comes from the catalog; false for installed
    /// packages the catalog does not declare.
    pub declared: bool,
    /// Whether the manager reports the package as present.
    pub installed: bool,
    /// Installed version, when the manager reports one.
    pub version: Option<String>,
    /// True when installed and a different newer version is known.
    pub update_available: bool,
    /// The newer version, populated when `update_available`.
    pub new_version: Option<String>,
}

/// Which packages an update batch operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateMode {
    /// Every package currently flagged with an available update.
    All,
    /// Only the packages named in the request.
    Selected,
    /// Update nothing.
    None,
}

/// An update batch request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRequest {
    /// Target selection mode.
    pub mode: UpdateMode,
    /// Names for [`UpdateMode::Selected`]; ignored otherwise.
    #[serde(default)]
    pub packages: Vec<String>,
}

impl UpdateRequest {
    /// Update everything with a pending version.
    pub fn all() -> Self {
        Self {
            mode: UpdateMode::All,
            packages: Vec::new(),
        }
    }

    /// Update the named packages only.
    pub fn selected(packages: Vec<String>) -> Self {
        Self {
            mode: UpdateMode::Selected,
            packages,
        }
    }

    /// Update nothing.
    pub fn none() -> Self {
        Self {
            mode: UpdateMode::None,
            packages: Vec::new(),
        }
    }
}

/// Normalized per-item result of a mutating batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ItemOutcome {
    /// The mutation ran and changed the system.
    Succeeded,
    /// The system already satisfied the request. Not an error.
    AlreadySatisfied,
    /// The mutation failed; the rest of the batch still ran.
    Failed {
        /// What went wrong.
        failure: Failure,
    },
}

impl ItemOutcome {
    /// Whether this item failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

impl From<InstallOutcome> for ItemOutcome {
    fn from(outcome: InstallOutcome) -> Self {
        match outcome {
            InstallOutcome::Installed => Self::Succeeded,
            InstallOutcome::AlreadyPresent => Self::AlreadySatisfied,
            InstallOutcome::Failed { failure } => Self::Failed { failure },
        }
    }
}

impl From<UpgradeOutcome> for ItemOutcome {
    fn from(outcome: UpgradeOutcome) -> Self {
        match outcome {
            UpgradeOutcome::Upgraded => Self::Succeeded,
            UpgradeOutcome::AlreadyLatest => Self::AlreadySatisfied,
            UpgradeOutcome::Failed { failure } => Self::Failed { failure },
        }
    }
}

/// One entry of a batch report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItem {
    /// Package the item operated on.
    pub name: String,
    /// What happened.
    pub outcome: ItemOutcome,
}

/// Result of a mutating batch, one item per requested package, in request
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Per-package outcomes.
    pub items: Vec<BatchItem>,
}

impl BatchReport {
    /// Append an item.
    pub fn push(&mut self, name: impl Into<String>, outcome: ItemOutcome) {
        self.items.push(BatchItem {
            name: name.into(),
            outcome,
        });
    }

    /// Number of items that changed the system.
    pub fn succeeded(&self) -> usize {
        self.count(|outcome| matches!(outcome, ItemOutcome::Succeeded))
    }

    /// Number of items that needed no work.
    pub fn already_satisfied(&self) -> usize {
        self.count(|outcome| matches!(outcome, ItemOutcome::AlreadySatisfied))
    }

    /// Number of failed items.
    pub fn failed(&self) -> usize {
        self.count(ItemOutcome::is_failed)
    }

    /// Whether the whole batch went through without a failure.
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// Number of items in the batch.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the batch contains no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn count(&self, pred: impl Fn(&ItemOutcome) -> bool) -> usize {
        self.items.iter().filter(|item| pred(&item.outcome)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decl_builder() {
        let decl = PackageDecl::new("blender").with_description("3D tool").disabled();
        assert_eq!(decl.name, "blender");
        assert_eq!(decl.description.as_deref(), Some("3D tool"));
        assert!(!decl.enabled);
    }

    #[test]
    fn outcomes_normalize_from_install() {
        assert_eq!(ItemOutcome::from(InstallOutcome::Installed), ItemOutcome::Succeeded);
        assert_eq!(
            ItemOutcome::from(InstallOutcome::AlreadyPresent),
            ItemOutcome::AlreadySatisfied
        );
        let failed = ItemOutcome::from(InstallOutcome::failed(Failure::UnknownPackage));
        assert!(failed.is_failed());
    }

    #[test]
    fn outcomes_normalize_from_upgrade() {
        assert_eq!(ItemOutcome::from(UpgradeOutcome::Upgraded), ItemOutcome::Succeeded);
        assert_eq!(
            ItemOutcome::from(UpgradeOutcome::AlreadyLatest),
            ItemOutcome::AlreadySatisfied
        );
    }

    #[test]
    fn report_counters() {
        let mut report = BatchReport::default();
        report.push("a", ItemOutcome::Succeeded);
        report.push("b", ItemOutcome::AlreadySatisfied);
        report.push(
            "c",
            ItemOutcome::Failed {
                failure: Failure::UnknownPackage,
            },
        );
        assert_eq!(report.len(), 3);
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.already_satisfied(), 1);
        assert_eq!(report.failed(), 1);
        assert!(!report.is_success());
    }

    #[test]
    fn item_outcome_wire_shape() {
        let json = serde_json::to_value(ItemOutcome::Failed {
            failure: Failure::UnknownPackage,
        })
        .unwrap();
        assert_eq!(json["result"], "failed");
        assert_eq!(json["failure"]["kind"], "unknown_package");
    }

    #[test]
    fn update_request_packages_default_when_absent() {
        let request: UpdateRequest = serde_json::from_str(r#"{"mode":"all"}"#).unwrap();
        assert_eq!(request.mode, UpdateMode::All);
        assert!(request.packages.is_empty());
    }
}
