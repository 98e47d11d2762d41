//! Operation executor: sequential install and update batches.
//!
//! Items are independent. One failing package never aborts the rest of a
//! batch, and every mutating batch invalidates the status cache exactly
//! once, whatever the per-item outcomes were.

use pmkit::backend::Backend;
use pmkit::types::Failure;

use crate::cache::StatusCache;
use crate::types::{BatchReport, ItemOutcome, PackageDecl, UpdateMode, UpdateRequest};

enum Operation {
    Install,
    Upgrade,
}

/// Install every name in order, one adapter call per declared name.
pub(crate) fn install_batch(
    names: &[String],
    declarations: &[PackageDecl],
    backend: Option<&dyn Backend>,
    cache: &StatusCache,
) -> BatchReport {
    let mut report = BatchReport::default();
    for name in names {
        report.push(
            name.clone(),
            mutate_declared(name, declarations, backend, &Operation::Install),
        );
    }
    cache.invalidate();
    report
}

/// Upgrade the requested selection.
///
/// `UpdateMode::None` is a complete no-op: empty report, no adapter calls,
/// cache left untouched.
pub(crate) fn update_batch(
    request: &UpdateRequest,
    declarations: &[PackageDecl],
    backend: Option<&dyn Backend>,
    cache: &StatusCache,
) -> BatchReport {
    let mut report = BatchReport::default();

    match request.mode {
        UpdateMode::None => {
            log::debug!("update requested with mode none, nothing to do");
            return report;
        }
        UpdateMode::All => {
            // Targets come from the reconciled view, so adopted rows with a
            // pending version are upgraded too.
            let statuses = cache.read(declarations, backend);
            for status in statuses.into_iter().filter(|status| status.update_available) {
                report.push(status.name.clone(), mutate(&status.name, backend, &Operation::Upgrade));
            }
        }
        UpdateMode::Selected => {
            for name in &request.packages {
                report.push(
                    name.clone(),
                    mutate_declared(name, declarations, backend, &Operation::Upgrade),
                );
            }
        }
    }

    cache.invalidate();
    report
}

/// Names supplied by the caller must be declared before they reach the
/// adapter.
fn mutate_declared(
    name: &str,
    declarations: &[PackageDecl],
    backend: Option<&dyn Backend>,
    operation: &Operation,
) -> ItemOutcome {
    let declared = declarations
        .iter()
        .any(|decl| decl.name.eq_ignore_ascii_case(name));
    if !declared {
        log::warn!("'{name}' is not declared in the catalog");
        return ItemOutcome::Failed {
            failure: Failure::UnknownPackage,
        };
    }
    mutate(name, backend, operation)
}

fn mutate(name: &str, backend: Option<&dyn Backend>, operation: &Operation) -> ItemOutcome {
    let Some(backend) = backend else {
        return ItemOutcome::Failed {
            failure: Failure::NoPackageManager,
        };
    };
    match operation {
        Operation::Install => backend.install(name).into(),
        Operation::Upgrade => backend.upgrade(name).into(),
    }
}
