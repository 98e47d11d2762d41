pub mod catalog;
pub mod detect;
pub mod install;
pub mod status;
pub mod update;

use anyhow::Result;
use roster::{BatchReport, Engine, ItemOutcome};

use crate::ui;

/// Wording for batch report lines, per operation
pub(crate) struct ReportWording {
    pub done: &'static str,
    pub already: &'static str,
}

/// Mutating commands need a manager to talk to
pub(crate) fn require_manager(engine: &Engine) -> Result<()> {
    if engine.identity().manager.is_none() {
        anyhow::bail!("no supported package manager detected (override with --manager)");
    }
    Ok(())
}

/// Confirm with user
pub(crate) fn confirm(prompt: &str) -> Result<bool> {
    use dialoguer::Confirm;

    let confirmed = Confirm::new()
        .with_prompt(prompt)
        .default(true)
        .interact()?;

    Ok(confirmed)
}

/// Print per-item outcomes and turn a partly-failed batch into exit code 1
pub(crate) fn render_report(
    report: &BatchReport,
    wording: &ReportWording,
    json: bool,
) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        for item in &report.items {
            match &item.outcome {
                ItemOutcome::Succeeded => {
                    ui::success(&format!("{} {}", item.name, wording.done));
                }
                ItemOutcome::AlreadySatisfied => {
                    ui::dim(&format!("{} {}", item.name, wording.already));
                }
                ItemOutcome::Failed { failure } => {
                    ui::error(&format!("{}: {}", item.name, failure));
                }
            }
        }
    }

    let failed = report.failed();
    if failed > 0 {
        anyhow::bail!("{} of {} failed", failed, ui::plural(report.len(), "package"));
    }
    Ok(())
}
