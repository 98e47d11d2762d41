use anyhow::Result;
use roster::Engine;

use super::{ReportWording, confirm, render_report, require_manager};
use crate::Context;
use crate::progress;
use crate::ui;

pub fn run(ctx: &Context, engine: &Engine, names: &[String], yes: bool, json: bool) -> Result<()> {
    require_manager(engine)?;

    if !yes && !json {
        let prompt = format!("Install {}?", names.join(", "));
        if !confirm(&prompt)? {
            ui::warn("Aborted");
            return Ok(());
        }
    }

    let spinner = (!json && !ctx.quiet).then(|| progress::spinner("Installing packages..."));
    let report = engine.install(names);
    if let Some(pb) = spinner {
        progress::finish_clear(&pb);
    }

    render_report(
        &report,
        &ReportWording {
            done: "installed",
            already: "already installed",
        },
        json,
    )
}
