use anyhow::Result;
use roster::{BatchReport, Engine, UpdateMode, UpdateRequest};

use super::{ReportWording, confirm, render_report, require_manager};
use crate::Context;
use crate::cli::UpdateArgs;
use crate::progress;
use crate::ui;

pub fn run(ctx: &Context, engine: &Engine, args: &UpdateArgs) -> Result<()> {
    let request = if args.all {
        UpdateRequest::all()
    } else if args.names.is_empty() {
        UpdateRequest::none()
    } else {
        UpdateRequest::selected(args.names.clone())
    };

    if request.mode == UpdateMode::None {
        if args.json {
            println!("{}", serde_json::to_string_pretty(&BatchReport::default())?);
        } else {
            ui::info("Nothing requested. Pass package names or --all.");
        }
        return Ok(());
    }

    require_manager(engine)?;

    if args.all && ctx.verbose > 0 && !args.json {
        let pending: Vec<String> = engine
            .status()?
            .into_iter()
            .filter(|status| status.update_available)
            .map(|status| status.name)
            .collect();
        if !pending.is_empty() {
            ui::info(&format!("Pending updates: {}", pending.join(", ")));
        }
    }

    if !args.yes && !args.json {
        let prompt = if args.all {
            "Upgrade every package with a pending update?".to_string()
        } else {
            format!("Upgrade {}?", args.names.join(", "))
        };
        if !confirm(&prompt)? {
            ui::warn("Aborted");
            return Ok(());
        }
    }

    let spinner = (!args.json && !ctx.quiet).then(|| progress::spinner("Upgrading packages..."));
    let report = engine.update(&request);
    if let Some(pb) = spinner {
        progress::finish_clear(&pb);
    }

    if report.is_empty() {
        if args.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            ui::success("Everything is up to date");
        }
        return Ok(());
    }

    render_report(
        &report,
        &ReportWording {
            done: "upgraded",
            already: "already latest",
        },
        args.json,
    )
}
