use anyhow::Result;
use colored::Colorize;
use roster::{Engine, PackageStatus};

use crate::Context;
use crate::ui;

pub fn run(ctx: &Context, engine: &Engine, refresh: bool, json: bool) -> Result<()> {
    let statuses = if refresh {
        engine.refresh()?
    } else {
        engine.status()?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&statuses)?);
        return Ok(());
    }

    ui::header("Desktop Packages");
    let identity = engine.identity();
    match identity.manager {
        Some(kind) => ui::kv("Manager", &format!("{} ({})", kind, identity.os)),
        None => ui::kv("Manager", &"none detected".yellow().to_string()),
    }

    println!();
    if statuses.is_empty() {
        ui::dim("Catalog is empty");
        return Ok(());
    }

    let width = statuses.iter().map(|s| s.name.len()).max().unwrap_or(0);
    for status in &statuses {
        print_row(status, width, ctx.quiet);
    }

    let pending = statuses.iter().filter(|s| s.update_available).count();
    if pending > 0 {
        println!();
        ui::info(&format!(
            "{} can be upgraded, run: outfit update --all",
            ui::plural(pending, "package")
        ));
    }

    Ok(())
}

fn print_row(status: &PackageStatus, width: usize, quiet: bool) {
    let name = format!("{:width$}", status.name);

    if status.declared && !status.enabled {
        println!("  {} {} {}", "#".dimmed(), name.dimmed(), "disabled".dimmed());
        return;
    }

    if !status.installed {
        println!("  {} {} {}", "✗".red(), name, "not installed".dimmed());
        return;
    }

    let version = status.version.as_deref().unwrap_or("installed");
    let mut line = format!("  {} {} {}", "✓".green(), name, version);
    if let Some(new_version) = &status.new_version {
        line.push_str(&format!(" {} {}", "→".cyan(), new_version.cyan()));
    }
    if !status.declared {
        line.push_str(&format!("  {}", "(not in catalog)".yellow()));
    }
    println!("{line}");

    if !quiet && let Some(description) = &status.description {
        ui::dim(&format!("    {description}"));
    }
}
