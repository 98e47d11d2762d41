mod cli;
mod commands;
mod config;
mod progress;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use roster::{ElevationMode, Engine};
use std::io;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    let overrides = config::Overrides {
        catalog: cli.file.clone(),
        manager: cli.manager.map(Into::into),
        ttl_secs: cli.ttl,
        timeout_secs: cli.timeout,
        elevation: elevation_flag(cli.sudo, cli.no_sudo),
    };

    match cli.command {
        Command::Status(args) => {
            let settings = config::Settings::resolve(&overrides)?;
            let engine = Engine::new(&settings.catalog, &settings.options)?;
            commands::status::run(&ctx, &engine, args.refresh, args.json)
        }
        Command::Detect { json } => commands::detect::run(overrides.manager, json),
        Command::Install(args) => {
            let settings = config::Settings::resolve(&overrides)?;
            let engine = Engine::new(&settings.catalog, &settings.options)?;
            commands::install::run(&ctx, &engine, &args.names, args.yes, args.json)
        }
        Command::Update(args) => {
            let settings = config::Settings::resolve(&overrides)?;
            let engine = Engine::new(&settings.catalog, &settings.options)?;
            commands::update::run(&ctx, &engine, &args)
        }
        Command::Catalog(command) => {
            let settings = config::Settings::resolve(&overrides)?;
            commands::catalog::run(&settings.catalog, command)
        }
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "outfit", &mut io::stdout());
            Ok(())
        }
    }
}

fn elevation_flag(sudo: bool, no_sudo: bool) -> Option<ElevationMode> {
    if sudo {
        Some(ElevationMode::Sudo)
    } else if no_sudo {
        Some(ElevationMode::Manual)
    } else {
        None
    }
}
