use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use pmkit::platform::ManagerKind;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "outfit")]
#[command(version)]
#[command(about = "Declarative desktop packages on top of the native package manager", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Catalog file to use instead of the configured one
    #[arg(short, long, global = true, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Force a package manager instead of detecting one
    #[arg(long, global = true, value_enum, value_name = "MANAGER")]
    pub manager: Option<ManagerArg>,

    /// Time budget per manager command, in seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Status cache lifetime, in seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub ttl: Option<u64>,

    /// Run privileged commands through sudo
    #[arg(long, global = true, overrides_with = "no_sudo")]
    pub sudo: bool,

    /// Refuse privileged commands and report them instead
    #[arg(long, global = true, overrides_with = "sudo")]
    pub no_sudo: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show catalog packages reconciled with installed state
    Status(StatusArgs),

    /// Show the detected OS and package manager
    Detect {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Install packages declared in the catalog
    Install(InstallArgs),

    /// Upgrade packages with pending updates
    Update(UpdateArgs),

    /// Maintain the catalog file
    #[command(subcommand)]
    Catalog(CatalogCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Manager names accepted on the command line
#[derive(Clone, Copy, ValueEnum)]
pub enum ManagerArg {
    Brew,
    Apt,
    Dnf,
    Yum,
    Flatpak,
    Winget,
}

impl From<ManagerArg> for ManagerKind {
    fn from(arg: ManagerArg) -> Self {
        match arg {
            ManagerArg::Brew => ManagerKind::Brew,
            ManagerArg::Apt => ManagerKind::Apt,
            ManagerArg::Dnf => ManagerKind::Dnf,
            ManagerArg::Yum => ManagerKind::Yum,
            ManagerArg::Flatpak => ManagerKind::Flatpak,
            ManagerArg::Winget => ManagerKind::Winget,
        }
    }
}

// ============================================================================
// Status
// ============================================================================

#[derive(Parser)]
pub struct StatusArgs {
    /// Recompute instead of serving the cached view
    #[arg(short, long)]
    pub refresh: bool,

    /// Emit JSON instead of text
    #[arg(long)]
    pub json: bool,
}

// ============================================================================
// Install
// ============================================================================

#[derive(Parser)]
pub struct InstallArgs {
    /// Package names from the catalog
    #[arg(required = true)]
    pub names: Vec<String>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Emit JSON instead of text
    #[arg(long)]
    pub json: bool,
}

// ============================================================================
// Update
// ============================================================================

#[derive(Parser)]
pub struct UpdateArgs {
    /// Package names to upgrade
    pub names: Vec<String>,

    /// Upgrade everything with a pending update
    #[arg(short, long, conflicts_with = "names")]
    pub all: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Emit JSON instead of text
    #[arg(long)]
    pub json: bool,
}

// ============================================================================
// Catalog Commands
// ============================================================================

#[derive(Subcommand)]
pub enum CatalogCommand {
    /// List the declarations in the catalog
    List {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Add a package to the catalog
    Add {
        /// Package name
        name: String,

        /// Description to keep alongside the name
        #[arg(short, long)]
        description: Option<String>,

        /// Add in disabled state
        #[arg(long)]
        disabled: bool,
    },

    /// Remove a package from the catalog
    Remove {
        /// Package name
        name: String,
    },

    /// Enable a disabled declaration
    Enable {
        /// Package name
        name: String,
    },

    /// Disable a declaration without removing it
    Disable {
        /// Package name
        name: String,
    },
}
