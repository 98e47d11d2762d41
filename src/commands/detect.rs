use anyhow::Result;
use colored::Colorize;
use pmkit::platform::{HostIdentity, ManagerKind, detect_os};

use crate::ui;

pub fn run(manager: Option<ManagerKind>, json: bool) -> Result<()> {
    let identity = match manager {
        Some(kind) => HostIdentity::with_manager(detect_os(), kind),
        None => HostIdentity::detect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&identity)?);
        return Ok(());
    }

    ui::header("Platform");
    ui::kv("OS", &identity.os.to_string());
    match identity.manager {
        Some(kind) => ui::kv("Package manager", &kind.to_string()),
        None => ui::kv("Package manager", &"none detected".yellow().to_string()),
    }

    Ok(())
}
