use anyhow::Result;
use colored::Colorize;
use roster::PackageDecl;
use roster::catalog::{self, WriteOptions};
use std::path::Path;

use crate::cli::CatalogCommand;
use crate::ui;

pub fn run(path: &Path, command: CatalogCommand) -> Result<()> {
    match command {
        CatalogCommand::List { json } => list(path, json),
        CatalogCommand::Add {
            name,
            description,
            disabled,
        } => add(path, &name, description.as_deref(), disabled),
        CatalogCommand::Remove { name } => remove(path, &name),
        CatalogCommand::Enable { name } => set_enabled(path, &name, true),
        CatalogCommand::Disable { name } => set_enabled(path, &name, false),
    }
}

fn list(path: &Path, json: bool) -> Result<()> {
    let declarations = catalog::parse_file(path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&declarations)?);
        return Ok(());
    }

    ui::header("Catalog");
    ui::kv("File", &path.display().to_string());
    println!();

    if declarations.is_empty() {
        ui::dim("No declarations");
        return Ok(());
    }

    for decl in &declarations {
        let mut line = if decl.enabled {
            format!("  {}", decl.name)
        } else {
            format!("  {} {}", "#".dimmed(), decl.name.dimmed())
        };
        if let Some(description) = &decl.description {
            line.push_str(&format!("  {}", description.dimmed()));
        }
        println!("{line}");
    }

    Ok(())
}

fn add(path: &Path, name: &str, description: Option<&str>, disabled: bool) -> Result<()> {
    let mut declarations = load_or_empty(path)?;

    if declarations
        .iter()
        .any(|decl| decl.name.eq_ignore_ascii_case(name))
    {
        anyhow::bail!("{} is already in the catalog", name);
    }

    let mut decl = PackageDecl::new(name);
    if let Some(description) = description {
        decl = decl.with_description(description);
    }
    if disabled {
        decl = decl.disabled();
    }
    declarations.push(decl);

    catalog::write_file(&declarations, path, &WriteOptions::default())?;
    ui::success(&format!("Added {} to {}", name, path.display()));
    Ok(())
}

fn remove(path: &Path, name: &str) -> Result<()> {
    let mut declarations = catalog::parse_file(path)?;

    let before = declarations.len();
    declarations.retain(|decl| !decl.name.eq_ignore_ascii_case(name));
    if declarations.len() == before {
        anyhow::bail!("{} is not in the catalog", name);
    }

    catalog::write_file(&declarations, path, &WriteOptions::default())?;
    ui::success(&format!("Removed {name}"));
    Ok(())
}

fn set_enabled(path: &Path, name: &str, enabled: bool) -> Result<()> {
    let mut declarations = catalog::parse_file(path)?;

    let Some(decl) = declarations
        .iter_mut()
        .find(|decl| decl.name.eq_ignore_ascii_case(name))
    else {
        anyhow::bail!("{} is not in the catalog", name);
    };

    let state = if enabled { "enabled" } else { "disabled" };
    if decl.enabled == enabled {
        ui::dim(&format!("{name} is already {state}"));
        return Ok(());
    }
    decl.enabled = enabled;

    catalog::write_file(&declarations, path, &WriteOptions::default())?;
    ui::success(&format!("{name} {state}"));
    Ok(())
}

/// A catalog that does not exist yet is an empty one, for `add`
fn load_or_empty(path: &Path) -> Result<Vec<PackageDecl>> {
    match catalog::parse_file(path) {
        Ok(declarations) => Ok(declarations),
        Err(roster::Error::CatalogNotFound(_)) => Ok(Vec::new()),
        Err(err) => Err(err.into()),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn catalog_path(dir: &tempfile::TempDir) -> std::path::PathBuf {
        dir.path().join("desktop.conf")
    }

    #[test]
    fn test_add_creates_the_catalog_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = catalog_path(&dir);

        add(&path, "firefox", Some("Browser"), false).unwrap();

        let declarations = catalog::parse_file(&path).unwrap();
        assert_eq!(declarations.len(), 1);
        assert_eq!(declarations[0].name, "firefox");
        assert_eq!(declarations[0].description.as_deref(), Some("Browser"));
        assert!(declarations[0].enabled);
    }

    #[test]
    fn test_add_disabled_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = catalog_path(&dir);

        add(&path, "blender", Some("3D tool"), true).unwrap();

        let declarations = catalog::parse_file(&path).unwrap();
        assert!(!declarations[0].enabled);
        assert_eq!(declarations[0].description.as_deref(), Some("3D tool"));
    }

    #[test]
    fn test_add_rejects_duplicate_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = catalog_path(&dir);

        add(&path, "firefox", None, false).unwrap();
        assert!(add(&path, "Firefox", None, false).is_err());

        let declarations = catalog::parse_file(&path).unwrap();
        assert_eq!(declarations.len(), 1);
    }

    #[test]
    fn test_remove_unknown_name_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = catalog_path(&dir);

        add(&path, "firefox", None, false).unwrap();
        assert!(remove(&path, "gimp").is_err());
        assert!(remove(&path, "FIREFOX").is_ok());
        assert!(catalog::parse_file(&path).unwrap().is_empty());
    }

    #[test]
    fn test_disable_then_enable_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = catalog_path(&dir);

        add(&path, "gimp", Some("Image editor"), false).unwrap();

        set_enabled(&path, "gimp", false).unwrap();
        let declarations = catalog::parse_file(&path).unwrap();
        assert!(!declarations[0].enabled);
        assert_eq!(declarations[0].description.as_deref(), Some("Image editor"));

        set_enabled(&path, "gimp", true).unwrap();
        let declarations = catalog::parse_file(&path).unwrap();
        assert!(declarations[0].enabled);
    }

    #[test]
    fn test_enable_when_already_enabled_keeps_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = catalog_path(&dir);

        add(&path, "firefox", None, false).unwrap();
        let before = fs::read_to_string(&path).unwrap();

        set_enabled(&path, "firefox", true).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
    }
}
