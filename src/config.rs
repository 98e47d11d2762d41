use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use pmkit::platform::ManagerKind;
use roster::{ElevationMode, EngineOptions};

/// Get the config directory path
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("outfit"))
}

/// Catalog location used when neither the flag nor the config file names one
pub fn default_catalog() -> Result<PathBuf> {
    Ok(config_dir()?.join("desktop.conf"))
}

// ============================================================================
// Config File
// ============================================================================

/// Contents of `~/.config/outfit/config.toml`; every field is optional
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FileConfig {
    /// Catalog file path, `~` expands to the home directory
    pub catalog: Option<String>,
    /// Status cache lifetime in seconds
    pub ttl_secs: Option<u64>,
    /// Time budget per manager command in seconds
    pub timeout_secs: Option<u64>,
    /// `sudo` or `manual`
    pub elevation: Option<ElevationMode>,
}

impl FileConfig {
    /// Load config.toml, falling back to defaults when the file is absent
    pub fn load() -> Result<Self> {
        Self::load_from(&config_dir()?.join("config.toml"))
    }

    fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Invalid config format in {}", path.display()))
    }
}

// ============================================================================
// Effective Settings
// ============================================================================

/// Command-line values that outrank the config file
#[derive(Debug, Default)]
pub struct Overrides {
    pub catalog: Option<PathBuf>,
    pub manager: Option<ManagerKind>,
    pub ttl_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub elevation: Option<ElevationMode>,
}

/// Resolved settings: flags over config file over built-ins
#[derive(Debug)]
pub struct Settings {
    pub catalog: PathBuf,
    pub options: EngineOptions,
}

impl Settings {
    /// Resolve against the on-disk config file
    pub fn resolve(overrides: &Overrides) -> Result<Self> {
        let file = FileConfig::load()?;
        Self::merge(overrides, &file)
    }

    fn merge(overrides: &Overrides, file: &FileConfig) -> Result<Self> {
        let catalog = match (&overrides.catalog, &file.catalog) {
            (Some(path), _) => path.clone(),
            (None, Some(configured)) => {
                PathBuf::from(shellexpand::tilde(configured).as_ref())
            }
            (None, None) => default_catalog()?,
        };

        let defaults = EngineOptions::default();
        let options = EngineOptions {
            ttl: overrides
                .ttl_secs
                .or(file.ttl_secs)
                .map_or(defaults.ttl, Duration::from_secs),
            timeout: overrides
                .timeout_secs
                .or(file.timeout_secs)
                .map_or(defaults.timeout, Duration::from_secs),
            elevation: overrides
                .elevation
                .or(file.elevation)
                .unwrap_or(defaults.elevation),
            manager: overrides.manager,
        };

        Ok(Self { catalog, options })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn test_missing_config_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = FileConfig::load_from(&dir.path().join("config.toml")).unwrap();
        assert!(config.catalog.is_none());
        assert!(config.ttl_secs.is_none());
        assert!(config.elevation.is_none());
    }

    #[test]
    fn test_config_file_parses_all_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "catalog = \"~/packages.conf\"").unwrap();
        writeln!(file, "ttl_secs = 120").unwrap();
        writeln!(file, "timeout_secs = 300").unwrap();
        writeln!(file, "elevation = \"manual\"").unwrap();

        let config = FileConfig::load_from(&path).unwrap();
        assert_eq!(config.catalog.as_deref(), Some("~/packages.conf"));
        assert_eq!(config.ttl_secs, Some(120));
        assert_eq!(config.timeout_secs, Some(300));
        assert_eq!(config.elevation, Some(ElevationMode::Manual));
    }

    #[test]
    fn test_invalid_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "ttl_secs = \"soon\"").unwrap();
        assert!(FileConfig::load_from(&path).is_err());
    }

    #[test]
    fn test_flags_outrank_the_config_file() {
        let file = FileConfig {
            catalog: Some("/etc/outfit/site.conf".to_string()),
            ttl_secs: Some(120),
            timeout_secs: Some(300),
            elevation: Some(ElevationMode::Sudo),
        };
        let overrides = Overrides {
            catalog: Some(PathBuf::from("/tmp/mine.conf")),
            ttl_secs: Some(5),
            elevation: Some(ElevationMode::Manual),
            ..Default::default()
        };

        let settings = Settings::merge(&overrides, &file).unwrap();
        assert_eq!(settings.catalog, PathBuf::from("/tmp/mine.conf"));
        assert_eq!(settings.options.ttl, Duration::from_secs(5));
        assert_eq!(settings.options.timeout, Duration::from_secs(300));
        assert_eq!(settings.options.elevation, ElevationMode::Manual);
    }

    #[test]
    fn test_config_file_outranks_builtins() {
        let file = FileConfig {
            catalog: Some("/etc/outfit/site.conf".to_string()),
            ttl_secs: Some(120),
            timeout_secs: None,
            elevation: None,
        };

        let settings = Settings::merge(&Overrides::default(), &file).unwrap();
        assert_eq!(settings.catalog, PathBuf::from("/etc/outfit/site.conf"));
        assert_eq!(settings.options.ttl, Duration::from_secs(120));
        assert_eq!(settings.options.timeout, EngineOptions::default().timeout);
        assert_eq!(settings.options.elevation, ElevationMode::Sudo);
    }
}
