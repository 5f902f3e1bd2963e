//! Configuration loading from TOML files.
//!
//! Lookup order:
//! 1. `--config <path>` on the command line
//! 2. `$SILO_CONFIG` environment variable
//! 3. `<platform config dir>/silo/config.toml`
//! 4. Built-in defaults (everything is optional)

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use silo_store::{FsStoreOptions, MAX_BACKUPS};

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub backup: BackupConfig,
    pub lock: LockConfig,
}

/// Where records live.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Data directory. Relative paths resolve against the working directory.
    pub data_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    /// Snapshots kept per person. 0 disables backups.
    pub max_backups: usize,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    pub enabled: bool,
}

// --- Defaults ---

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            max_backups: MAX_BACKUPS,
        }
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Config {
    pub fn store_options(&self) -> FsStoreOptions {
        FsStoreOptions {
            max_backups: self.backup.max_backups,
            lock: self.lock.enabled,
        }
    }
}

/// Load config from disk. Returns defaults if no config file exists, except
/// that an explicitly requested file must exist.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    if let Some(p) = explicit {
        if !p.exists() {
            bail!("config file not found: {}", p.display());
        }
    }

    if let Some(p) = config_path(explicit) {
        if p.exists() {
            return parse_file(&p);
        }
    }

    Ok(Config::default())
}

fn parse_file(path: &Path) -> Result<Config> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let config: Config =
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}

/// Resolve the config file path.
fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = explicit {
        return Some(p.to_path_buf());
    }

    if let Ok(p) = std::env::var("SILO_CONFIG") {
        return Some(PathBuf::from(p));
    }

    directories::ProjectDirs::from("dev", "silo", "silo")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Describe the active config path (for `silo --show-config`).
pub fn show_config_path(explicit: Option<&Path>) -> String {
    match config_path(explicit) {
        Some(p) if p.exists() => format!("{} (loaded)", p.display()),
        Some(p) => format!("{} (not found, using defaults)", p.display()),
        None => "no config path resolved (using defaults)".into(),
    }
}
