use anyhow::{Context, Result};
use directories::ProjectDirs;
use facematch_core::Threshold;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

static PROJECT_DIRS: Lazy<Option<ProjectDirs>> =
    Lazy::new(|| ProjectDirs::from("", "", "facematch"));

pub static CONFIG_PATH: Lazy<PathBuf> =
    Lazy::new(|| match option_env!("FACEMATCH_CONFIG_PATH") {
        Some(p) => PathBuf::from(p),
        None => PROJECT_DIRS
            .as_ref()
            .map(|d| d.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("/usr/local/etc/facematch/config.toml")),
    });

pub static CATALOG_PREFIX: Lazy<PathBuf> =
    Lazy::new(|| match option_env!("FACEMATCH_CATALOG_PREFIX") {
        Some(p) => PathBuf::from(p),
        None => PROJECT_DIRS
            .as_ref()
            .map(|d| d.data_dir().join("catalog"))
            .unwrap_or_else(|| PathBuf::from("/usr/local/share/facematch/catalog")),
    });

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Distances at or above this are reported as unknown
    pub threshold: Threshold,
    /// Period of the watch loop in milliseconds
    pub interval_ms: u64,
    pub catalog: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threshold: Threshold::DEFAULT,
            interval_ms: 1000,
            catalog: CATALOG_PREFIX.to_path_buf(),
        }
    }
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.unwrap_or(&CONFIG_PATH);
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config at {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
}

pub fn save_config(cfg: &Config, path: Option<&Path>) -> Result<()> {
    let path = path.unwrap_or(&CONFIG_PATH);
    let data = toml::to_string_pretty(cfg)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, data).with_context(|| format!("writing config {}", path.display()))?;
    Ok(())
}
