use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::config::Config;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "PKGMAP_DATA_DIR";

/// Get the pkgmap config directory
pub fn pkgmap_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .context("Unable to determine user config directory")?
        .join("pkgmap");
    Ok(config_dir)
}

/// Get the default pkgmap data directory
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| {
            let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"));
            home.join(".local/share")
        })
        .join("pkgmap")
}

/// Pick the data directory: command line, then environment, then config,
/// then the platform default.
pub fn resolve_data_dir(cli: Option<&Path>, env: Option<&str>, config: &Config) -> PathBuf {
    if let Some(dir) = cli {
        return dir.to_path_buf();
    }
    if let Some(dir) = env.filter(|dir| !dir.is_empty()) {
        return PathBuf::from(dir);
    }
    if let Some(dir) = &config.data_dir {
        return dir.clone();
    }
    default_data_dir()
}
