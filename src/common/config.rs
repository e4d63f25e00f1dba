use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::paths;

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory holding targets, mappings and projects.
    pub data_dir: Option<PathBuf>,
    /// Build-host architecture; enables `<arch>-*` keys for native builds.
    pub native_arch: Option<String>,
}

fn config_file_path() -> Result<PathBuf> {
    Ok(paths::pkgmap_config_dir()?.join("pkgmap.toml"))
}

impl Config {
    /// Load the user config. A missing file yields the default config.
    pub fn load() -> Result<Config> {
        Self::load_from(&config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Config> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let s = fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
        let c: Config = toml::from_str(&s).with_context(|| format!("parsing config toml {}", path.display()))?;
        Ok(c)
    }
}
