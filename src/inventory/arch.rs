//! Cross-compilation architectures and their toolchain metadata.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::ResolveError;

/// A cross-compilation architecture identifier, e.g. `aarch64` or `mingw64`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Architecture(String);

impl Architecture {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Architecture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Toolchain metadata for one architecture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArchInfo {
    /// GNU ABI triplet, e.g. `aarch64-linux-gnu`.
    pub abi: String,
    /// Debian architecture name used for multiarch packages (`arm64`).
    #[serde(default)]
    pub deb_arch: Option<String>,
}

/// All architectures known to the inventory, sorted by name.
#[derive(Debug, Clone, Default)]
pub struct ArchTable {
    arches: BTreeMap<Architecture, ArchInfo>,
}

impl ArchTable {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading architectures from {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("parsing architectures in {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let arches: BTreeMap<Architecture, ArchInfo> =
            serde_yaml::from_str(raw).context("parsing architecture table")?;
        if arches.is_empty() {
            return Err(ResolveError::InvalidInventory("no architectures defined".to_string()).into());
        }
        for (arch, info) in &arches {
            if arch.as_str().is_empty() || arch.as_str().contains(char::is_whitespace) {
                return Err(ResolveError::InvalidInventory(format!(
                    "invalid architecture name '{arch}'"
                ))
                .into());
            }
            if info.abi.trim().is_empty() {
                return Err(ResolveError::InvalidInventory(format!(
                    "architecture '{arch}' has no ABI triplet"
                ))
                .into());
            }
        }
        Ok(Self { arches })
    }

    /// Look up an architecture by name.
    pub fn lookup(&self, name: &str) -> Result<&Architecture, ResolveError> {
        self.arches
            .get_key_value(&Architecture::new(name))
            .map(|(arch, _)| arch)
            .ok_or_else(|| ResolveError::UnknownArchitecture(name.to_string()))
    }

    pub fn info(&self, arch: &Architecture) -> Option<&ArchInfo> {
        self.arches.get(arch)
    }

    pub fn names(&self) -> impl Iterator<Item = &Architecture> {
        self.arches.keys()
    }

    pub fn len(&self) -> usize {
        self.arches.len()
    }
}
