//! Target inventory: the supported OS targets and cross architectures.
//!
//! Facts are read once from the data directory:
//!
//! - `targets/<id>.yml` - one file per target
//! - `arches.yml` - architecture metadata
//!
//! and are read-only afterwards.

mod arch;
mod target;

pub use arch::{ArchInfo, ArchTable, Architecture};
pub use target::{PackagingFormat, Target};

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::ResolveError;
use crate::ui::prelude::*;

#[derive(Debug, Clone, Default)]
pub struct Inventory {
    targets: BTreeMap<String, Target>,
    arches: ArchTable,
}

impl Inventory {
    pub fn load(data_dir: &Path) -> Result<Self> {
        let arches = ArchTable::load(&data_dir.join("arches.yml"))?;

        let targets_dir = data_dir.join("targets");
        let mut entries = fs::read_dir(&targets_dir)
            .with_context(|| format!("reading targets directory {}", targets_dir.display()))?
            .collect::<std::io::Result<Vec<_>>>()
            .with_context(|| format!("listing targets in {}", targets_dir.display()))?;
        entries.sort_by_key(|entry| entry.file_name());

        let mut targets = Vec::new();
        for entry in entries {
            let path = entry.path();
            if !path.is_file() || path.extension().is_none_or(|ext| ext != "yml") {
                continue;
            }
            emit(
                Level::Debug,
                "inventory.target",
                &format!("Loading facts from '{}'", path.display()),
                None,
            );
            targets.push(Target::load(&path)?);
        }

        Ok(Self::from_parts(targets, arches)?)
    }

    pub fn from_parts(targets: Vec<Target>, arches: ArchTable) -> Result<Self, ResolveError> {
        if targets.is_empty() {
            return Err(ResolveError::InvalidInventory("no targets defined".to_string()));
        }
        let mut by_id = BTreeMap::new();
        for target in targets {
            target.validate()?;
            let id = target.id.clone();
            if by_id.insert(id.clone(), target).is_some() {
                return Err(ResolveError::InvalidInventory(format!("duplicate target '{id}'")));
            }
        }
        Ok(Self {
            targets: by_id,
            arches,
        })
    }

    pub fn target(&self, id: &str) -> Result<&Target, ResolveError> {
        self.targets
            .get(id)
            .ok_or_else(|| ResolveError::UnknownTarget(id.to_string()))
    }

    /// All targets, sorted by id.
    pub fn targets(&self) -> impl Iterator<Item = &Target> {
        self.targets.values()
    }

    pub fn target_ids(&self) -> impl Iterator<Item = &str> {
        self.targets.keys().map(String::as_str)
    }

    pub fn arches(&self) -> &ArchTable {
        &self.arches
    }
}
