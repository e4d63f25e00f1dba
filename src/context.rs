//! Everything loaded from the data directory, loaded once.

use anyhow::{Context as _, Result, anyhow};
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use crate::error::ResolveError;
use crate::inventory::{Architecture, Inventory, Target};
use crate::mappings::{KeyUniverse, MappingKind, MappingTable};
use crate::project::Projects;
use crate::resolve::{CrossMatrix, Resolver};
use crate::ui::prelude::*;

#[derive(Debug, Clone)]
pub struct Context {
    pub inventory: Inventory,
    pub universe: KeyUniverse,
    pub mappings: MappingTable,
    pub cross: CrossMatrix,
    pub projects: Projects,
    pub native_arch: Option<Architecture>,
}

impl Context {
    /// Load inventory, mappings, cross matrix and projects from `data_dir`.
    /// The mapping keys are generated from the inventory before the
    /// mappings are parsed against them.
    pub fn load(data_dir: &Path, native_arch: Option<&str>) -> Result<Self> {
        let inventory = Inventory::load(data_dir)
            .with_context(|| format!("loading inventory from {}", data_dir.display()))?;
        let universe = KeyUniverse::generate(inventory.targets(), inventory.arches().names())?;
        let mappings = MappingTable::load(&data_dir.join("mappings.yml"), &universe)?;
        let cross = CrossMatrix::load(&data_dir.join("cross.yml"), inventory.arches())?;
        let projects = Projects::load(&data_dir.join("projects"))?;
        let native_arch = native_arch
            .map(|name| inventory.arches().lookup(name).cloned())
            .transpose()?;

        emit(
            Level::Debug,
            "context.loaded",
            &format!(
                "Loaded {} targets, {} mapping keys and {} projects from '{}'",
                inventory.target_ids().count(),
                universe.len(),
                projects.names().count(),
                data_dir.display()
            ),
            None,
        );

        Ok(Self {
            inventory,
            universe,
            mappings,
            cross,
            projects,
            native_arch,
        })
    }

    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(
            &self.mappings,
            &self.cross,
            self.inventory.arches(),
            self.native_arch.as_ref(),
        )
    }

    pub fn target(&self, id: &str) -> Result<&Target, ResolveError> {
        self.inventory.target(id)
    }

    pub fn arch(&self, name: &str) -> Result<&Architecture, ResolveError> {
        self.inventory.arches().lookup(name)
    }

    /// Re-check stored mapping keys against the key universe, then the
    /// project catalogue.
    pub fn check(&self) -> Result<(), ResolveError> {
        for kind in [MappingKind::System, MappingKind::Pypi, MappingKind::Cpan] {
            for (package, record) in self.mappings.records(kind) {
                let keys: Vec<String> = record.entries().map(|(key, _)| key.to_string()).collect();
                let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
                self.universe.check_order(package, &keys)?;
            }
        }
        self.projects.validate(&self.mappings)
    }
}

/// One-time holder for the process-wide [`Context`].
///
/// Concurrent first calls to [`ContextCell::get_or_load`] run the loader
/// exactly once; a failed load leaves the cell empty.
pub struct ContextCell {
    cell: OnceLock<Context>,
    init: Mutex<()>,
}

impl ContextCell {
    pub const fn new() -> Self {
        Self {
            cell: OnceLock::new(),
            init: Mutex::new(()),
        }
    }

    #[cfg(test)]
    pub fn get(&self) -> Option<&Context> {
        self.cell.get()
    }

    pub fn get_or_load(&self, load: impl FnOnce() -> Result<Context>) -> Result<&Context> {
        if let Some(ctx) = self.cell.get() {
            return Ok(ctx);
        }
        let _guard = self
            .init
            .lock()
            .map_err(|_| anyhow!("context initialisation lock poisoned"))?;
        if let Some(ctx) = self.cell.get() {
            return Ok(ctx);
        }
        let ctx = load()?;
        Ok(self.cell.get_or_init(|| ctx))
    }
}

impl Default for ContextCell {
    fn default() -> Self {
        Self::new()
    }
}
