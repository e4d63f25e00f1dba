//! Which (target family, architecture) pairs may be cross compiled.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use crate::error::ResolveError;
use crate::inventory::{ArchTable, Architecture, Target};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FamilyEntry {
    include: Option<Vec<String>>,
    exclude: Option<Vec<String>>,
}

/// Cross support declared for one OS family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrossSupport {
    /// Only these architectures.
    Only(BTreeSet<Architecture>),
    /// Every known architecture except these.
    AllExcept(BTreeSet<Architecture>),
}

impl CrossSupport {
    pub fn allows(&self, arch: &Architecture) -> bool {
        match self {
            CrossSupport::Only(arches) => arches.contains(arch),
            CrossSupport::AllExcept(arches) => !arches.contains(arch),
        }
    }
}

/// Compatibility matrix keyed by OS family name (`Debian`, `Fedora`, ...).
/// Families without an entry cannot cross compile at all.
#[derive(Debug, Clone, Default)]
pub struct CrossMatrix {
    families: BTreeMap<String, CrossSupport>,
    known: BTreeSet<Architecture>,
}

impl CrossMatrix {
    pub fn load(path: &Path, arches: &ArchTable) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading cross matrix {}", path.display()))?;
        Self::parse(&raw, arches).with_context(|| format!("loading cross matrix {}", path.display()))
    }

    pub fn parse(raw: &str, arches: &ArchTable) -> Result<Self> {
        let entries: Option<BTreeMap<String, FamilyEntry>> =
            serde_yaml::from_str(raw).context("parsing cross matrix")?;

        let mut families = BTreeMap::new();
        for (family, entry) in entries.unwrap_or_default() {
            let support = match (entry.include, entry.exclude) {
                (Some(include), None) => CrossSupport::Only(known_arches(&family, include, arches)?),
                (None, Some(exclude)) => CrossSupport::AllExcept(known_arches(&family, exclude, arches)?),
                (None, None) => CrossSupport::AllExcept(BTreeSet::new()),
                (Some(_), Some(_)) => {
                    return Err(ResolveError::InvalidInventory(format!(
                        "cross support for {family} declares both include and exclude"
                    ))
                    .into());
                }
            };
            families.insert(family, support);
        }

        Ok(Self {
            families,
            known: arches.names().cloned().collect(),
        })
    }

    pub fn supports_cross(&self, family: &str) -> bool {
        self.families.contains_key(family)
    }

    /// Check a (target, cross architecture) pair. Native builds are always
    /// legal.
    pub fn validate(&self, target: &Target, cross_arch: Option<&Architecture>) -> Result<(), ResolveError> {
        let Some(arch) = cross_arch else {
            return Ok(());
        };

        let Some(support) = self.families.get(&target.os_name) else {
            return Err(ResolveError::cross_unsupported(
                &target.id,
                arch.as_str(),
                format!("cannot cross compile on {}", target.os_name),
            ));
        };

        if !self.known.contains(arch) {
            return Err(ResolveError::cross_unsupported(
                &target.id,
                arch.as_str(),
                format!("unknown architecture {arch}"),
            ));
        }

        if !support.allows(arch) {
            return Err(ResolveError::cross_unsupported(
                &target.id,
                arch.as_str(),
                format!("cannot cross compile for {arch} on {}", target.os_name),
            ));
        }

        Ok(())
    }
}

fn known_arches(
    family: &str,
    names: Vec<String>,
    arches: &ArchTable,
) -> Result<BTreeSet<Architecture>, ResolveError> {
    names
        .into_iter()
        .map(|name| {
            arches.lookup(&name).cloned().map_err(|_| {
                ResolveError::InvalidInventory(format!(
                    "cross support for {family} names unknown architecture '{name}'"
                ))
            })
        })
        .collect()
}
