//! Mapping table: generic package name -> specificity key -> package name.
//!
//! The table is loaded from `mappings.yml`, which holds three sections:
//!
//! - `mappings` - system packages (native and cross)
//! - `pypi_mappings` - packages installed from PyPI
//! - `cpan_mappings` - packages installed from CPAN
//!
//! Every key is parsed against the [`KeyUniverse`] at load time; unknown
//! keys and keys out of canonical order are rejected. An empty YAML value
//! marks the package as intentionally absent at that level.

pub mod keys;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use crate::error::ResolveError;
use crate::ui::prelude::*;
pub use keys::{KeyUniverse, Scope, SpecificityKey, Stratum};

/// How a package behaves when cross compiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrossPolicy {
    /// Install the build-host package.
    Native,
    /// Install the package built for the foreign architecture.
    Foreign,
    /// The package is not installed when cross compiling.
    Skip,
}

impl CrossPolicy {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "native" => Some(Self::Native),
            "foreign" => Some(Self::Foreign),
            "skip" => Some(Self::Skip),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::Foreign => "foreign",
            Self::Skip => "skip",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionValue {
    Name(String),
    Absent,
    Policy(CrossPolicy),
}

/// The keyed entries of one generic package.
#[derive(Debug, Clone, Default)]
pub struct MappingRecord {
    values: HashMap<SpecificityKey, ResolutionValue>,
    order: Vec<SpecificityKey>,
}

impl MappingRecord {
    /// Entries in canonical order.
    pub fn entries(&self) -> impl Iterator<Item = (&SpecificityKey, &ResolutionValue)> {
        self.order.iter().filter_map(|key| self.values.get(key).map(|value| (key, value)))
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// First key present in `keys`, with its value.
    pub fn first_match(
        &self,
        keys: impl IntoIterator<Item = SpecificityKey>,
    ) -> Option<(SpecificityKey, &ResolutionValue)> {
        keys.into_iter()
            .find_map(|key| self.values.get(&key).map(|value| (key, value)))
    }
}

/// Which section of the mapping source a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MappingKind {
    System,
    Pypi,
    Cpan,
}

impl MappingKind {
    fn section(&self) -> &'static str {
        match self {
            Self::System => "mappings",
            Self::Pypi => "pypi_mappings",
            Self::Cpan => "cpan_mappings",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MappingsFile {
    #[serde(default)]
    mappings: BTreeMap<String, serde_yaml::Mapping>,
    #[serde(default)]
    pypi_mappings: BTreeMap<String, serde_yaml::Mapping>,
    #[serde(default)]
    cpan_mappings: BTreeMap<String, serde_yaml::Mapping>,
}

#[derive(Debug, Clone, Default)]
pub struct MappingTable {
    system: BTreeMap<String, MappingRecord>,
    pypi: BTreeMap<String, MappingRecord>,
    cpan: BTreeMap<String, MappingRecord>,
}

impl MappingTable {
    pub fn load(path: &Path, universe: &KeyUniverse) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading mappings {}", path.display()))?;
        let table = Self::parse(&raw, universe)
            .with_context(|| format!("loading mappings {}", path.display()))?;
        emit(
            Level::Debug,
            "mappings.loaded",
            &format!(
                "Loaded {} system, {} PyPI and {} CPAN mappings from '{}'",
                table.system.len(),
                table.pypi.len(),
                table.cpan.len(),
                path.display()
            ),
            None,
        );
        Ok(table)
    }

    pub fn parse(raw: &str, universe: &KeyUniverse) -> Result<Self> {
        let file: MappingsFile = serde_yaml::from_str(raw).context("parsing mapping data")?;
        Ok(Self {
            system: parse_section(file.mappings, MappingKind::System, universe)?,
            pypi: parse_section(file.pypi_mappings, MappingKind::Pypi, universe)?,
            cpan: parse_section(file.cpan_mappings, MappingKind::Cpan, universe)?,
        })
    }

    pub fn record(&self, kind: MappingKind, package: &str) -> Option<&MappingRecord> {
        match kind {
            MappingKind::System => self.system.get(package),
            MappingKind::Pypi => self.pypi.get(package),
            MappingKind::Cpan => self.cpan.get(package),
        }
    }

    pub fn contains(&self, package: &str) -> bool {
        self.system.contains_key(package)
            || self.pypi.contains_key(package)
            || self.cpan.contains_key(package)
    }

    /// Records of one section, sorted by package name.
    pub fn records(&self, kind: MappingKind) -> impl Iterator<Item = (&str, &MappingRecord)> {
        let section = match kind {
            MappingKind::System => &self.system,
            MappingKind::Pypi => &self.pypi,
            MappingKind::Cpan => &self.cpan,
        };
        section.iter().map(|(name, record)| (name.as_str(), record))
    }

    /// Every generic package name across all sections, sorted.
    pub fn package_names(&self) -> BTreeSet<&str> {
        self.system
            .keys()
            .chain(self.pypi.keys())
            .chain(self.cpan.keys())
            .map(String::as_str)
            .collect()
    }
}

fn parse_section(
    raw: BTreeMap<String, serde_yaml::Mapping>,
    kind: MappingKind,
    universe: &KeyUniverse,
) -> Result<BTreeMap<String, MappingRecord>, ResolveError> {
    raw.into_iter()
        .map(|(package, entries)| {
            let record = parse_record(&package, &entries, kind, universe)?;
            Ok((package, record))
        })
        .collect()
}

fn parse_record(
    package: &str,
    entries: &serde_yaml::Mapping,
    kind: MappingKind,
    universe: &KeyUniverse,
) -> Result<MappingRecord, ResolveError> {
    let mut raw_keys = Vec::with_capacity(entries.len());
    for key in entries.keys() {
        let key = key.as_str().ok_or_else(|| ResolveError::UnknownMappingKey {
            package: package.to_string(),
            key: format!("{key:?}"),
        })?;
        raw_keys.push(key);
    }

    let keys = universe.parse_record_keys(package, &raw_keys)?;
    let mut record = MappingRecord::default();
    for (key, value) in keys.into_iter().zip(entries.values()) {
        let value = parse_value(package, &key, value, kind)?;
        record.values.insert(key.clone(), value);
        record.order.push(key);
    }
    Ok(record)
}

fn parse_value(
    package: &str,
    key: &SpecificityKey,
    value: &serde_yaml::Value,
    kind: MappingKind,
) -> Result<ResolutionValue, ResolveError> {
    let invalid = |reason: &str| ResolveError::InvalidMappingValue {
        package: package.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    };

    // PyPI and CPAN packages are architecture independent
    if kind != MappingKind::System && key.stratum() != Stratum::Base {
        return Err(invalid(&format!(
            "{} entries only accept default, format and OS keys",
            kind.section()
        )));
    }

    match (key.stratum(), value) {
        (Stratum::CrossPolicy, serde_yaml::Value::String(s)) => CrossPolicy::parse(s)
            .map(ResolutionValue::Policy)
            .ok_or_else(|| ResolveError::InvalidCrossPolicy {
                package: package.to_string(),
                value: s.clone(),
            }),
        (Stratum::CrossPolicy, other) => Err(ResolveError::InvalidCrossPolicy {
            package: package.to_string(),
            value: format!("{other:?}"),
        }),
        (_, serde_yaml::Value::Null) => Ok(ResolutionValue::Absent),
        (_, serde_yaml::Value::String(s)) if s.trim().is_empty() => Err(invalid("empty package name")),
        (_, serde_yaml::Value::String(s)) => Ok(ResolutionValue::Name(s.clone())),
        (_, _) => Err(invalid("expected a package name or an empty value")),
    }
}
