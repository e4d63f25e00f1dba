//! Resolve a generic package name for one target.
//!
//! The resolver walks the keys that apply to a target, most specific
//! first, and the first key present in the package's record wins. Cross
//! builds consult the package's cross policy before anything else.

pub mod cross;

use crate::error::ResolveError;
use crate::inventory::{ArchTable, Architecture, PackagingFormat, Target};
use crate::mappings::keys::most_specific_first;
use crate::mappings::{
    CrossPolicy, MappingKind, MappingRecord, MappingTable, ResolutionValue, Scope, SpecificityKey,
    Stratum,
};
use crate::package::{Hit, PackageRecord, WalkKind, classify};
use crate::ui::prelude::*;

pub use cross::CrossMatrix;

/// Why a package resolved to nothing. Not an error: callers drop gaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gap {
    /// No key applies to this target.
    NoMapping,
    /// The most specific applicable key marks the package as absent.
    Absent,
    /// The package's cross policy is `skip`.
    CrossSkipped,
}

impl Gap {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gap::NoMapping => "no mapping",
            Gap::Absent => "absent",
            Gap::CrossSkipped => "skipped when cross compiling",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Package(PackageRecord),
    Gap(Gap),
}

#[cfg(test)]
impl Resolution {
    pub fn package(&self) -> Option<&PackageRecord> {
        match self {
            Resolution::Package(record) => Some(record),
            Resolution::Gap(_) => None,
        }
    }
}

/// Result of walking one table.
enum Outcome {
    Found(Hit),
    Absent,
    NoMapping,
    Skipped,
}

/// Borrowed view over the loaded data needed to resolve packages.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    mappings: &'a MappingTable,
    cross: &'a CrossMatrix,
    arches: &'a ArchTable,
    native_arch: Option<&'a Architecture>,
}

impl<'a> Resolver<'a> {
    pub fn new(
        mappings: &'a MappingTable,
        cross: &'a CrossMatrix,
        arches: &'a ArchTable,
        native_arch: Option<&'a Architecture>,
    ) -> Self {
        Self {
            mappings,
            cross,
            arches,
            native_arch,
        }
    }

    /// Validate a cross architecture for a target without resolving
    /// anything.
    pub fn check_cross(&self, target: &Target, cross_arch: Option<&Architecture>) -> Result<(), ResolveError> {
        self.cross.validate(target, cross_arch)
    }

    pub fn resolve(
        &self,
        generic: &str,
        target: &Target,
        cross_arch: Option<&Architecture>,
    ) -> Result<Resolution, ResolveError> {
        self.check_cross(target, cross_arch)?;
        self.resolve_validated(generic, target, cross_arch)
    }

    /// Resolve a package for a (target, arch) pair that already passed
    /// [`Resolver::check_cross`].
    pub(crate) fn resolve_validated(
        &self,
        generic: &str,
        target: &Target,
        cross_arch: Option<&Architecture>,
    ) -> Result<Resolution, ResolveError> {
        if !self.mappings.contains(generic) {
            return Err(ResolveError::UnknownPackage(generic.to_string()));
        }

        let scopes = Scope::for_target(target);
        let system = match self.mappings.record(MappingKind::System, generic) {
            None => Outcome::NoMapping,
            Some(record) => match cross_arch {
                None => self.native_walk(record, &scopes),
                Some(arch) => self.cross_walk(generic, record, target, &scopes, arch)?,
            },
        };

        Ok(match system {
            Outcome::Found(hit) => Resolution::Package(classify(generic, hit)),
            Outcome::Skipped => Resolution::Gap(Gap::CrossSkipped),
            Outcome::Absent => self.language_index(generic, &scopes, Gap::Absent),
            Outcome::NoMapping => self.language_index(generic, &scopes, Gap::NoMapping),
        })
    }

    /// Build-host packages: native arch keys (when configured) before the
    /// base keys.
    fn native_walk(&self, record: &MappingRecord, scopes: &[Scope; 4]) -> Outcome {
        let arch_keys = self
            .native_arch
            .into_iter()
            .flat_map(|arch| most_specific_first(scopes, move |s| SpecificityKey::Arch(arch.clone(), s)));
        let keys = arch_keys.chain(most_specific_first(scopes, SpecificityKey::Base));
        walk(record, MappingKind::System, WalkKind::Native, keys)
    }

    fn cross_walk(
        &self,
        generic: &str,
        record: &MappingRecord,
        target: &Target,
        scopes: &[Scope; 4],
        arch: &Architecture,
    ) -> Result<Outcome, ResolveError> {
        let policy = match record.first_match(most_specific_first(scopes, SpecificityKey::CrossPolicy)) {
            Some((_, ResolutionValue::Policy(policy))) => Some(*policy),
            _ => None,
        };
        emit(
            Level::Debug,
            "resolve.cross_policy",
            &format!(
                "{generic} on {target} for {arch}: {}",
                policy.map_or("implicit", |p| p.as_str())
            ),
            None,
        );

        let cross_keys = most_specific_first(scopes, |s| SpecificityKey::CrossArch(arch.clone(), s))
            .chain(most_specific_first(scopes, |s| SpecificityKey::Arch(arch.clone(), s)));

        let outcome = match policy {
            Some(CrossPolicy::Skip) => return Ok(Outcome::Skipped),
            Some(CrossPolicy::Native) => return Ok(self.native_walk(record, scopes)),
            Some(CrossPolicy::Foreign) => {
                // Debian installs foreign packages by name plus multiarch suffix
                let base_keys = (target.packaging == PackagingFormat::Deb)
                    .then(|| most_specific_first(scopes, SpecificityKey::Base))
                    .into_iter()
                    .flatten();
                walk(record, MappingKind::System, WalkKind::Cross, cross_keys.chain(base_keys))
            }
            None => match walk(record, MappingKind::System, WalkKind::Cross, cross_keys) {
                Outcome::NoMapping => return Ok(self.native_walk(record, scopes)),
                other => other,
            },
        };

        match outcome {
            Outcome::Found(hit) => Ok(Outcome::Found(self.multiarch(hit, target, arch)?)),
            other => Ok(other),
        }
    }

    /// Append the Debian architecture to foreign packages named by a
    /// base or arch key.
    fn multiarch(&self, mut hit: Hit, target: &Target, arch: &Architecture) -> Result<Hit, ResolveError> {
        if target.packaging != PackagingFormat::Deb || !matches!(hit.stratum, Stratum::Base | Stratum::Arch) {
            return Ok(hit);
        }
        let deb_arch = self
            .arches
            .info(arch)
            .and_then(|info| info.deb_arch.as_deref())
            .ok_or_else(|| {
                ResolveError::cross_unsupported(
                    &target.id,
                    arch.as_str(),
                    format!("{arch} has no Debian architecture name"),
                )
            })?;
        hit.name = format!("{}:{deb_arch}", hit.name);
        Ok(hit)
    }

    /// PyPI then CPAN, base keys only. `gap` is the system table's verdict.
    fn language_index(&self, generic: &str, scopes: &[Scope; 4], gap: Gap) -> Resolution {
        let mut gap = gap;
        for kind in [MappingKind::Pypi, MappingKind::Cpan] {
            let Some(record) = self.mappings.record(kind, generic) else {
                continue;
            };
            match walk(record, kind, WalkKind::Native, most_specific_first(scopes, SpecificityKey::Base)) {
                Outcome::Found(hit) => return Resolution::Package(classify(generic, hit)),
                Outcome::Absent => gap = Gap::Absent,
                Outcome::NoMapping | Outcome::Skipped => {}
            }
        }
        Resolution::Gap(gap)
    }
}

fn walk(
    record: &MappingRecord,
    kind: MappingKind,
    walk: WalkKind,
    keys: impl IntoIterator<Item = SpecificityKey>,
) -> Outcome {
    match record.first_match(keys) {
        Some((key, ResolutionValue::Name(name))) => Outcome::Found(Hit {
            kind,
            walk,
            stratum: key.stratum(),
            name: name.clone(),
        }),
        Some((_, ResolutionValue::Absent)) => Outcome::Absent,
        // Policies only live under cross-policy keys, which no walk visits
        Some((_, ResolutionValue::Policy(_))) | None => Outcome::NoMapping,
    }
}
