//! Specificity keys and the canonical key universe.
//!
//! A key names one precedence level of a package mapping. Keys come in four
//! strata, each combined with a scope:
//!
//! ```text
//! <scope>                  Base
//! <arch>-<scope>           Arch
//! cross-<arch>-<scope>     CrossArch
//! cross-policy-<scope>     CrossPolicy
//! ```
//!
//! where a scope is `default`, a packaging format, an OS name, or an OS
//! name immediately followed by its version.
//!
//! The universe for a set of targets and architectures is the list
//!
//! ```text
//! base     = default, sorted formats, sorted names, per sorted name: sorted name+version
//! universe = base, per arch: arch-base, per arch: cross-arch-base, cross-policy-base
//! ```
//!
//! Keys stored for a package must appear in universe order.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use crate::error::ResolveError;
use crate::inventory::{Architecture, PackagingFormat, Target};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    Default,
    Format(PackagingFormat),
    Os(String),
    OsVersion { name: String, version: String },
}

impl Scope {
    /// The four scopes of a target, least specific first.
    pub fn for_target(target: &Target) -> [Scope; 4] {
        [
            Scope::Default,
            Scope::Format(target.packaging),
            Scope::Os(target.os_name.clone()),
            Scope::OsVersion {
                name: target.os_name.clone(),
                version: target.os_version.clone(),
            },
        ]
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Default => write!(f, "default"),
            Scope::Format(format) => write!(f, "{format}"),
            Scope::Os(name) => write!(f, "{name}"),
            Scope::OsVersion { name, version } => write!(f, "{name}{version}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stratum {
    Base,
    Arch,
    CrossArch,
    CrossPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SpecificityKey {
    Base(Scope),
    Arch(Architecture, Scope),
    CrossArch(Architecture, Scope),
    CrossPolicy(Scope),
}

impl SpecificityKey {
    pub fn stratum(&self) -> Stratum {
        match self {
            SpecificityKey::Base(_) => Stratum::Base,
            SpecificityKey::Arch(..) => Stratum::Arch,
            SpecificityKey::CrossArch(..) => Stratum::CrossArch,
            SpecificityKey::CrossPolicy(_) => Stratum::CrossPolicy,
        }
    }

    pub fn scope(&self) -> &Scope {
        match self {
            SpecificityKey::Base(scope)
            | SpecificityKey::Arch(_, scope)
            | SpecificityKey::CrossArch(_, scope)
            | SpecificityKey::CrossPolicy(scope) => scope,
        }
    }
}

impl fmt::Display for SpecificityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecificityKey::Base(scope) => write!(f, "{scope}"),
            SpecificityKey::Arch(arch, scope) => write!(f, "{arch}-{scope}"),
            SpecificityKey::CrossArch(arch, scope) => write!(f, "cross-{arch}-{scope}"),
            SpecificityKey::CrossPolicy(scope) => write!(f, "cross-policy-{scope}"),
        }
    }
}

/// Build the keys of one stratum for a target, most specific first.
pub fn most_specific_first(
    scopes: &[Scope; 4],
    make: impl Fn(Scope) -> SpecificityKey,
) -> impl Iterator<Item = SpecificityKey> {
    scopes.iter().rev().cloned().map(make)
}

/// The canonical, totally ordered list of every key for a universe of
/// targets and architectures.
#[derive(Debug, Clone)]
pub struct KeyUniverse {
    keys: Vec<SpecificityKey>,
    index: HashMap<String, usize>,
}

impl KeyUniverse {
    pub fn generate<'a>(
        targets: impl IntoIterator<Item = &'a Target>,
        arches: impl IntoIterator<Item = &'a Architecture>,
    ) -> Result<Self, ResolveError> {
        let mut formats = BTreeSet::new();
        let mut versions: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
        for target in targets {
            target.validate()?;
            formats.insert(target.packaging);
            versions
                .entry(target.os_name.clone())
                .or_default()
                .insert(target.name_version(), target.os_version.clone());
        }
        if versions.is_empty() {
            return Err(ResolveError::InvalidInventory(
                "cannot generate mapping keys without targets".to_string(),
            ));
        }

        let arches: BTreeSet<&Architecture> = arches.into_iter().collect();
        if arches.is_empty() {
            return Err(ResolveError::InvalidInventory(
                "cannot generate mapping keys without architectures".to_string(),
            ));
        }

        let mut base = vec![Scope::Default];
        base.extend(formats.into_iter().map(Scope::Format));
        base.extend(versions.keys().cloned().map(Scope::Os));
        for (name, by_name_version) in &versions {
            base.extend(by_name_version.values().map(|version| Scope::OsVersion {
                name: name.clone(),
                version: version.clone(),
            }));
        }

        let mut keys: Vec<SpecificityKey> = base.iter().cloned().map(SpecificityKey::Base).collect();
        for arch in &arches {
            keys.extend(base.iter().map(|s| SpecificityKey::Arch((*arch).clone(), s.clone())));
        }
        for arch in &arches {
            keys.extend(base.iter().map(|s| SpecificityKey::CrossArch((*arch).clone(), s.clone())));
        }
        keys.extend(base.iter().cloned().map(SpecificityKey::CrossPolicy));

        let mut index = HashMap::with_capacity(keys.len());
        for (pos, key) in keys.iter().enumerate() {
            let text = key.to_string();
            if index.insert(text.clone(), pos).is_some() {
                return Err(ResolveError::InvalidInventory(format!(
                    "mapping key '{text}' is generated twice"
                )));
            }
        }

        Ok(Self { keys, index })
    }

    #[cfg(test)]
    pub fn keys(&self) -> &[SpecificityKey] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Position and parsed form of a raw key string.
    pub fn lookup(&self, raw: &str) -> Option<(usize, &SpecificityKey)> {
        self.index.get(raw).map(|&pos| (pos, &self.keys[pos]))
    }

    /// Parse the raw keys stored for `package`, checking membership and
    /// that they appear in universe order.
    pub fn parse_record_keys(
        &self,
        package: &str,
        raw_keys: &[&str],
    ) -> Result<Vec<SpecificityKey>, ResolveError> {
        let mut positions = Vec::with_capacity(raw_keys.len());
        for raw in raw_keys {
            let (pos, _) = self.lookup(raw).ok_or_else(|| ResolveError::UnknownMappingKey {
                package: package.to_string(),
                key: raw.to_string(),
            })?;
            positions.push(pos);
        }

        if positions.windows(2).any(|w| w[0] >= w[1]) {
            let mut expected = positions.clone();
            expected.sort_unstable();
            expected.dedup();
            return Err(ResolveError::MappingOrderViolation {
                package: package.to_string(),
                found: raw_keys.iter().map(|k| k.to_string()).collect(),
                expected: expected.iter().map(|&pos| self.keys[pos].to_string()).collect(),
            });
        }

        Ok(positions.into_iter().map(|pos| self.keys[pos].clone()).collect())
    }

    pub fn check_order(&self, package: &str, raw_keys: &[&str]) -> Result<(), ResolveError> {
        self.parse_record_keys(package, raw_keys).map(|_| ())
    }
}
