//! Resolved packages and the channel they are installed through.
//!
//! - [`Channel`]: native package manager, cross toolchain, PyPI or CPAN
//! - [`PackageRecord`]: one resolved generic package
//! - [`PackageGroups`]: resolved names grouped per channel, sorted and unique

use serde::Serialize;
use std::collections::BTreeSet;

use crate::mappings::{MappingKind, Stratum};

/// How a resolved package is installed - one variant per installer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// The target's own package manager, build-host architecture.
    Native,
    /// The target's package manager, foreign (cross) architecture.
    Cross,
    /// Python Package Index
    Pypi,
    /// Comprehensive Perl Archive Network
    Cpan,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::Cross => "cross",
            Self::Pypi => "pypi",
            Self::Cpan => "cpan",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PackageRecord {
    pub generic_name: String,
    pub channel: Channel,
    pub resolved_name: String,
}

/// Which walk over the mapping keys produced a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkKind {
    Native,
    Cross,
}

/// A winning mapping entry, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    pub kind: MappingKind,
    pub walk: WalkKind,
    pub stratum: Stratum,
    pub name: String,
}

/// Wrap a winning entry into a [`PackageRecord`].
pub fn classify(generic_name: &str, hit: Hit) -> PackageRecord {
    let channel = match (hit.kind, hit.walk, hit.stratum) {
        (MappingKind::Pypi, _, _) => Channel::Pypi,
        (MappingKind::Cpan, _, _) => Channel::Cpan,
        (MappingKind::System, WalkKind::Cross, _) => Channel::Cross,
        (MappingKind::System, WalkKind::Native, Stratum::CrossArch | Stratum::CrossPolicy) => Channel::Cross,
        (MappingKind::System, WalkKind::Native, Stratum::Base | Stratum::Arch) => Channel::Native,
    };
    PackageRecord {
        generic_name: generic_name.to_string(),
        channel,
        resolved_name: hit.name,
    }
}

/// Resolved names grouped by channel, the shape formatters consume.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PackageGroups {
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub native: BTreeSet<String>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub cross: BTreeSet<String>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub pypi: BTreeSet<String>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub cpan: BTreeSet<String>,
}

impl PackageGroups {
    /// Add a record; returns false when its name was already present.
    pub fn insert(&mut self, record: PackageRecord) -> bool {
        self.group_mut(record.channel).insert(record.resolved_name)
    }

    pub fn group(&self, channel: Channel) -> &BTreeSet<String> {
        match channel {
            Channel::Native => &self.native,
            Channel::Cross => &self.cross,
            Channel::Pypi => &self.pypi,
            Channel::Cpan => &self.cpan,
        }
    }

    fn group_mut(&mut self, channel: Channel) -> &mut BTreeSet<String> {
        match channel {
            Channel::Native => &mut self.native,
            Channel::Cross => &mut self.cross,
            Channel::Pypi => &mut self.pypi,
            Channel::Cpan => &mut self.cpan,
        }
    }

    pub fn has(&self, channel: Channel) -> bool {
        !self.group(channel).is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn len(&self) -> usize {
        self.native.len() + self.cross.len() + self.pypi.len() + self.cpan.len()
    }

    /// Non-empty groups in channel order.
    pub fn iter(&self) -> impl Iterator<Item = (Channel, &BTreeSet<String>)> {
        [Channel::Native, Channel::Cross, Channel::Pypi, Channel::Cpan]
            .into_iter()
            .map(|channel| (channel, self.group(channel)))
            .filter(|(_, names)| !names.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(kind: MappingKind, walk: WalkKind, stratum: Stratum) -> Hit {
        Hit {
            kind,
            walk,
            stratum,
            name: "foo".to_string(),
        }
    }

    fn record(channel: Channel, name: &str) -> PackageRecord {
        PackageRecord {
            generic_name: name.to_string(),
            channel,
            resolved_name: name.to_string(),
        }
    }

    #[test]
    fn test_classify_native_strata() {
        let rec = classify("foo", hit(MappingKind::System, WalkKind::Native, Stratum::Base));
        assert_eq!(rec.channel, Channel::Native);
        assert_eq!(rec.resolved_name, "foo");
        let rec = classify("foo", hit(MappingKind::System, WalkKind::Native, Stratum::Arch));
        assert_eq!(rec.channel, Channel::Native);
    }

    #[test]
    fn test_classify_cross_walk() {
        // A foreign package found through a base key is still a cross package
        let rec = classify("foo", hit(MappingKind::System, WalkKind::Cross, Stratum::Base));
        assert_eq!(rec.channel, Channel::Cross);
        let rec = classify("foo", hit(MappingKind::System, WalkKind::Cross, Stratum::CrossArch));
        assert_eq!(rec.channel, Channel::Cross);
    }

    #[test]
    fn test_classify_language_index_ignores_walk() {
        for walk in [WalkKind::Native, WalkKind::Cross] {
            assert_eq!(classify("foo", hit(MappingKind::Pypi, walk, Stratum::Base)).channel, Channel::Pypi);
            assert_eq!(classify("foo", hit(MappingKind::Cpan, walk, Stratum::Base)).channel, Channel::Cpan);
        }
    }

    #[test]
    fn test_groups_sorted_and_unique() {
        let mut groups = PackageGroups::default();
        assert!(groups.insert(record(Channel::Native, "zlib1g-dev")));
        assert!(groups.insert(record(Channel::Native, "make")));
        assert!(!groups.insert(record(Channel::Native, "make")));
        assert!(groups.insert(record(Channel::Pypi, "meson")));

        assert_eq!(groups.native.iter().collect::<Vec<_>>(), ["make", "zlib1g-dev"]);
        assert_eq!(groups.len(), 3);
        assert!(groups.has(Channel::Pypi));
        assert!(!groups.has(Channel::Cross));
        assert_eq!(
            groups.iter().map(|(c, _)| c).collect::<Vec<_>>(),
            [Channel::Native, Channel::Pypi]
        );
    }

    #[test]
    fn test_groups_json_omits_empty() {
        let mut groups = PackageGroups::default();
        groups.insert(record(Channel::Cross, "libglib2.0-dev:s390x"));
        let json = serde_json::to_value(&groups).unwrap();
        assert_eq!(json, serde_json::json!({"cross": ["libglib2.0-dev:s390x"]}));
    }
}
