//! OS build targets and the facts describing them.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ResolveError;

/// Native packaging format of a target. Variants are declared in
/// alphabetical order of their key form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackagingFormat {
    /// Alpine
    Apk,
    /// Homebrew on macOS
    Brew,
    /// Debian, Ubuntu
    Deb,
    /// FreeBSD
    Pkg,
    /// Fedora, CentOS, AlmaLinux, openSUSE
    Rpm,
}

impl PackagingFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Apk => "apk",
            Self::Brew => "brew",
            Self::Deb => "deb",
            Self::Pkg => "pkg",
            Self::Rpm => "rpm",
        }
    }
}

impl std::fmt::Display for PackagingFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TargetFacts {
    target: String,
    os: OsFacts,
    packaging: PackagingFacts,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct OsFacts {
    name: String,
    version: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PackagingFacts {
    format: PackagingFormat,
    command: String,
}

/// One supported OS distribution + version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Target {
    /// Canonical slug, e.g. `debian-12` or `opensuse-leap-15`.
    pub id: String,
    /// OS family name as used in mapping keys, e.g. `Debian`.
    pub os_name: String,
    /// Version as used in mapping keys, e.g. `12` or `Rawhide`.
    pub os_version: String,
    pub packaging: PackagingFormat,
    /// Package manager binary (`apt-get`, `dnf`, ...).
    pub packaging_command: String,
}

impl Target {
    pub fn new(id: &str, os_name: &str, os_version: &str, packaging: PackagingFormat) -> Self {
        Self {
            id: id.to_string(),
            os_name: os_name.to_string(),
            os_version: os_version.to_string(),
            packaging,
            packaging_command: String::new(),
        }
    }

    /// Load a target from `targets/<id>.yml`. The `target` field must match
    /// the file stem.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading target facts {}", path.display()))?;
        let target = Self::parse(&raw)
            .with_context(|| format!("parsing target facts {}", path.display()))?;

        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
        if stem != target.id {
            return Err(ResolveError::InvalidInventory(format!(
                "{} declares target '{}'",
                path.display(),
                target.id
            ))
            .into());
        }
        Ok(target)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let facts: TargetFacts = serde_yaml::from_str(raw).context("parsing target facts")?;
        let target = Target {
            id: facts.target,
            os_name: facts.os.name,
            os_version: facts.os.version,
            packaging: facts.packaging.format,
            packaging_command: facts.packaging.command,
        };
        target.validate()?;
        Ok(target)
    }

    pub fn validate(&self) -> Result<(), ResolveError> {
        for (field, value) in [
            ("target", &self.id),
            ("os.name", &self.os_name),
            ("os.version", &self.os_version),
        ] {
            if value.trim().is_empty() {
                return Err(ResolveError::InvalidInventory(format!(
                    "target '{}' has an empty {field}",
                    self.id
                )));
            }
        }
        Ok(())
    }

    /// `<os_name><os_version>`, the most specific mapping scope.
    pub fn name_version(&self) -> String {
        format!("{}{}", self.os_name, self.os_version)
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const DEBIAN: &str = "
target: debian-12
os:
  name: Debian
  version: \"12\"
packaging:
  format: deb
  command: apt-get
";

    #[test]
    fn test_parse() {
        let target = Target::parse(DEBIAN).unwrap();
        assert_eq!(target.id, "debian-12");
        assert_eq!(target.packaging, PackagingFormat::Deb);
        assert_eq!(target.packaging_command, "apt-get");
        assert_eq!(target.name_version(), "Debian12");
    }

    #[test]
    fn test_unknown_format_rejected() {
        let raw = DEBIAN.replace("format: deb", "format: msi");
        assert!(Target::parse(&raw).is_err());
    }

    #[test]
    fn test_empty_version_rejected() {
        let raw = DEBIAN.replace("version: \"12\"", "version: \"\"");
        let err = Target::parse(&raw).unwrap_err();
        assert!(err.downcast_ref::<ResolveError>().is_some());
    }

    #[test]
    fn test_load_checks_file_stem() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("debian-11.yml");
        fs::File::create(&path)?.write_all(DEBIAN.as_bytes())?;
        assert!(Target::load(&path).is_err());

        let path = dir.path().join("debian-12.yml");
        fs::File::create(&path)?.write_all(DEBIAN.as_bytes())?;
        assert_eq!(Target::load(&path)?.os_name, "Debian");
        Ok(())
    }

    #[test]
    fn test_format_order_matches_key_order() {
        let mut formats = vec![
            PackagingFormat::Rpm,
            PackagingFormat::Apk,
            PackagingFormat::Pkg,
            PackagingFormat::Deb,
            PackagingFormat::Brew,
        ];
        formats.sort();
        let names: Vec<_> = formats.iter().map(|f| f.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }
}
