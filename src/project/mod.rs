//! Project catalogue and the package aggregator.
//!
//! A project is a sorted list of generic package names stored as
//! `projects/<name>.yml`. Projects under `projects/internal/` are not
//! requested by users; they are pulled in when a language index is used
//! (pip for PyPI packages, cpanplus for CPAN packages).

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::ResolveError;
use crate::inventory::{Architecture, Target};
use crate::mappings::MappingTable;
use crate::package::{Channel, PackageGroups};
use crate::resolve::{Resolution, Resolver};
use crate::ui::prelude::*;

/// Internal project installing the PyPI client.
pub const PYTHON_PIP: &str = "python-pip";
/// Internal project installing the CPAN client.
pub const PERL_CPANPLUS: &str = "perl-cpanplus";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProjectFile {
    #[serde(default)]
    packages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub name: String,
    pub packages: Vec<String>,
}

impl Project {
    pub fn new(name: &str, packages: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            packages: packages.iter().map(|p| p.to_string()).collect(),
        }
    }

    fn load(path: &Path) -> Result<Self> {
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .with_context(|| format!("invalid project file name {}", path.display()))?;
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading project {}", path.display()))?;
        let file: ProjectFile = serde_yaml::from_str(&raw)
            .with_context(|| format!("parsing project {}", path.display()))?;
        Ok(Self {
            name: name.to_string(),
            packages: file.packages,
        })
    }

    /// Packages must be strictly sorted and known to the mapping table.
    pub fn validate(&self, mappings: &MappingTable) -> Result<(), ResolveError> {
        let invalid = |reason: String| ResolveError::InvalidProject {
            project: self.name.clone(),
            reason,
        };
        if let Some(pair) = self.packages.windows(2).find(|w| w[0] >= w[1]) {
            return Err(invalid(format!(
                "packages are not sorted: '{}' is listed before '{}'",
                pair[0], pair[1]
            )));
        }
        if let Some(unknown) = self.packages.iter().find(|p| !mappings.contains(p)) {
            return Err(invalid(format!("unknown package '{unknown}'")));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Projects {
    public: BTreeMap<String, Project>,
    internal: BTreeMap<String, Project>,
}

impl Projects {
    /// Load `<dir>/*.yml` and, when present, `<dir>/internal/*.yml`.
    pub fn load(dir: &Path) -> Result<Self> {
        let public = load_dir(dir)?;
        let internal_dir = dir.join("internal");
        let internal = if internal_dir.is_dir() {
            load_dir(&internal_dir)?
        } else {
            Vec::new()
        };
        Ok(Self::from_parts(public, internal)?)
    }

    pub fn from_parts(public: Vec<Project>, internal: Vec<Project>) -> Result<Self, ResolveError> {
        fn index(projects: Vec<Project>) -> Result<BTreeMap<String, Project>, ResolveError> {
            let mut by_name = BTreeMap::new();
            for project in projects {
                let name = project.name.clone();
                if by_name.insert(name.clone(), project).is_some() {
                    return Err(ResolveError::InvalidInventory(format!("duplicate project '{name}'")));
                }
            }
            Ok(by_name)
        }
        Ok(Self {
            public: index(public)?,
            internal: index(internal)?,
        })
    }

    /// Public project names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.public.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Result<&Project, ResolveError> {
        self.public
            .get(name)
            .ok_or_else(|| ResolveError::UnknownProject(name.to_string()))
    }

    fn internal(&self, name: &str) -> Result<&Project, ResolveError> {
        self.internal
            .get(name)
            .ok_or_else(|| ResolveError::UnknownProject(format!("internal/{name}")))
    }

    /// Every project, public and internal.
    pub fn all(&self) -> impl Iterator<Item = &Project> {
        self.public.values().chain(self.internal.values())
    }

    pub fn validate(&self, mappings: &MappingTable) -> Result<(), ResolveError> {
        self.all().try_for_each(|project| project.validate(mappings))
    }

    /// Resolve the packages of `names` for a target into sorted,
    /// de-duplicated groups.
    pub fn get_packages(
        &self,
        resolver: &Resolver<'_>,
        names: &[&str],
        target: &Target,
        cross_arch: Option<&Architecture>,
    ) -> Result<PackageGroups, ResolveError> {
        resolver.check_cross(target, cross_arch)?;

        let projects = names
            .iter()
            .map(|name| self.get(name))
            .collect::<Result<Vec<_>, _>>()?;

        let mut groups = PackageGroups::default();
        for project in projects {
            collect(resolver, project, target, cross_arch, &mut groups)?;
        }

        // Language index clients; their own packages do not pull in more
        let pip = groups.has(Channel::Pypi);
        let cpan = groups.has(Channel::Cpan);
        if pip {
            collect(resolver, self.internal(PYTHON_PIP)?, target, cross_arch, &mut groups)?;
        }
        if cpan {
            collect(resolver, self.internal(PERL_CPANPLUS)?, target, cross_arch, &mut groups)?;
        }

        Ok(groups)
    }
}

fn collect(
    resolver: &Resolver<'_>,
    project: &Project,
    target: &Target,
    cross_arch: Option<&Architecture>,
    groups: &mut PackageGroups,
) -> Result<(), ResolveError> {
    for generic in &project.packages {
        match resolver.resolve_validated(generic, target, cross_arch)? {
            Resolution::Package(record) => {
                groups.insert(record);
            }
            Resolution::Gap(gap) => emit(
                Level::Debug,
                "project.gap",
                &format!("Dropping {generic} from {}: {}", project.name, gap.as_str()),
                None,
            ),
        }
    }
    Ok(())
}

fn load_dir(dir: &Path) -> Result<Vec<Project>> {
    let mut entries = fs::read_dir(dir)
        .with_context(|| format!("reading projects directory {}", dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()
        .with_context(|| format!("listing projects in {}", dir.display()))?;
    entries.sort_by_key(|entry| entry.file_name());

    entries
        .into_iter()
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "yml"))
        .map(|path| Project::load(&path))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, Fixture};

    const MAPPINGS: &str = "
mappings:
  gcc:
    default: gcc
    cross-mingw64-rpm: mingw64-gcc
    cross-s390x-deb: gcc-s390x-linux-gnu
  glib2:
    default: glib2-devel
    deb: libglib2.0-dev
    MacOS: glib
    cross-mingw64-rpm: mingw64-glib2
    cross-policy-default: foreign
  make:
    default: make
  meson:
    default: meson
    Fedora:
    cross-policy-default: native
  perl-cpanplus:
    default: perl-CPANPLUS
    MacOS:
  pip:
    default: python3-pip
    MacOS:
  valgrind:
    default: valgrind
    MacOS:
    cross-policy-default: skip
pypi_mappings:
  meson:
    default: meson==0.63.3
cpan_mappings:
  harness:
    MacOS: Test::Harness
";

    fn projects() -> Projects {
        Projects::from_parts(
            vec![
                Project::new("base", &["make"]),
                Project::new("qemu", &["gcc", "glib2", "harness", "make", "meson", "valgrind"]),
            ],
            vec![
                Project::new(PYTHON_PIP, &["pip"]),
                Project::new(PERL_CPANPLUS, &["perl-cpanplus"]),
            ],
        )
        .unwrap()
    }

    fn sorted(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_native_groups() {
        let fx = Fixture::new(MAPPINGS);
        let groups = projects()
            .get_packages(&fx.resolver(), &["qemu", "base"], &testing::debian(), None)
            .unwrap();
        assert_eq!(
            groups.native.iter().cloned().collect::<Vec<_>>(),
            sorted(&["gcc", "libglib2.0-dev", "make", "meson", "valgrind"])
        );
        assert!(groups.cross.is_empty());
        assert!(groups.pypi.is_empty());
    }

    #[test]
    fn test_cross_groups_debian() {
        let fx = Fixture::new(MAPPINGS);
        let groups = projects()
            .get_packages(&fx.resolver(), &["qemu"], &testing::debian(), Some(&Architecture::new("s390x")))
            .unwrap();
        assert_eq!(
            groups.cross.iter().cloned().collect::<Vec<_>>(),
            sorted(&["gcc-s390x-linux-gnu", "libglib2.0-dev:s390x"])
        );
        assert_eq!(groups.native.iter().cloned().collect::<Vec<_>>(), sorted(&["make", "meson"]));
    }

    #[test]
    fn test_pypi_pulls_in_pip() {
        let fx = Fixture::new(MAPPINGS);
        let groups = projects()
            .get_packages(&fx.resolver(), &["qemu"], &testing::fedora(), Some(&Architecture::new("mingw64")))
            .unwrap();
        assert_eq!(
            groups.cross.iter().cloned().collect::<Vec<_>>(),
            sorted(&["mingw64-gcc", "mingw64-glib2"])
        );
        assert_eq!(groups.pypi.iter().cloned().collect::<Vec<_>>(), sorted(&["meson==0.63.3"]));
        assert_eq!(
            groups.native.iter().cloned().collect::<Vec<_>>(),
            sorted(&["make", "python3-pip"])
        );
    }

    #[test]
    fn test_cpan_pulls_in_cpanplus() {
        let fx = Fixture::new(MAPPINGS);
        let groups = projects()
            .get_packages(&fx.resolver(), &["qemu"], &testing::macos(), None)
            .unwrap();
        assert_eq!(groups.cpan.iter().cloned().collect::<Vec<_>>(), sorted(&["Test::Harness"]));
        // cpanplus is absent on MacOS
        assert_eq!(
            groups.native.iter().cloned().collect::<Vec<_>>(),
            sorted(&["gcc", "glib", "make", "meson"])
        );
    }

    #[test]
    fn test_unsupported_cross_is_fatal() {
        let fx = Fixture::new(MAPPINGS);
        let err = projects()
            .get_packages(&fx.resolver(), &["base"], &testing::alpine(), Some(&Architecture::new("s390x")))
            .unwrap_err();
        assert!(matches!(err, ResolveError::CrossArchitectureUnsupported { .. }));
    }

    #[test]
    fn test_unknown_project() {
        let fx = Fixture::new(MAPPINGS);
        let err = projects()
            .get_packages(&fx.resolver(), &["base", "nope"], &testing::debian(), None)
            .unwrap_err();
        assert_eq!(err, ResolveError::UnknownProject("nope".into()));
        // Internal projects cannot be requested directly
        assert!(projects().get(PYTHON_PIP).is_err());
    }

    #[test]
    fn test_validate() {
        let fx = Fixture::new(MAPPINGS);
        assert!(projects().validate(fx.mappings()).is_ok());

        let unsorted = Project::new("qemu", &["make", "gcc"]);
        assert!(matches!(
            unsorted.validate(fx.mappings()),
            Err(ResolveError::InvalidProject { .. })
        ));
        let duplicate = Project::new("qemu", &["gcc", "gcc"]);
        assert!(duplicate.validate(fx.mappings()).is_err());
        let unknown = Project::new("qemu", &["gcc", "zzz"]);
        let err = unknown.validate(fx.mappings()).unwrap_err();
        assert!(err.to_string().contains("unknown package 'zzz'"));
    }

    #[test]
    fn test_load_dir() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::create_dir(dir.path().join("internal"))?;
        fs::write(dir.path().join("vm.yml"), "packages:\n  - cloud-init\n  - openssh-server\n")?;
        fs::write(dir.path().join("internal/python-pip.yml"), "packages:\n  - pip\n")?;
        fs::write(dir.path().join("notes.txt"), "ignored")?;

        let projects = Projects::load(dir.path())?;
        assert_eq!(projects.names().collect::<Vec<_>>(), ["vm"]);
        assert_eq!(projects.get("vm")?.packages, ["cloud-init", "openssh-server"]);
        assert_eq!(projects.all().count(), 2);
        Ok(())
    }
}
