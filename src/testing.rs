//! Shared unit test fixtures.

use std::path::PathBuf;

use crate::context::Context;
use crate::inventory::{ArchTable, Architecture, PackagingFormat, Target};
use crate::mappings::{KeyUniverse, MappingTable};
use crate::resolve::{CrossMatrix, Resolver};

const ARCHES: &str = "
aarch64:
  abi: aarch64-linux-gnu
  deb_arch: arm64
mingw64:
  abi: x86_64-w64-mingw32
s390x:
  abi: s390x-linux-gnu
  deb_arch: s390x
x86_64:
  abi: x86_64-linux-gnu
  deb_arch: amd64
";

const CROSS: &str = "
Debian:
  exclude: [mingw64]
Fedora:
  include: [mingw64]
";

pub fn debian() -> Target {
    Target::new("debian-12", "Debian", "12", PackagingFormat::Deb)
}

pub fn fedora() -> Target {
    Target::new("fedora-rawhide", "Fedora", "Rawhide", PackagingFormat::Rpm)
}

pub fn macos() -> Target {
    Target::new("macos-13", "MacOS", "13", PackagingFormat::Brew)
}

pub fn alpine() -> Target {
    Target::new("alpine-edge", "Alpine", "Edge", PackagingFormat::Apk)
}

/// Small in-memory data set: four targets, four arches and the mappings
/// given as YAML.
pub struct Fixture {
    mappings: MappingTable,
    cross: CrossMatrix,
    arches: ArchTable,
    native_arch: Option<Architecture>,
}

impl Fixture {
    pub fn new(mappings: &str) -> Self {
        let arches = ArchTable::parse(ARCHES).unwrap();
        let universe = KeyUniverse::generate(&[debian(), fedora(), macos(), alpine()], arches.names()).unwrap();
        Self {
            mappings: MappingTable::parse(mappings, &universe).unwrap(),
            cross: CrossMatrix::parse(CROSS, &arches).unwrap(),
            arches,
            native_arch: None,
        }
    }

    pub fn with_native_arch(mut self, arch: &str) -> Self {
        self.native_arch = Some(self.arches.lookup(arch).unwrap().clone());
        self
    }

    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.mappings, &self.cross, &self.arches, self.native_arch.as_ref())
    }

    pub fn mappings(&self) -> &MappingTable {
        &self.mappings
    }
}

pub fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data")
}

/// The data set shipped in `data/`.
pub fn bundled() -> Context {
    Context::load(&data_dir(), None).unwrap()
}
