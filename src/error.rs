use thiserror::Error;

/// Errors raised while loading or resolving package mappings.
///
/// Resolution gaps are not errors; see [`crate::resolve::Resolution`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Cannot cross compile for {arch} on target {target}: {reason}")]
    CrossArchitectureUnsupported {
        target: String,
        arch: String,
        reason: String,
    },

    #[error("Package {package} key order was {found:?} but should be {expected:?}")]
    MappingOrderViolation {
        package: String,
        found: Vec<String>,
        expected: Vec<String>,
    },

    #[error("Package {package} uses unknown mapping key '{key}'")]
    UnknownMappingKey { package: String, key: String },

    #[error("Package {package} has an invalid value for key '{key}': {reason}")]
    InvalidMappingValue {
        package: String,
        key: String,
        reason: String,
    },

    #[error("Unexpected cross policy '{value}' for {package} (expected native, foreign or skip)")]
    InvalidCrossPolicy { package: String, value: String },

    #[error("No mapping for package: {0}")]
    UnknownPackage(String),

    #[error("Project not found: {0}")]
    UnknownProject(String),

    #[error("Invalid project {project}: {reason}")]
    InvalidProject { project: String, reason: String },

    #[error("Target not found: {0}")]
    UnknownTarget(String),

    #[error("Unknown architecture: {0}")]
    UnknownArchitecture(String),

    #[error("Invalid inventory: {0}")]
    InvalidInventory(String),
}

impl ResolveError {
    pub fn cross_unsupported(target: &str, arch: &str, reason: impl Into<String>) -> Self {
        ResolveError::CrossArchitectureUnsupported {
            target: target.to_string(),
            arch: arch.to_string(),
            reason: reason.into(),
        }
    }

    /// Data defects in the mapping source, as opposed to caller errors.
    pub fn is_data_defect(&self) -> bool {
        matches!(
            self,
            ResolveError::MappingOrderViolation { .. }
                | ResolveError::UnknownMappingKey { .. }
                | ResolveError::InvalidMappingValue { .. }
                | ResolveError::InvalidCrossPolicy { .. }
                | ResolveError::InvalidProject { .. }
                | ResolveError::InvalidInventory(_)
        )
    }
}
