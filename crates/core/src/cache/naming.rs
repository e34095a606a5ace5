//! Partition naming convention.
//!
//! Partitions are named `{prefix}-{role}-{version}`. Everything starting
//! with `{prefix}-` belongs to this layer; anything else in the store is
//! left alone.

use std::fmt;

/// Role of a partition within one deployed version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartitionRole {
    /// Shell assets from the static manifest.
    Static,
    /// Runtime responses and the offline fallback pair.
    Dynamic,
}

impl PartitionRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Dynamic => "dynamic",
        }
    }
}

impl fmt::Display for PartitionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Partition names for one deployed version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionNames {
    prefix: String,
    version: String,
}

impl PartitionNames {
    pub fn new(prefix: impl Into<String>, version: impl Into<String>) -> Self {
        Self { prefix: prefix.into(), version: version.into() }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Current name for a role, e.g. `rewind-static-v2`.
    pub fn name(&self, role: PartitionRole) -> String {
        format!("{}-{}-{}", self.prefix, role, self.version)
    }

    pub fn static_name(&self) -> String {
        self.name(PartitionRole::Static)
    }

    pub fn dynamic_name(&self) -> String {
        self.name(PartitionRole::Dynamic)
    }

    /// Whether the partition was created by this layer (any version).
    pub fn is_owned(&self, name: &str) -> bool {
        name.strip_prefix(self.prefix.as_str())
            .is_some_and(|rest| rest.starts_with('-'))
    }

    /// Whether the partition is one of the current version's partitions.
    pub fn is_current(&self, name: &str) -> bool {
        name == self.static_name() || name == self.dynamic_name()
    }

    /// Whether activation should delete the partition.
    pub fn is_stale(&self, name: &str) -> bool {
        self.is_owned(name) && !self.is_current(name)
    }
}
