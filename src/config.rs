//! Migration configuration.
//!
//! [`PartitionMode`] decides, per dimension, whether a migrated entity keeps
//! the owner rank it had before migration or elects a fresh one among its
//! new copies.

use serde::{Deserialize, Serialize};

/// How ownership is assigned after migration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartitionMode {
    /// Ghost layers are being built: every entity keeps its owner rank.
    Ghosted,
    /// Vertices keep their owners; higher dimensions elect fresh ones.
    VertBased,
    /// Every dimension elects fresh owners.
    #[default]
    ElemBased,
}

/// Ownership rule applied to one dimension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OwnerPolicy {
    /// Keep the owner rank held before migration.
    Preserve,
    /// The lowest rank holding a new copy owns it.
    Fresh,
}

impl PartitionMode {
    pub const fn policy(self, dim: usize) -> OwnerPolicy {
        match (self, dim) {
            (PartitionMode::Ghosted, _) => OwnerPolicy::Preserve,
            (PartitionMode::VertBased, 0) => OwnerPolicy::Preserve,
            (PartitionMode::VertBased, _) => OwnerPolicy::Fresh,
            (PartitionMode::ElemBased, _) => OwnerPolicy::Fresh,
        }
    }
}

/// Options for [`migrate_mesh_with`](crate::algs::migrate::migrate_mesh_with).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrateOptions {
    pub mode: PartitionMode,
    /// Log migration volume from rank 0.
    pub verbose: bool,
}

impl MigrateOptions {
    pub fn new(mode: PartitionMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_table() {
        use OwnerPolicy::*;
        use PartitionMode::*;
        let table = [
            (Ghosted, [Preserve, Preserve, Preserve]),
            (VertBased, [Preserve, Fresh, Fresh]),
            (ElemBased, [Fresh, Fresh, Fresh]),
        ];
        for (mode, row) in table {
            for (dim, expected) in row.into_iter().enumerate() {
                assert_eq!(mode.policy(dim), expected, "{mode:?} dim {dim}");
            }
        }
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let opts: MigrateOptions = serde_json::from_str(r#"{"verbose": true}"#).unwrap();
        assert_eq!(opts.mode, PartitionMode::ElemBased);
        assert!(opts.verbose);
        let ghosted = MigrateOptions::new(PartitionMode::Ghosted).verbose(false);
        let json = serde_json::to_string(&ghosted).unwrap();
        assert_eq!(serde_json::from_str::<MigrateOptions>(&json).unwrap(), ghosted);
    }
}
