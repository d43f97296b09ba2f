//! Periodic entity matching.
//!
//! A periodic mesh identifies pairs of boundary entities of the same
//! dimension that represent the same physical location. Each pair has a
//! leaf (a local entity) and a root, addressed at the owning copy of the
//! root entity, possibly on another rank.

use crate::mesh_error::MeshError;
use crate::topology::ownership::{Remote, Remotes};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Matches {
    pub leaf_idxs: Vec<usize>,
    pub roots: Remotes,
}

impl Matches {
    pub fn new(leaf_idxs: Vec<usize>, roots: Remotes) -> Result<Self, MeshError> {
        if leaf_idxs.len() != roots.len() {
            return Err(MeshError::SizeMismatch {
                what: "periodic match roots",
                expected: leaf_idxs.len(),
                actual: roots.len(),
            });
        }
        Ok(Self { leaf_idxs, roots })
    }

    pub fn len(&self) -> usize {
        self.leaf_idxs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaf_idxs.is_empty()
    }

    /// Iterate `(leaf, root)` pairs.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, Remote)> + '_ {
        self.leaf_idxs.iter().copied().zip(self.roots.iter())
    }

    /// Root of `leaf`, if it is matched.
    pub fn root_of(&self, leaf: usize) -> Option<Remote> {
        self.pairs().find(|&(l, _)| l == leaf).map(|(_, r)| r)
    }
}
