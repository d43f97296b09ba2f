//! Ownership metadata for mesh entities.
//!
//! A [`Remote`] names one copy of an entity by `(rank, local index)`.
//! [`Remotes`] stores one such location per local entity; as an ownership
//! record it names, for each local copy, the authoritative copy on its
//! owning rank.

use crate::mesh_error::MeshError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Remote {
    pub rank: usize,
    pub idx: usize,
}

impl Remote {
    pub const fn new(rank: usize, idx: usize) -> Self {
        Self { rank, idx }
    }
}

/// Parallel arrays of ranks and indices.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Remotes {
    pub ranks: Vec<usize>,
    pub idxs: Vec<usize>,
}

impl Remotes {
    pub fn new(ranks: Vec<usize>, idxs: Vec<usize>) -> Result<Self, MeshError> {
        if ranks.len() != idxs.len() {
            return Err(MeshError::SizeMismatch {
                what: "remote indices",
                expected: ranks.len(),
                actual: idxs.len(),
            });
        }
        Ok(Self { ranks, idxs })
    }

    /// Every entity owned by `rank` at its own index.
    pub fn identity(rank: usize, n: usize) -> Self {
        Self {
            ranks: vec![rank; n],
            idxs: (0..n).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    pub fn get(&self, i: usize) -> Remote {
        Remote::new(self.ranks[i], self.idxs[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = Remote> + '_ {
        self.ranks
            .iter()
            .zip(&self.idxs)
            .map(|(&rank, &idx)| Remote::new(rank, idx))
    }

    /// Gather `self[a2b[i]]` for every `i`.
    pub fn unmap(&self, a2b: &[usize]) -> Result<Remotes, MeshError> {
        let mut out = Remotes {
            ranks: Vec::with_capacity(a2b.len()),
            idxs: Vec::with_capacity(a2b.len()),
        };
        for &b in a2b {
            if b >= self.len() {
                return Err(MeshError::SizeMismatch {
                    what: "remote lookup",
                    expected: self.len(),
                    actual: b + 1,
                });
            }
            out.ranks.push(self.ranks[b]);
            out.idxs.push(self.idxs[b]);
        }
        Ok(out)
    }

    /// Number of entries whose owner is `rank`.
    pub fn owned_by(&self, rank: usize) -> usize {
        self.ranks.iter().filter(|&&r| r == rank).count()
    }
}

impl FromIterator<Remote> for Remotes {
    fn from_iter<I: IntoIterator<Item = Remote>>(iter: I) -> Self {
        let mut out = Remotes::default();
        for r in iter {
            out.ranks.push(r.rank);
            out.idxs.push(r.idx);
        }
        out
    }
}

/// One `entity: rank/idx` pair per line.
impl fmt::Display for Remotes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, r) in self.iter().enumerate() {
            writeln!(f, "{i}: {}/{}", r.rank, r.idx)?;
        }
        Ok(())
    }
}
