//! Distributed mesh representation consumed and produced by migration.
//!
//! A [`Mesh`] is one rank's part of a distributed unstructured mesh: entity
//! counts per dimension, downward adjacency between adjacent dimensions,
//! ownership records, tags and periodic matches. Entities are identified
//! across ranks and across migrations by the `"global"` tag.

use crate::algs::communicator::Communicator;
use crate::data::tag::{ScalarKind, Tag, TagData};
use crate::mesh_error::MeshError;
use crate::topology::adj::Adj;
use crate::topology::family::{Family, element_degree};
use crate::topology::ownership::Remotes;
use crate::topology::periodic::Matches;
use std::collections::BTreeMap;

/// Persistent cross-migration entity identifier.
pub type GlobalId = i64;

/// Name of the tag carrying global identifiers on every dimension.
pub const GLOBAL_TAG: &str = "global";

pub const VERT: usize = 0;

#[derive(Clone, Debug)]
pub struct Mesh<C> {
    comm: C,
    family: Family,
    dim: usize,
    nents: Vec<Option<usize>>,
    // down[d] maps dimension d to d - 1
    down: Vec<Option<Adj>>,
    owners: Vec<Option<Remotes>>,
    tags: Vec<BTreeMap<String, Tag>>,
    matches: Vec<Option<Matches>>,
}

impl<C: Communicator> Mesh<C> {
    /// Empty mesh of element dimension `dim` (1 to 3).
    pub fn new(comm: C, family: Family, dim: usize) -> Result<Self, MeshError> {
        if dim == 0 || dim > 3 {
            return Err(MeshError::InvalidDimension { dim, mesh_dim: 3 });
        }
        Ok(Self {
            comm,
            family,
            dim,
            nents: vec![None; dim + 1],
            down: vec![None; dim + 1],
            owners: vec![None; dim + 1],
            tags: vec![BTreeMap::new(); dim + 1],
            matches: vec![None; dim + 1],
        })
    }

    /// A shell sharing this mesh's communicator, family and dimension, with no entities.
    pub fn copy_meta(&self) -> Self {
        Self {
            comm: self.comm.clone(),
            family: self.family,
            dim: self.dim,
            nents: vec![None; self.dim + 1],
            down: vec![None; self.dim + 1],
            owners: vec![None; self.dim + 1],
            tags: vec![BTreeMap::new(); self.dim + 1],
            matches: vec![None; self.dim + 1],
        }
    }

    pub fn comm(&self) -> &C {
        &self.comm
    }

    pub fn family(&self) -> Family {
        self.family
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    fn check_dim(&self, dim: usize) -> Result<(), MeshError> {
        if dim > self.dim {
            return Err(MeshError::InvalidDimension {
                dim,
                mesh_dim: self.dim,
            });
        }
        Ok(())
    }

    /// Entity count of `dim`; 0 until the dimension is populated.
    pub fn nents(&self, dim: usize) -> usize {
        self.nents.get(dim).copied().flatten().unwrap_or(0)
    }

    pub fn nverts(&self) -> usize {
        self.nents(VERT)
    }

    pub fn nelems(&self) -> usize {
        self.nents(self.dim)
    }

    pub fn set_verts(&mut self, n: usize) {
        self.nents[VERT] = Some(n);
    }

    /// Install the adjacency from `dim` to `dim - 1`, which also fixes the
    /// entity count of `dim`.
    pub fn set_ents(&mut self, dim: usize, down: Adj) -> Result<(), MeshError> {
        self.check_dim(dim)?;
        if dim == VERT {
            return Err(MeshError::InvalidDimension {
                dim,
                mesh_dim: self.dim,
            });
        }
        let deg = element_degree(self.family, dim, dim - 1);
        if down.ab2b.len() % deg != 0 {
            return Err(MeshError::SizeMismatch {
                what: "downward adjacency",
                expected: (down.ab2b.len() / deg + 1) * deg,
                actual: down.ab2b.len(),
            });
        }
        if let Some(codes) = &down.codes {
            if codes.len() != down.ab2b.len() {
                return Err(MeshError::SizeMismatch {
                    what: "adjacency codes",
                    expected: down.ab2b.len(),
                    actual: codes.len(),
                });
            }
        }
        self.nents[dim] = Some(down.ab2b.len() / deg);
        self.down[dim] = Some(down);
        Ok(())
    }

    /// Downward adjacency between adjacent dimensions.
    pub fn ask_down(&self, high_dim: usize, low_dim: usize) -> Result<&Adj, MeshError> {
        self.check_dim(high_dim)?;
        if low_dim + 1 != high_dim {
            return Err(MeshError::InvalidDimension {
                dim: low_dim,
                mesh_dim: self.dim,
            });
        }
        self.down[high_dim].as_ref().ok_or(MeshError::MissingAdjacency {
            high: high_dim,
            low: low_dim,
        })
    }

    /// Ownership of `dim`; entities without a record are owned here.
    pub fn ask_owners(&self, dim: usize) -> Remotes {
        match self.owners.get(dim).and_then(|o| o.as_ref()) {
            Some(owners) => owners.clone(),
            None => Remotes::identity(self.comm.rank(), self.nents(dim)),
        }
    }

    pub fn set_owners(&mut self, dim: usize, owners: Remotes) -> Result<(), MeshError> {
        self.check_dim(dim)?;
        if owners.len() != self.nents(dim) {
            return Err(MeshError::SizeMismatch {
                what: "ownership record",
                expected: self.nents(dim),
                actual: owners.len(),
            });
        }
        self.owners[dim] = Some(owners);
        Ok(())
    }

    /// Number of entities of `dim` owned by this rank.
    pub fn owned_count(&self, dim: usize) -> usize {
        self.ask_owners(dim).owned_by(self.comm.rank())
    }

    /// Add (or replace) a tag of `ncomps` components per entity.
    pub fn add_tag(
        &mut self,
        dim: usize,
        name: &str,
        ncomps: usize,
        data: TagData,
    ) -> Result<(), MeshError> {
        self.check_dim(dim)?;
        let expected = self.nents(dim) * ncomps;
        if data.len() != expected {
            return Err(MeshError::SizeMismatch {
                what: "tag array",
                expected,
                actual: data.len(),
            });
        }
        self.tags[dim].insert(name.to_owned(), Tag::new(name, ncomps, data));
        Ok(())
    }

    pub fn remove_tag(&mut self, dim: usize, name: &str) -> Option<Tag> {
        self.tags.get_mut(dim)?.remove(name)
    }

    pub fn has_tag(&self, dim: usize, name: &str) -> bool {
        self.get_tag(dim, name).is_some()
    }

    pub fn get_tag(&self, dim: usize, name: &str) -> Option<&Tag> {
        self.tags.get(dim)?.get(name)
    }

    /// Tags of `dim` in name order.
    pub fn tags(&self, dim: usize) -> impl Iterator<Item = &Tag> + '_ {
        self.tags.get(dim).into_iter().flat_map(|t| t.values())
    }

    pub fn ntags(&self, dim: usize) -> usize {
        self.tags.get(dim).map_or(0, |t| t.len())
    }

    /// Global identifiers of `dim`.
    pub fn globals(&self, dim: usize) -> Result<&[GlobalId], MeshError> {
        let tag = self.get_tag(dim, GLOBAL_TAG).ok_or_else(|| MeshError::MissingTag {
            dim,
            name: GLOBAL_TAG.to_owned(),
        })?;
        match tag.data() {
            TagData::I64(v) if tag.ncomps() == 1 => Ok(v),
            other => Err(MeshError::TagKindMismatch {
                dim,
                name: GLOBAL_TAG.to_owned(),
                expected: ScalarKind::I64.name(),
                actual: other.kind().name(),
            }),
        }
    }

    pub fn set_matches(&mut self, dim: usize, matches: Matches) -> Result<(), MeshError> {
        self.check_dim(dim)?;
        let n = self.nents(dim);
        if let Some(&bad) = matches.leaf_idxs.iter().find(|&&l| l >= n) {
            return Err(MeshError::InvalidMesh(format!(
                "periodic leaf {bad} out of range for {n} entities of dimension {dim}"
            )));
        }
        self.matches[dim] = Some(matches);
        Ok(())
    }

    pub fn get_matches(&self, dim: usize) -> Option<&Matches> {
        self.matches.get(dim).and_then(|m| m.as_ref())
    }

    /// True when any dimension carries periodic matches on this rank.
    pub fn is_periodic(&self) -> bool {
        self.matches.iter().any(|m| m.is_some())
    }
}
