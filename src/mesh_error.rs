//! MeshError: unified error type for mesh-migrate public APIs
//!
//! Every fallible operation of the crate (communication patterns, mesh
//! mutation, migration) reports through this enum. A migration that returns
//! an error never installs its partially built mesh.

use thiserror::Error;

/// Unified error type for mesh-migrate operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MeshError {
    /// A point-to-point message was lost, truncated or timed out.
    #[error("communication with rank {neighbor} failed: {message}")]
    CommError { neighbor: usize, message: String },
    /// A destination rank does not exist in the communicator.
    #[error("rank {rank} is outside a communicator of size {size}")]
    RankOutOfRange { rank: usize, size: usize },
    /// An input array does not have the length its layout requires.
    #[error("{what}: expected {expected} values, got {actual}")]
    SizeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    /// A destination index is not below the root count declared by its destination.
    #[error("destination index {idx} is out of range for {nroots} roots on rank {rank}")]
    DestIndexOutOfRange { rank: usize, idx: usize, nroots: usize },
    /// A CSR offset array is not a valid roots-to-items layout.
    #[error("invalid roots-to-items offsets: {0}")]
    InvalidOffsets(String),
    /// A dimension outside `0..=mesh_dim` (or a non-adjacent pair) was requested.
    #[error("dimension {dim} is invalid for a mesh of dimension {mesh_dim}")]
    InvalidDimension { dim: usize, mesh_dim: usize },
    /// The requested downward adjacency has not been installed.
    #[error("no adjacency from dimension {high} to dimension {low}")]
    MissingAdjacency { high: usize, low: usize },
    /// A required tag is absent.
    #[error("dimension {dim} has no tag named `{name}`")]
    MissingTag { dim: usize, name: String },
    /// A tag exists but stores a different scalar kind.
    #[error("tag `{name}` on dimension {dim} stores {actual}, expected {expected}")]
    TagKindMismatch {
        dim: usize,
        name: String,
        expected: &'static str,
        actual: &'static str,
    },
    /// A use was routed to a rank that received no copy of its old owner.
    #[error("old owner {owner} has no served copy on rank {rank}")]
    MissingServedCopy { owner: usize, rank: usize },
    /// Owner preservation was requested but the old owner rank kept no copy.
    #[error("old owner {owner} has no new copy on its preserved owner rank {rank}")]
    MissingPreservedOwner { owner: usize, rank: usize },
    /// Structural problem in mesh input.
    #[error("invalid mesh: {0}")]
    InvalidMesh(String),
}
