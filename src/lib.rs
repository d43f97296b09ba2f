#![cfg_attr(docsrs, feature(doc_cfg))]
//! # mesh-migrate
//!
//! mesh-migrate redistributes distributed unstructured simplex meshes across
//! processes. Given, for every element a rank should end up with, the old
//! owner the element is copied from, it moves every entity of every
//! dimension, renumbers it, re-elects owners, and carries tags and periodic
//! matches along. Global IDs (the `"global"` tag) survive unchanged.
//!
//! ## Features
//! - [`Dist`](algs::dist::Dist), an invertible all-to-all communication
//!   pattern between roots on one side and items on the other
//! - Owner deduplication and reconstruction of downward connectivity
//! - Ownership policies per [`PartitionMode`](config::PartitionMode)
//! - Pluggable communication backends: in-process threads (`ThreadComm`)
//!   and MPI (`mpi-support` feature)
//! - Rayon-parallel per-entity loops (`rayon` feature, on by default)
//!
//! ## Usage
//! ```toml
//! [dependencies]
//! mesh-migrate = "0.1"
//! # features = ["mpi-support"]
//! ```
//!
//! All migration entry points are collective: every rank of the
//! communicator must call them in the same order.

pub mod algs;
pub mod config;
pub mod data;
pub mod mesh;
pub mod mesh_error;
pub mod topology;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::algs::communicator::{Communicator, ThreadComm};
    #[cfg(feature = "mpi-support")]
    pub use crate::algs::communicator::MpiComm;
    pub use crate::algs::dist::{Dist, DistBuilder};
    pub use crate::algs::meshgen::{build_box, build_from_elems2verts};
    pub use crate::algs::migrate::{migrate_mesh, migrate_mesh_with};
    pub use crate::config::{MigrateOptions, PartitionMode};
    pub use crate::data::tag::{ScalarKind, Tag, TagData};
    pub use crate::mesh::{GLOBAL_TAG, GlobalId, Mesh};
    pub use crate::mesh_error::MeshError;
    pub use crate::topology::adj::Adj;
    pub use crate::topology::family::Family;
    pub use crate::topology::ownership::{Remote, Remotes};
    pub use crate::topology::periodic::Matches;
}
