//! Element families and their fixed downward degrees.

use serde::{Deserialize, Serialize};

/// Topological family shared by every element of a mesh.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum Family {
    /// Vertices, edges, triangles, tetrahedra.
    #[default]
    Simplex,
    /// Vertices, edges, quadrilaterals, hexahedra.
    Hypercube,
}

const SIMPLEX_DEGREES: [[usize; 4]; 4] = [
    [1, 0, 0, 0],
    [2, 1, 0, 0],
    [3, 3, 1, 0],
    [4, 6, 4, 1],
];

const HYPERCUBE_DEGREES: [[usize; 4]; 4] = [
    [1, 0, 0, 0],
    [2, 1, 0, 0],
    [4, 4, 1, 0],
    [8, 12, 6, 1],
];

/// Number of `low_dim` entities adjacent to one `high_dim` entity.
///
/// Returns 0 for `low_dim > high_dim` or dimensions above 3.
pub const fn element_degree(family: Family, high_dim: usize, low_dim: usize) -> usize {
    if high_dim > 3 || low_dim > high_dim {
        return 0;
    }
    match family {
        Family::Simplex => SIMPLEX_DEGREES[high_dim][low_dim],
        Family::Hypercube => HYPERCUBE_DEGREES[high_dim][low_dim],
    }
}

impl Family {
    pub const fn degree(self, high_dim: usize, low_dim: usize) -> usize {
        element_degree(self, high_dim, low_dim)
    }
}
