//! Serial simplex mesh construction for tests, demos and benchmarks.
//!
//! [`build_from_elems2verts`] derives every intermediate dimension from the
//! element-to-vertex connectivity and numbers entities in first-seen order.
//! [`build_box`] generates a structured unit square or cube on rank 0;
//! the other ranks receive empty meshes so that all ranks can migrate it.

use crate::algs::communicator::Communicator;
use crate::data::tag::TagData;
use crate::mesh::{GLOBAL_TAG, GlobalId, Mesh, VERT};
use crate::mesh_error::MeshError;
use crate::topology::adj::Adj;
use crate::topology::family::Family;
use hashbrown::HashMap;

const TRI_EDGES: [[usize; 2]; 3] = [[0, 1], [1, 2], [2, 0]];
const TET_FACES: [[usize; 3]; 4] = [[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]];

/// Orientation code of `local` relative to the stored vertex order of the
/// same entity: rotation in the upper bits, flip in bit 0.
fn align_code(local: &[usize], stored: &[usize]) -> i8 {
    let n = local.len();
    // an edge has no rotation distinct from its flip
    let nrot = if n == 2 { 1 } else { n };
    for flip in [false, true] {
        for rot in 0..nrot {
            let matches = (0..n).all(|i| {
                let j = if flip { n - 1 - i } else { i };
                local[(j + rot) % n] == stored[i]
            });
            if matches {
                return ((rot as i8) << 1) | i8::from(flip);
            }
        }
    }
    0
}

/// Derive the boundary entities of `high` simplices of dimension `high_dim`.
///
/// Returns the low entities' vertices (first-seen order, first-seen
/// orientation) and the high-to-low adjacency with orientation codes.
fn derive_facets(high: &[usize], high_dim: usize) -> (Vec<usize>, Adj) {
    let templates: &[&[usize]] = match high_dim {
        2 => &[&TRI_EDGES[0], &TRI_EDGES[1], &TRI_EDGES[2]],
        _ => &[&TET_FACES[0], &TET_FACES[1], &TET_FACES[2], &TET_FACES[3]],
    };
    let nhigh_verts = high_dim + 1;
    let mut ids: HashMap<Vec<usize>, usize> = HashMap::new();
    let mut low_verts = Vec::new();
    let mut ab2b = Vec::with_capacity(high.len() / nhigh_verts * templates.len());
    let mut codes = Vec::with_capacity(ab2b.capacity());
    for verts in high.chunks_exact(nhigh_verts) {
        for template in templates {
            let local: Vec<usize> = template.iter().map(|&i| verts[i]).collect();
            let mut key = local.clone();
            key.sort_unstable();
            let next = ids.len();
            let id = *ids.entry(key).or_insert(next);
            if id == next {
                low_verts.extend_from_slice(&local);
            }
            let stored = &low_verts[id * high_dim..(id + 1) * high_dim];
            ab2b.push(id);
            codes.push(align_code(&local, stored));
        }
    }
    (low_verts, Adj::with_codes(ab2b, codes))
}

/// Serial simplex mesh of dimension `dim` from element-to-vertex connectivity.
///
/// Every dimension gets an identity `"global"` tag and every entity is owned
/// by the calling rank.
pub fn build_from_elems2verts<C: Communicator>(
    comm: C,
    dim: usize,
    elems2verts: &[usize],
    nverts: usize,
) -> Result<Mesh<C>, MeshError> {
    let mut mesh = Mesh::new(comm, Family::Simplex, dim)?;
    if elems2verts.len() % (dim + 1) != 0 {
        return Err(MeshError::InvalidMesh(format!(
            "{} element vertices is not a multiple of {}",
            elems2verts.len(),
            dim + 1
        )));
    }
    if let Some(&v) = elems2verts.iter().find(|&&v| v >= nverts) {
        return Err(MeshError::InvalidMesh(format!(
            "element vertex {v} out of range for {nverts} vertices"
        )));
    }

    let mut ents2verts = elems2verts.to_vec();
    for d in (2..=dim).rev() {
        let (low2verts, down) = derive_facets(&ents2verts, d);
        mesh.set_ents(d, down)?;
        ents2verts = low2verts;
    }
    mesh.set_ents(1, Adj::new(ents2verts))?;
    mesh.set_verts(nverts);

    for d in VERT..=dim {
        let globals: Vec<GlobalId> = (0..mesh.nents(d) as GlobalId).collect();
        mesh.add_tag(d, GLOBAL_TAG, 1, TagData::I64(globals))?;
    }
    log::trace!(
        "built simplex mesh of dimension {dim}: {} elements, {} vertices",
        mesh.nelems(),
        mesh.nverts()
    );
    Ok(mesh)
}

/// Unit square (`dim == 2`) or cube (`dim == 3`) split into `n` intervals per
/// axis, triangulated with two triangles per square or six tetrahedra per
/// cube. Vertex coordinates are stored in the `"coordinates"` tag. Only rank
/// 0 holds entities.
pub fn build_box<C: Communicator>(comm: C, dim: usize, n: usize) -> Result<Mesh<C>, MeshError> {
    if !(2..=3).contains(&dim) || n == 0 {
        return Err(MeshError::InvalidMesh(format!(
            "box of dimension {dim} with {n} intervals"
        )));
    }
    if comm.rank() != 0 {
        let mut mesh = build_from_elems2verts(comm, dim, &[], 0)?;
        mesh.add_tag(VERT, "coordinates", dim, TagData::F64(Vec::new()))?;
        return Ok(mesh);
    }

    let np = n + 1;
    let vert = |i: usize, j: usize, k: usize| i + np * (j + np * k);
    let mut elems2verts = Vec::new();
    let mut coords = Vec::new();
    let h = 1.0 / n as f64;
    if dim == 2 {
        for j in 0..np {
            for i in 0..np {
                coords.extend_from_slice(&[i as f64 * h, j as f64 * h]);
            }
        }
        for j in 0..n {
            for i in 0..n {
                let [v0, v1, v2, v3] =
                    [vert(i, j, 0), vert(i + 1, j, 0), vert(i, j + 1, 0), vert(i + 1, j + 1, 0)];
                elems2verts.extend_from_slice(&[v0, v1, v3, v0, v3, v2]);
            }
        }
    } else {
        for k in 0..np {
            for j in 0..np {
                for i in 0..np {
                    coords.extend_from_slice(&[i as f64 * h, j as f64 * h, k as f64 * h]);
                }
            }
        }
        const AXES: [[usize; 3]; 6] = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];
        for k in 0..n {
            for j in 0..n {
                for i in 0..n {
                    for axes in AXES {
                        // walk from the low corner to the high corner one axis at a time
                        let mut corner = [i, j, k];
                        elems2verts.push(vert(corner[0], corner[1], corner[2]));
                        for axis in axes {
                            corner[axis] += 1;
                            elems2verts.push(vert(corner[0], corner[1], corner[2]));
                        }
                    }
                }
            }
        }
    }
    let nverts = coords.len() / dim;
    let mut mesh = build_from_elems2verts(comm, dim, &elems2verts, nverts)?;
    mesh.add_tag(VERT, "coordinates", dim, TagData::F64(coords))?;
    Ok(mesh)
}
