#![allow(dead_code)]
use mesh_migrate::prelude::*;

/// Two tetrahedra sharing the face {1, 2, 3}.
pub const TWO_TETS: [usize; 8] = [0, 1, 2, 3, 1, 2, 3, 4];

/// `TWO_TETS` on rank 0 and empty meshes elsewhere, with a vertex and an
/// element tag whose values derive from global IDs.
pub fn two_tets(comm: ThreadComm) -> Mesh<ThreadComm> {
    let (elems, nverts) = if comm.rank() == 0 {
        (&TWO_TETS[..], 5)
    } else {
        (&[][..], 0)
    };
    let mut mesh = build_from_elems2verts(comm, 3, elems, nverts).unwrap();
    let temps = mesh.globals(0).unwrap().iter().map(|&g| g as f64 * 1.5).collect();
    mesh.add_tag(0, "temperature", 1, TagData::F64(temps)).unwrap();
    let class = mesh
        .globals(3)
        .unwrap()
        .iter()
        .flat_map(|&g| [g as i32 * 10, g as i32 * 10 + 1])
        .collect();
    mesh.add_tag(3, "class", 2, TagData::I32(class)).unwrap();
    mesh
}

/// Serial copy of `TWO_TETS`, numbered by global ID.
pub fn two_tets_reference() -> Mesh<ThreadComm> {
    build_from_elems2verts(ThreadComm::solo(), 3, &TWO_TETS, 5).unwrap()
}

/// Pull the listed old elements `(rank, idx)` to this rank.
pub fn pull(comm: &ThreadComm, from: &[(usize, usize)], nold_elems: usize) -> Dist<ThreadComm> {
    let remotes: Remotes = from.iter().map(|&(rank, idx)| Remote::new(rank, idx)).collect();
    Dist::from_remotes(comm.clone(), &remotes, nold_elems).unwrap()
}

/// Keep tet 0 on rank 0 and move tet 1 to rank 1.
pub fn split(mesh: &mut Mesh<ThreadComm>) {
    let comm = mesh.comm().clone();
    let from = if comm.rank() == 0 { [(0, 0)] } else { [(0, 1)] };
    let dist = pull(&comm, &from, mesh.nelems());
    migrate_mesh(mesh, &dist, PartitionMode::ElemBased, false).unwrap();
}

/// Local index of the entity of `dim` carrying `global`.
pub fn find_global(mesh: &Mesh<ThreadComm>, dim: usize, global: GlobalId) -> Option<usize> {
    mesh.globals(dim).unwrap().iter().position(|&g| g == global)
}

/// Every downward use and orientation code of `mesh`, translated to global
/// IDs, agrees with `reference`, whose local numbering equals its globals.
pub fn assert_matches_reference(mesh: &Mesh<ThreadComm>, reference: &Mesh<ThreadComm>) {
    for d in 1..=mesh.dim() {
        let deg = mesh.family().degree(d, d - 1);
        let down = mesh.ask_down(d, d - 1).unwrap();
        let ref_down = reference.ask_down(d, d - 1).unwrap();
        let highs = mesh.globals(d).unwrap();
        let lows = mesh.globals(d - 1).unwrap();
        assert_eq!(down.ab2b.len(), mesh.nents(d) * deg);
        for (e, &g) in highs.iter().enumerate() {
            let g = g as usize;
            for k in 0..deg {
                assert_eq!(
                    lows[down.ab2b[e * deg + k]] as usize,
                    ref_down.ab2b[g * deg + k],
                    "dimension {d} entity {g} use {k}"
                );
                if let (Some(codes), Some(ref_codes)) = (&down.codes, &ref_down.codes) {
                    assert_eq!(codes[e * deg + k], ref_codes[g * deg + k]);
                }
            }
        }
    }
}
