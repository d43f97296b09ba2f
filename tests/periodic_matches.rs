mod util;

use mesh_migrate::prelude::*;
use util::*;

type Pairs = Vec<(usize, Remote)>;

fn pairs(mesh: &Mesh<ThreadComm>, dim: usize) -> Pairs {
    mesh.get_matches(dim)
        .map(|m| m.pairs().collect())
        .unwrap_or_default()
}

/// Unit square of two triangles, periodic in x: vertices 1 -> 0 and 3 -> 2,
/// edge {1, 3} -> edge {2, 0}. Triangle 0 stays on rank 0, triangle 1 moves
/// to rank 1.
fn split_periodic_square() -> Vec<(Pairs, Pairs, Vec<GlobalId>)> {
    ThreadComm::run(2, |comm| {
        let mut mesh = build_box(comm.clone(), 2, 1).unwrap();
        if comm.rank() == 0 {
            assert_eq!(mesh.ask_down(1, 0).unwrap().uses(1, 2), &[1, 3]);
            assert_eq!(mesh.ask_down(1, 0).unwrap().uses(4, 2), &[2, 0]);
            let verts = Matches::new(vec![1, 3], Remotes::new(vec![0, 0], vec![0, 2]).unwrap());
            mesh.set_matches(0, verts.unwrap()).unwrap();
            let edges = Matches::new(vec![1], Remotes::new(vec![0], vec![4]).unwrap());
            mesh.set_matches(1, edges.unwrap()).unwrap();
        }
        let from = if comm.rank() == 0 { [(0, 0)] } else { [(0, 1)] };
        let dist = pull(&comm, &from, mesh.nelems());
        migrate_mesh(&mut mesh, &dist, PartitionMode::ElemBased, false).unwrap();
        (pairs(&mesh, 0), pairs(&mesh, 1), mesh.globals(0).unwrap().to_vec())
    })
}

#[test]
fn vertex_matches_name_new_root_owners() {
    let got = split_periodic_square();
    assert_eq!(got[0].2, vec![0, 1, 3]);
    assert_eq!(got[1].2, vec![0, 2, 3]);
    // vertex 1 -> vertex 0 (owned by rank 0); vertex 3 -> vertex 2 (only on rank 1)
    assert_eq!(got[0].0, vec![(1, Remote::new(0, 0)), (2, Remote::new(1, 1))]);
    // the ghost copy of vertex 3 on rank 1 learns its root as well
    assert_eq!(got[1].0, vec![(2, Remote::new(1, 1))]);
}

#[test]
fn edge_matches_follow_their_leaf() {
    let got = split_periodic_square();
    // edge {1, 3} stays on rank 0 as edge 1; edge {2, 0} is edge 2 on rank 1
    assert_eq!(got[0].1, vec![(1, Remote::new(1, 2))]);
    assert!(got[1].1.is_empty());
}

#[test]
fn non_periodic_meshes_stay_non_periodic() {
    let got = ThreadComm::run(2, |comm| {
        let mut mesh = two_tets(comm.clone());
        split(&mut mesh);
        mesh.is_periodic()
    });
    assert_eq!(got, vec![false, false]);
}
