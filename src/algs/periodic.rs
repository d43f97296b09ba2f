//! Carry periodic matches across a migration.
//!
//! A match pairs a leaf entity with a root entity, addressed at the root's
//! owning copy. After migration, every new copy of a leaf must name the new
//! owning copy of its root. The root's new owner is known at the root's old
//! owner; the old owner of the leaf fetches it there and then forwards it
//! to all new copies of the leaf.

use crate::algs::communicator::Communicator;
use crate::algs::dist::Dist;
use crate::algs::wire::WireRemote;
use crate::mesh::Mesh;
use crate::mesh_error::MeshError;
use crate::topology::ownership::{Remote, Remotes};
use crate::topology::periodic::Matches;

/// Re-express the `dim` matches of `old_mesh` on `new_mesh`, whose owners of
/// `dim` must already be set. Collective.
pub fn push_matches<C: Communicator>(
    old_mesh: &Mesh<C>,
    new_mesh: &mut Mesh<C>,
    dim: usize,
    new_ents2old_owners: &Dist<C>,
    old_owners2new_ents: &Dist<C>,
) -> Result<(), MeshError> {
    let comm = old_mesh.comm();
    let rank = comm.rank();
    let nold = old_mesh.nents(dim);

    // new owner of every old owned entity, NONE where no copy survived
    let new_owners: Vec<WireRemote> = new_mesh
        .ask_owners(dim)
        .iter()
        .map(WireRemote::from)
        .collect();
    let serv_copies2new_owners = new_ents2old_owners.exch(&new_owners, 1)?;
    let owners2copies = old_owners2new_ents.roots2items();
    let old2new_owner: Vec<WireRemote> = (0..nold)
        .map(|e| {
            let first = owners2copies[e];
            if first < owners2copies[e + 1] {
                serv_copies2new_owners[first]
            } else {
                WireRemote::NONE
            }
        })
        .collect();

    // owned leaves fetch the new owner of their root
    let old_owners = old_mesh.ask_owners(dim);
    let mut leaves = Vec::new();
    let mut leaf_roots = Remotes::default();
    let mut skipped = 0usize;
    if let Some(matches) = old_mesh.get_matches(dim) {
        for (leaf, root) in matches.pairs() {
            if root == Remote::new(rank, leaf) {
                continue;
            }
            if old_owners.get(leaf) != Remote::new(rank, leaf) {
                skipped += 1;
                continue;
            }
            leaves.push(leaf);
            leaf_roots.ranks.push(root.rank);
            leaf_roots.idxs.push(root.idx);
        }
    }
    if skipped > 0 {
        log::warn!(
            "rank {rank}: {skipped} periodic leaves of dimension {dim} are not owned here and were left to their owners"
        );
    }
    let leaves2roots = Dist::from_remotes(comm.clone(), &leaf_roots, nold)?;
    let fetched = leaves2roots.invert().exch(&old2new_owner, 1)?;

    // forward to every new copy of each leaf
    let mut old2leaf_root = vec![WireRemote::NONE; nold];
    for (&leaf, &root) in leaves.iter().zip(&fetched) {
        old2leaf_root[leaf] = root;
    }
    let new2leaf_root = old_owners2new_ents.exch(&old2leaf_root, 1)?;
    let mut new_leaves = Vec::new();
    let mut new_roots = Remotes::default();
    for (leaf, root) in new2leaf_root.iter().enumerate() {
        if let Some(root) = root.remote() {
            new_leaves.push(leaf);
            new_roots.ranks.push(root.rank);
            new_roots.idxs.push(root.idx);
        }
    }
    log::debug!(
        "rank {rank}: {} periodic matches of dimension {dim} after migration",
        new_leaves.len()
    );
    new_mesh.set_matches(dim, Matches::new(new_leaves, new_roots)?)
}
