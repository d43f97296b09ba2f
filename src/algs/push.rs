//! Per-dimension migration steps: connectivity, tags and ownership.

use crate::algs::communicator::Communicator;
use crate::algs::dist::Dist;
use crate::algs::exchange::allreduce_max;
use crate::algs::owners::update_ownership;
use crate::algs::reconnect::{form_new_conn, get_old_owners2uniq_uses};
use crate::algs::wire::WireRemote;
use crate::config::{OwnerPolicy, PartitionMode};
use crate::data::tag::TagData;
use crate::mesh::Mesh;
use crate::mesh_error::MeshError;
use crate::topology::adj::Adj;
use crate::topology::ownership::Remotes;

/// Owner of the low entity behind every downward use of `high_dim`, laid
/// out high-entity major.
pub fn form_down_use_owners<C: Communicator>(
    mesh: &Mesh<C>,
    high_dim: usize,
    low_dim: usize,
) -> Result<Remotes, MeshError> {
    let uses2lows = &mesh.ask_down(high_dim, low_dim)?.ab2b;
    mesh.ask_owners(low_dim).unmap(uses2lows)
}

/// Build the downward adjacency of the new `high_dim` entities.
///
/// Returns the new adjacency together with the pattern from old low owners
/// to the new low entities, which drives the next lower dimension.
/// Collective.
pub fn push_down<C: Communicator>(
    old_mesh: &Mesh<C>,
    high_dim: usize,
    low_dim: usize,
    old_high_owners2new_highs: &Dist<C>,
) -> Result<(Adj, Dist<C>), MeshError> {
    let comm = old_mesh.comm();
    let deg = old_mesh.family().degree(high_dim, low_dim);
    let old_down = old_mesh.ask_down(high_dim, low_dim)?;

    let old_use_owners: Vec<WireRemote> = form_down_use_owners(old_mesh, high_dim, low_dim)?
        .iter()
        .map(WireRemote::from)
        .collect();
    let new_use_owners: Remotes = old_high_owners2new_highs
        .exch(&old_use_owners, deg)?
        .iter()
        .map(|w| {
            w.remote()
                .ok_or_else(|| MeshError::InvalidMesh("downward use without an owner".into()))
        })
        .collect::<Result<_, _>>()?;

    let new_uses2old_owners =
        Dist::from_remotes(comm.clone(), &new_use_owners, old_mesh.nents(low_dim))?;
    let old_low_owners2new_lows =
        get_old_owners2uniq_uses(&new_uses2old_owners, old_mesh.globals(low_dim)?)?;
    let new_lows2old_owners = old_low_owners2new_lows.invert();
    let old_low_owners2new_uses = new_uses2old_owners.invert();
    let new_ab2b = form_new_conn(&new_lows2old_owners, &old_low_owners2new_uses)?;

    // ranks without entities carry no codes, so agree before exchanging
    let has_codes = allreduce_max(comm, u64::from(old_down.codes.is_some()))? > 0;
    let new_down = if has_codes {
        let old_codes = match &old_down.codes {
            Some(codes) => codes.clone(),
            None => vec![0; old_down.ab2b.len()],
        };
        Adj::with_codes(new_ab2b, old_high_owners2new_highs.exch(&old_codes, deg)?)
    } else {
        Adj::new(new_ab2b)
    };
    Ok((new_down, old_low_owners2new_lows))
}

/// Move every tag of `dim` to the new entities, keeping name, width and kind.
/// Collective.
pub fn push_tags<C: Communicator>(
    old_mesh: &Mesh<C>,
    new_mesh: &mut Mesh<C>,
    dim: usize,
    old_owners2new_ents: &Dist<C>,
) -> Result<(), MeshError> {
    if old_owners2new_ents.nroots() != old_mesh.nents(dim) {
        return Err(MeshError::SizeMismatch {
            what: "old owners of migrated entities",
            expected: old_mesh.nents(dim),
            actual: old_owners2new_ents.nroots(),
        });
    }
    for tag in old_mesh.tags(dim) {
        let width = tag.ncomps();
        let data = match tag.data() {
            TagData::I8(v) => TagData::I8(old_owners2new_ents.exch(v, width)?),
            TagData::I32(v) => TagData::I32(old_owners2new_ents.exch(v, width)?),
            TagData::I64(v) => TagData::I64(old_owners2new_ents.exch(v, width)?),
            TagData::F64(v) => TagData::F64(old_owners2new_ents.exch(v, width)?),
        };
        new_mesh.add_tag(dim, tag.name(), width, data)?;
    }
    Ok(())
}

/// Tags, then ownership, of the new `dim` entities. Collective.
pub fn push_ents<C: Communicator>(
    old_mesh: &Mesh<C>,
    new_mesh: &mut Mesh<C>,
    dim: usize,
    new_ents2old_owners: &Dist<C>,
    old_owners2new_ents: &Dist<C>,
    mode: PartitionMode,
) -> Result<(), MeshError> {
    push_tags(old_mesh, new_mesh, dim, old_owners2new_ents)?;
    let own_ranks = match mode.policy(dim) {
        OwnerPolicy::Preserve => {
            let old_ranks: Vec<u64> = old_mesh
                .ask_owners(dim)
                .ranks
                .iter()
                .map(|&r| r as u64)
                .collect();
            Some(old_owners2new_ents.exch(&old_ranks, 1)?)
        }
        OwnerPolicy::Fresh => None,
    };
    let owners = update_ownership(new_ents2old_owners, own_ranks.as_deref())?;
    new_mesh.set_owners(dim, owners)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::ThreadComm;
    use crate::algs::meshgen::build_from_elems2verts;

    #[test]
    fn down_use_owners_follow_adjacency() {
        let comm = ThreadComm::solo();
        let mesh = build_from_elems2verts(comm, 2, &[0, 1, 2, 1, 3, 2], 4).unwrap();
        let owners = form_down_use_owners(&mesh, 1, 0).unwrap();
        assert_eq!(owners.len(), mesh.nents(1) * 2);
        assert!(owners.iter().all(|r| r.rank == 0));
        assert_eq!(owners.idxs, mesh.ask_down(1, 0).unwrap().ab2b);
    }

    #[test]
    fn identity_push_reproduces_triangles() {
        let comm = ThreadComm::solo();
        let mesh = build_from_elems2verts(comm.clone(), 2, &[0, 1, 2, 1, 3, 2], 4).unwrap();
        let to_self = Dist::identity(comm, mesh.nents(2)).unwrap();
        let (tris, edges2new) = push_down(&mesh, 2, 1, &to_self).unwrap();
        assert_eq!(tris.ab2b, mesh.ask_down(2, 1).unwrap().ab2b);
        assert_eq!(edges2new.nroots(), mesh.nents(1));
        assert_eq!(edges2new.invert().nroots(), mesh.nents(1));
    }

    #[test]
    fn tags_require_matching_root_count() {
        let comm = ThreadComm::solo();
        let mesh = build_from_elems2verts(comm.clone(), 2, &[0, 1, 2], 3).unwrap();
        let mut shell = mesh.copy_meta();
        let wrong = Dist::identity(comm, 2).unwrap();
        assert!(matches!(
            push_tags(&mesh, &mut shell, 0, &wrong),
            Err(MeshError::SizeMismatch { .. })
        ));
    }
}
