//! Owner deduplication and reconstruction of downward connectivity.
//!
//! When high-dimensional entities move, each of their downward uses still
//! names the *old* owner of the low entity it references. These routines
//! collapse those uses to one copy per (old owner, destination rank) and
//! then tell every new use which local index its low entity received.

use crate::algs::communicator::Communicator;
use crate::algs::dist::{Dist, DistBuilder};
use crate::algs::parallel::parallel_map;
use crate::mesh::GlobalId;
use crate::mesh_error::MeshError;

/// Invert `uses2old_owners` and keep, per old owner, the first use headed
/// to each distinct rank.
///
/// The result maps old owners to unique uses; on every destination rank the
/// unique uses are numbered by ascending `old_owner_globals`. Applying the
/// reduction to its own inverse changes nothing. Collective.
pub fn get_old_owners2uniq_uses<C: Communicator>(
    uses2old_owners: &Dist<C>,
    old_owner_globals: &[GlobalId],
) -> Result<Dist<C>, MeshError> {
    let old_owners2uses = uses2old_owners.invert();
    let nowners = old_owners2uses.nroots();
    if old_owner_globals.len() != nowners {
        return Err(MeshError::SizeMismatch {
            what: "old owner globals",
            expected: nowners,
            actual: old_owner_globals.len(),
        });
    }
    let owners2uses = old_owners2uses.roots2items();
    let uses2ranks = old_owners2uses.items2ranks();
    let owners2uniq_ranks = parallel_map(nowners, |owner| {
        let mut seen: Vec<usize> = Vec::new();
        for &rank in &uses2ranks[owners2uses[owner]..owners2uses[owner + 1]] {
            if !seen.contains(&rank) {
                seen.push(rank);
            }
        }
        seen
    });
    let mut offsets = Vec::with_capacity(nowners + 1);
    offsets.push(0);
    let mut uniq2ranks = Vec::new();
    for ranks in owners2uniq_ranks {
        uniq2ranks.extend(ranks);
        offsets.push(uniq2ranks.len());
    }
    DistBuilder::new(old_owners2uses.comm().clone())
        .set_dest_ranks(uniq2ranks)
        .set_roots2items(offsets)
        .set_dest_globals(old_owner_globals.to_vec())
        .build()
}

/// New copies to their old owners; the inverse of [`get_old_owners2uniq_uses`].
pub fn get_new_copies2old_owners<C: Communicator>(
    uses2old_owners: &Dist<C>,
    old_owner_globals: &[GlobalId],
) -> Result<Dist<C>, MeshError> {
    Ok(get_old_owners2uniq_uses(uses2old_owners, old_owner_globals)?.invert())
}

/// New local index of the entity referenced by every new use.
///
/// `new_ents2old_owners` places the new entities at their old owners and
/// `old_owners2new_uses` routes from the same old owners to the uses. For
/// every use the old owner picks the served copy living on the use's rank.
/// Collective.
pub fn form_new_conn<C: Communicator>(
    new_ents2old_owners: &Dist<C>,
    old_owners2new_uses: &Dist<C>,
) -> Result<Vec<usize>, MeshError> {
    let nnew_ents = new_ents2old_owners.nroots();
    let iota: Vec<u64> = (0..nnew_ents as u64).collect();
    let serv_copies2new_idxs = new_ents2old_owners.exch(&iota, 1)?;
    let old_owners2new_ents = new_ents2old_owners.invert();
    let serv_copies2ranks = old_owners2new_ents.items2ranks();
    let serv_owners2copies = old_owners2new_ents.roots2items();
    let uses2ranks = old_owners2new_uses.items2ranks();
    let owners2uses = old_owners2new_uses.roots2items();
    let nowners = old_owners2new_uses.nroots();
    if serv_owners2copies.len() != nowners + 1 {
        return Err(MeshError::SizeMismatch {
            what: "served owners",
            expected: nowners,
            actual: serv_owners2copies.len() - 1,
        });
    }

    let per_owner = parallel_map(nowners, |owner| {
        let copies = serv_owners2copies[owner]..serv_owners2copies[owner + 1];
        (owners2uses[owner]..owners2uses[owner + 1])
            .map(|u| {
                let rank = uses2ranks[u];
                copies
                    .clone()
                    .find(|&c| serv_copies2ranks[c] == rank)
                    .map(|c| serv_copies2new_idxs[c])
                    .ok_or(MeshError::MissingServedCopy { owner, rank })
            })
            .collect::<Result<Vec<u64>, MeshError>>()
    });
    let mut uses2new_idxs = Vec::with_capacity(old_owners2new_uses.nitems());
    for answers in per_owner {
        uses2new_idxs.extend(answers?);
    }

    let new_idxs = old_owners2new_uses
        .without_roots()
        .exch(&uses2new_idxs, 1)?;
    Ok(new_idxs.into_iter().map(|i| i as usize).collect())
}
