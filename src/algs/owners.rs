//! Ownership of freshly migrated entities.

use crate::algs::communicator::Communicator;
use crate::algs::dist::Dist;
use crate::algs::parallel::parallel_map;
use crate::algs::wire::WireRemote;
use crate::mesh_error::MeshError;
use crate::topology::ownership::Remotes;

/// Elect one owner among the new copies of every old owner.
///
/// Without `own_ranks` the first served copy wins; copies arrive ordered by
/// rank, so the lowest rank holding a copy becomes the owner. With
/// `own_ranks` (one rank per new entity) the copy on that rank wins, and it
/// is an error for that rank to hold no copy. Returns one record per new
/// entity. Collective.
pub fn update_ownership<C: Communicator>(
    new_ents2old_owners: &Dist<C>,
    own_ranks: Option<&[u64]>,
) -> Result<Remotes, MeshError> {
    let nnew_ents = new_ents2old_owners.nroots();
    let old_owners2new_ents = new_ents2old_owners.invert();
    let iota: Vec<u64> = (0..nnew_ents as u64).collect();
    let serv_copies2new_idxs = new_ents2old_owners.exch(&iota, 1)?;
    let serv_copies2ranks = old_owners2new_ents.items2ranks();
    let owners2copies = old_owners2new_ents.roots2items();
    let serv_copies2own_ranks = match own_ranks {
        Some(ranks) => Some(new_ents2old_owners.exch(ranks, 1)?),
        None => None,
    };

    let nowners = old_owners2new_ents.nroots();
    let elected = parallel_map(nowners, |owner| -> Result<WireRemote, MeshError> {
        let mut copies = owners2copies[owner]..owners2copies[owner + 1];
        let chosen = match &serv_copies2own_ranks {
            None => copies.next(),
            Some(own) => {
                let Some(first) = copies.clone().next() else {
                    return Ok(WireRemote::NONE);
                };
                let rank = own[first] as usize;
                let copy = copies
                    .find(|&c| serv_copies2ranks[c] == rank)
                    .ok_or(MeshError::MissingPreservedOwner { owner, rank })?;
                Some(copy)
            }
        };
        Ok(match chosen {
            Some(c) => WireRemote::new(serv_copies2ranks[c], serv_copies2new_idxs[c] as usize),
            None => WireRemote::NONE,
        })
    });
    let owners2new_owner = elected.into_iter().collect::<Result<Vec<_>, MeshError>>()?;

    let new_owners = old_owners2new_ents.exch(&owners2new_owner, 1)?;
    new_owners
        .iter()
        .map(|w| {
            w.remote()
                .ok_or_else(|| MeshError::InvalidMesh("new entity received no owner".into()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::ThreadComm;
    use crate::topology::ownership::Remote;
    use std::time::Duration;

    /// Both ranks hold a copy of old entity 0 on rank 1; rank 0 holds a
    /// second entity copied from old entity 1 on rank 1.
    fn shared_copies(comm: ThreadComm) -> Dist<ThreadComm> {
        let remotes = if comm.rank() == 0 {
            Remotes::new(vec![1, 1], vec![1, 0]).unwrap()
        } else {
            Remotes::new(vec![1], vec![0]).unwrap()
        };
        let nroots = if comm.rank() == 1 { 2 } else { 0 };
        Dist::from_remotes(comm, &remotes, nroots).unwrap()
    }

    #[test]
    fn lowest_rank_wins_when_fresh() {
        let got = ThreadComm::run(2, |comm| {
            let dist = shared_copies(comm);
            update_ownership(&dist, None).unwrap()
        });
        assert_eq!(got[0].iter().collect::<Vec<_>>(), vec![Remote::new(0, 0), Remote::new(0, 1)]);
        assert_eq!(got[1].iter().collect::<Vec<_>>(), vec![Remote::new(0, 1)]);
    }

    #[test]
    fn preserved_rank_keeps_ownership() {
        let got = ThreadComm::run(2, |comm| {
            let own: Vec<u64> = if comm.rank() == 0 { vec![0, 1] } else { vec![1] };
            let dist = shared_copies(comm);
            update_ownership(&dist, Some(&own)).unwrap()
        });
        assert_eq!(got[0].get(0), Remote::new(0, 0));
        assert_eq!(got[0].get(1), Remote::new(1, 0));
        assert_eq!(got[1].get(0), Remote::new(1, 0));
    }

    #[test]
    fn preserved_rank_without_copy_fails() {
        let got = ThreadComm::run(2, |comm| {
            let n = if comm.rank() == 0 { 2 } else { 1 };
            let dist = shared_copies(comm.with_timeout(Duration::from_secs(2)));
            // old entity 1 was only copied to rank 0
            update_ownership(&dist, Some(&vec![1; n]))
        });
        assert_eq!(
            got[1],
            Err(MeshError::MissingPreservedOwner { owner: 1, rank: 1 })
        );
    }
}
