//! Dist: an invertible, reusable distributed communication pattern.
//!
//! A `Dist` relates *roots* on one side to *items* on the other. On the
//! forward side every item has one destination `(rank, index)`; roots group
//! consecutive items through a CSR offset array. The reverse side holds the
//! same items as they arrived at their destinations, grouped under the
//! destination roots.
//!
//! Setup is collective and happens once, in [`DistBuilder::build`]. The
//! resulting `Dist` is immutable and cheap to clone; [`Dist::invert`] swaps
//! the two sides without communication.
//!
//! Items arrive on the reverse side ordered by source rank, then by their
//! position among the items that source sent. Under a destination root
//! items keep that order, so "first item of a root" always means "copy from
//! the lowest rank".

use crate::algs::communicator::Communicator;
use crate::algs::exchange::{CONTENT_TAG, SIZE_TAG, exchange_content, exchange_counts};
use crate::mesh::GlobalId;
use crate::mesh_error::MeshError;
use crate::topology::ownership::Remotes;
use bytemuck::Pod;
use itertools::Itertools;
use std::fmt;
use std::sync::Arc;

const F: usize = 0;
const R: usize = 1;

/// One side of a [`Dist`].
#[derive(Clone, Debug, Default)]
struct Side {
    /// CSR offsets from roots to items; `None` means one root per item.
    roots2items: Option<Vec<usize>>,
    /// Position of each item in message-ordered content.
    items2content: Vec<usize>,
    msgs2ranks: Vec<usize>,
    msgs2content: Vec<usize>,
}

impl Side {
    fn nitems(&self) -> usize {
        self.items2content.len()
    }

    fn nroots(&self) -> usize {
        match &self.roots2items {
            Some(r2i) => r2i.len() - 1,
            None => self.nitems(),
        }
    }

    fn ncontent(&self) -> usize {
        self.msgs2content.last().copied().unwrap_or(0)
    }
}

fn offset_scan(degrees: &[usize]) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(degrees.len() + 1);
    let mut total = 0;
    offsets.push(0);
    for &d in degrees {
        total += d;
        offsets.push(total);
    }
    offsets
}

fn validate_offsets(offsets: &[usize], nitems: usize) -> Result<(), MeshError> {
    match (offsets.first(), offsets.last()) {
        (Some(0), Some(&last)) if last == nitems => {}
        _ => {
            return Err(MeshError::InvalidOffsets(format!(
                "offsets must start at 0 and end at {nitems}"
            )));
        }
    }
    if offsets.windows(2).any(|w| w[0] > w[1]) {
        return Err(MeshError::InvalidOffsets("offsets must not decrease".into()));
    }
    Ok(())
}

/// Group content positions under their roots, keeping content order per root.
fn group_by_roots(content2roots: &[usize], nroots: usize) -> (Vec<usize>, Vec<usize>) {
    let mut degrees = vec![0; nroots];
    for &r in content2roots {
        degrees[r] += 1;
    }
    let offsets = offset_scan(&degrees);
    let mut next = offsets[..nroots].to_vec();
    let mut items2content = vec![0; content2roots.len()];
    for (c, &r) in content2roots.iter().enumerate() {
        items2content[next[r]] = c;
        next[r] += 1;
    }
    (offsets, items2content)
}

/// Ship `content` (message ordered, `width` records per item) from `from` to `to`.
fn alltoallv<C: Communicator, T: Pod>(
    comm: &C,
    from: &Side,
    to: &Side,
    content: &[T],
    width: usize,
) -> Result<Vec<T>, MeshError> {
    let sends: Vec<(usize, &[T])> = from
        .msgs2ranks
        .iter()
        .enumerate()
        .map(|(m, &rank)| {
            let span = from.msgs2content[m] * width..from.msgs2content[m + 1] * width;
            (rank, &content[span])
        })
        .collect();
    let recvs: Vec<(usize, usize)> = to
        .msgs2ranks
        .iter()
        .enumerate()
        .map(|(m, &rank)| (rank, (to.msgs2content[m + 1] - to.msgs2content[m]) * width))
        .collect();
    exchange_content(comm, CONTENT_TAG, &sends, &recvs)
}

#[derive(Clone, Debug, Default)]
enum DestAddress {
    #[default]
    Unset,
    Idxs {
        idxs: Vec<usize>,
        nroots: usize,
    },
    Globals(Vec<GlobalId>),
}

/// Collects the description of a [`Dist`]; `build` performs the collective setup.
///
/// Every rank of the communicator must call `build` on its builder, in the
/// same order relative to all other collective operations.
pub struct DistBuilder<C> {
    comm: C,
    dest_ranks: Vec<usize>,
    roots2items: Option<Vec<usize>>,
    address: DestAddress,
}

impl<C: Communicator> DistBuilder<C> {
    pub fn new(comm: C) -> Self {
        Self {
            comm,
            dest_ranks: Vec::new(),
            roots2items: None,
            address: DestAddress::Unset,
        }
    }

    /// Destination rank of every local item.
    pub fn set_dest_ranks(mut self, ranks: Vec<usize>) -> Self {
        self.dest_ranks = ranks;
        self
    }

    /// Destination root of every local item; `nroots` is the number of roots
    /// this rank hosts as a destination.
    pub fn set_dest_idxs(mut self, idxs: Vec<usize>, nroots: usize) -> Self {
        self.address = DestAddress::Idxs { idxs, nroots };
        self
    }

    /// Number destination roots by the ascending distinct global IDs each
    /// destination receives. `globals` holds one value per local root.
    pub fn set_dest_globals(mut self, globals: Vec<GlobalId>) -> Self {
        self.address = DestAddress::Globals(globals);
        self
    }

    /// CSR offsets from local roots to their items.
    pub fn set_roots2items(mut self, offsets: Vec<usize>) -> Self {
        self.roots2items = Some(offsets);
        self
    }

    pub fn build(self) -> Result<Dist<C>, MeshError> {
        let DistBuilder {
            comm,
            dest_ranks,
            roots2items,
            address,
        } = self;
        let size = comm.size();
        let nitems = dest_ranks.len();
        if let Some(&rank) = dest_ranks.iter().find(|&&r| r >= size) {
            return Err(MeshError::RankOutOfRange { rank, size });
        }
        if let Some(r2i) = &roots2items {
            validate_offsets(r2i, nitems)?;
        }

        // forward side: items sorted (stably) by destination rank
        let mut counts = vec![0usize; size];
        for &r in &dest_ranks {
            counts[r] += 1;
        }
        let starts = offset_scan(&counts);
        let mut next = starts[..size].to_vec();
        let items2content = dest_ranks
            .iter()
            .map(|&r| {
                let c = next[r];
                next[r] += 1;
                c
            })
            .collect_vec();
        let msgs2ranks = (0..size).filter(|&r| counts[r] > 0).collect_vec();
        let msgs2content = offset_scan(&msgs2ranks.iter().map(|&r| counts[r]).collect_vec());
        let fwd = Side {
            roots2items,
            items2content,
            msgs2ranks,
            msgs2content,
        };

        // reverse side: message layout from the transposed counts
        let recv_counts = exchange_counts(&comm, SIZE_TAG, &counts)?;
        let rmsgs2ranks = (0..size).filter(|&r| recv_counts[r] > 0).collect_vec();
        let rmsgs2content =
            offset_scan(&rmsgs2ranks.iter().map(|&r| recv_counts[r]).collect_vec());
        let mut rev = Side {
            roots2items: None,
            items2content: Vec::new(),
            msgs2ranks: rmsgs2ranks,
            msgs2content: rmsgs2content,
        };

        match address {
            DestAddress::Unset => {
                rev.items2content = (0..rev.ncontent()).collect();
            }
            DestAddress::Idxs { idxs, nroots } => {
                if idxs.len() != nitems {
                    return Err(MeshError::SizeMismatch {
                        what: "destination indices",
                        expected: nitems,
                        actual: idxs.len(),
                    });
                }
                let mut content = vec![0u64; nitems];
                for (item, &c) in fwd.items2content.iter().enumerate() {
                    content[c] = idxs[item] as u64;
                }
                let rcontent2rroots: Vec<usize> = alltoallv(&comm, &fwd, &rev, &content, 1)?
                    .into_iter()
                    .map(|i| i as usize)
                    .collect();
                if let Some(&idx) = rcontent2rroots.iter().find(|&&i| i >= nroots) {
                    return Err(MeshError::DestIndexOutOfRange {
                        rank: comm.rank(),
                        idx,
                        nroots,
                    });
                }
                let (offsets, ritems2content) = group_by_roots(&rcontent2rroots, nroots);
                rev.roots2items = Some(offsets);
                rev.items2content = ritems2content;
            }
            DestAddress::Globals(globals) => {
                if globals.len() != fwd.nroots() {
                    return Err(MeshError::SizeMismatch {
                        what: "destination globals",
                        expected: fwd.nroots(),
                        actual: globals.len(),
                    });
                }
                let mut content = vec![0 as GlobalId; nitems];
                match &fwd.roots2items {
                    Some(r2i) => {
                        for (root, &g) in globals.iter().enumerate() {
                            for item in r2i[root]..r2i[root + 1] {
                                content[fwd.items2content[item]] = g;
                            }
                        }
                    }
                    None => {
                        for (item, &c) in fwd.items2content.iter().enumerate() {
                            content[c] = globals[item];
                        }
                    }
                }
                let rcontent2globs = alltoallv(&comm, &fwd, &rev, &content, 1)?;
                let rroots2globs = rcontent2globs.iter().copied().sorted_unstable().dedup().collect_vec();
                let rcontent2rroots = rcontent2globs
                    .iter()
                    .map(|g| rroots2globs.binary_search(g).unwrap_or_default())
                    .collect_vec();
                let (offsets, ritems2content) =
                    group_by_roots(&rcontent2rroots, rroots2globs.len());
                rev.roots2items = Some(offsets);
                rev.items2content = ritems2content;
            }
        }

        log::trace!(
            "dist on rank {}: {} items to {} ranks, {} items from {} ranks",
            comm.rank(),
            fwd.nitems(),
            fwd.msgs2ranks.len(),
            rev.nitems(),
            rev.msgs2ranks.len()
        );

        Ok(Dist {
            comm,
            sides: [Arc::new(fwd), Arc::new(rev)],
        })
    }
}

/// Immutable distributed communication pattern; see the module docs.
#[derive(Clone)]
pub struct Dist<C> {
    comm: C,
    sides: [Arc<Side>; 2],
}

impl<C> fmt::Debug for Dist<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dist")
            .field("nroots", &self.sides[F].nroots())
            .field("nitems", &self.sides[F].nitems())
            .field("msgs2ranks", &self.sides[F].msgs2ranks)
            .finish()
    }
}

impl<C: Communicator> Dist<C> {
    /// Items addressed by `(rank, idx)` remotes; `nroots` as in
    /// [`DistBuilder::set_dest_idxs`].
    pub fn from_remotes(comm: C, remotes: &Remotes, nroots: usize) -> Result<Self, MeshError> {
        DistBuilder::new(comm)
            .set_dest_ranks(remotes.ranks.clone())
            .set_dest_idxs(remotes.idxs.clone(), nroots)
            .build()
    }

    /// Every local item maps to the local root of the same index.
    pub fn identity(comm: C, n: usize) -> Result<Self, MeshError> {
        let rank = comm.rank();
        Self::from_remotes(comm, &Remotes::identity(rank, n), n)
    }

    pub fn comm(&self) -> &C {
        &self.comm
    }

    /// Swap roots and items; no communication.
    pub fn invert(&self) -> Self {
        Self {
            comm: self.comm.clone(),
            sides: [self.sides[R].clone(), self.sides[F].clone()],
        }
    }

    /// The same pattern with forward roots dropped, so `exch` takes one
    /// record per forward item.
    pub fn without_roots(&self) -> Self {
        let mut fwd = (*self.sides[F]).clone();
        fwd.roots2items = None;
        Self {
            comm: self.comm.clone(),
            sides: [Arc::new(fwd), self.sides[R].clone()],
        }
    }

    pub fn nroots(&self) -> usize {
        self.sides[F].nroots()
    }

    pub fn nitems(&self) -> usize {
        self.sides[F].nitems()
    }

    /// CSR offsets from forward roots to forward items.
    pub fn roots2items(&self) -> Vec<usize> {
        match &self.sides[F].roots2items {
            Some(r2i) => r2i.clone(),
            None => (0..=self.nitems()).collect(),
        }
    }

    /// Destination rank of every forward item.
    pub fn items2ranks(&self) -> Vec<usize> {
        let fwd = &self.sides[F];
        let mut content2ranks = vec![0; fwd.ncontent()];
        for (m, &rank) in fwd.msgs2ranks.iter().enumerate() {
            for c in fwd.msgs2content[m]..fwd.msgs2content[m + 1] {
                content2ranks[c] = rank;
            }
        }
        fwd.items2content.iter().map(|&c| content2ranks[c]).collect()
    }

    /// Destination root index of every forward item. Collective.
    pub fn items2dest_idxs(&self) -> Result<Vec<usize>, MeshError> {
        let rev = &self.sides[R];
        let ritems2rroots: Vec<u64> = match &rev.roots2items {
            Some(r2i) => (0..rev.nroots())
                .flat_map(|root| (r2i[root]..r2i[root + 1]).map(move |_| root as u64))
                .collect(),
            None => (0..rev.nitems() as u64).collect(),
        };
        let back = self.invert().without_roots().exch(&ritems2rroots, 1)?;
        Ok(back.into_iter().map(|i| i as usize).collect())
    }

    /// Peer rank of every forward message.
    pub fn msgs2ranks(&self) -> &[usize] {
        &self.sides[F].msgs2ranks
    }

    /// CSR offsets from forward messages to content positions.
    pub fn msgs2content(&self) -> &[usize] {
        &self.sides[F].msgs2content
    }

    /// Exchange `width` records per forward root (per forward item when the
    /// forward side has no roots) and return `width` records per reverse
    /// item, in reverse-side item order. Collective.
    pub fn exch<T: Pod>(&self, data: &[T], width: usize) -> Result<Vec<T>, MeshError> {
        let fwd = &self.sides[F];
        let rev = &self.sides[R];
        let expected = fwd.nroots() * width;
        if data.len() != expected {
            return Err(MeshError::SizeMismatch {
                what: "exchanged records",
                expected,
                actual: data.len(),
            });
        }
        let mut content = vec![T::zeroed(); fwd.nitems() * width];
        match &fwd.roots2items {
            Some(r2i) => {
                for root in 0..fwd.nroots() {
                    let src = &data[root * width..(root + 1) * width];
                    for item in r2i[root]..r2i[root + 1] {
                        let c = fwd.items2content[item];
                        content[c * width..(c + 1) * width].copy_from_slice(src);
                    }
                }
            }
            None => {
                for (item, &c) in fwd.items2content.iter().enumerate() {
                    content[c * width..(c + 1) * width]
                        .copy_from_slice(&data[item * width..(item + 1) * width]);
                }
            }
        }
        let rcontent = alltoallv(&self.comm, fwd, rev, &content, width)?;
        let mut out = vec![T::zeroed(); rev.nitems() * width];
        for (item, &c) in rev.items2content.iter().enumerate() {
            out[item * width..(item + 1) * width]
                .copy_from_slice(&rcontent[c * width..(c + 1) * width]);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::ThreadComm;

    /// rank 0 items -> (1,0), (1,1), (0,0); rank 1 item -> (0,0)
    fn two_rank_dist(comm: ThreadComm) -> Dist<ThreadComm> {
        let (ranks, idxs, nroots) = if comm.rank() == 0 {
            (vec![1, 1, 0], vec![0, 1, 0], 1)
        } else {
            (vec![0], vec![0], 2)
        };
        DistBuilder::new(comm)
            .set_dest_ranks(ranks)
            .set_dest_idxs(idxs, nroots)
            .build()
            .unwrap()
    }

    #[test]
    fn exch_lands_on_destination_roots() {
        let got = ThreadComm::run(2, |comm| {
            let rank = comm.rank();
            let dist = two_rank_dist(comm);
            let data: Vec<i32> = if rank == 0 { vec![10, 20, 30] } else { vec![40] };
            let inverse = dist.invert();
            (
                dist.exch(&data, 1).unwrap(),
                inverse.roots2items(),
                inverse.items2ranks(),
                dist.items2dest_idxs().unwrap(),
            )
        });
        assert_eq!(got[0].0, vec![30, 40]);
        assert_eq!(got[0].1, vec![0, 2]);
        assert_eq!(got[0].2, vec![0, 1]);
        assert_eq!(got[0].3, vec![0, 1, 0]);
        assert_eq!(got[1].0, vec![10, 20]);
        assert_eq!(got[1].1, vec![0, 1, 2]);
        assert_eq!(got[1].2, vec![0, 0]);
        assert_eq!(got[1].3, vec![0]);
    }

    #[test]
    fn inverse_exch_expands_roots_back_to_items() {
        let got = ThreadComm::run(2, |comm| {
            let rank = comm.rank();
            let dist = two_rank_dist(comm);
            let per_root: Vec<u64> = if rank == 0 { vec![7] } else { vec![8, 9] };
            let back = dist.invert().exch(&per_root, 1).unwrap();
            (back, dist.msgs2ranks().to_vec(), dist.msgs2content().to_vec())
        });
        assert_eq!(got[0].0, vec![8, 9, 7]);
        assert_eq!(got[0].1, vec![0, 1]);
        assert_eq!(got[0].2, vec![0, 1, 3]);
        assert_eq!(got[1].0, vec![7]);
    }

    #[test]
    fn globals_number_destinations_in_ascending_order() {
        let got = ThreadComm::run(2, |comm| {
            let rank = comm.rank();
            // each rank sends two roots to rank 0 and one to rank 1
            let globals: Vec<GlobalId> = if rank == 0 { vec![50, 10] } else { vec![30, 20] };
            let dist = DistBuilder::new(comm)
                .set_dest_ranks(vec![0, 0, 1])
                .set_roots2items(vec![0, 2, 3])
                .set_dest_globals(globals.clone())
                .build()
                .unwrap();
            let inverse = dist.invert();
            let arrived = dist.exch(&globals, 1).unwrap();
            (inverse.nroots(), arrived, dist.items2dest_idxs().unwrap())
        });
        // rank 0 receives 50, 50 (from rank 0) and 30, 30 (from rank 1)
        assert_eq!(got[0].0, 2);
        assert_eq!(got[0].1, vec![30, 30, 50, 50]);
        // rank 1 receives 10 and 20
        assert_eq!(got[1].0, 2);
        assert_eq!(got[1].1, vec![10, 20]);
        assert_eq!(got[0].2, vec![1, 1, 0]);
        assert_eq!(got[1].2, vec![0, 0, 1]);
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let err = DistBuilder::new(ThreadComm::solo())
            .set_dest_ranks(vec![0])
            .set_dest_idxs(vec![3], 2)
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            MeshError::DestIndexOutOfRange {
                rank: 0,
                idx: 3,
                nroots: 2
            }
        );
    }

    #[test]
    fn bad_ranks_and_offsets_are_rejected() {
        let comm = ThreadComm::solo();
        assert!(matches!(
            DistBuilder::new(comm.clone()).set_dest_ranks(vec![1]).build(),
            Err(MeshError::RankOutOfRange { rank: 1, size: 1 })
        ));
        assert!(matches!(
            DistBuilder::new(comm.clone())
                .set_dest_ranks(vec![0, 0])
                .set_roots2items(vec![0, 1])
                .build(),
            Err(MeshError::InvalidOffsets(_))
        ));
        let dist = Dist::identity(comm, 2).unwrap();
        assert!(matches!(
            dist.exch(&[1u8], 1),
            Err(MeshError::SizeMismatch { .. })
        ));
    }

    #[test]
    fn identity_is_its_own_inverse() {
        let dist = Dist::identity(ThreadComm::solo(), 4).unwrap();
        let vals = [1.5f64, 2.5, 3.5, 4.5, 5.5, 6.5, 7.5, 8.5];
        assert_eq!(dist.exch(&vals, 2).unwrap(), vals.to_vec());
        assert_eq!(dist.invert().exch(&vals, 2).unwrap(), vals.to_vec());
        assert_eq!(dist.invert().invert().nroots(), 4);
    }
}
