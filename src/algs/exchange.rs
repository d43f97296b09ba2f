//! Two-stage message exchange: counts first, then contiguous payloads.
//!
//! Every function here is collective over the communicator and guarantees
//! that all send handles are drained before returning, even if an error
//! occurs while receiving.

use crate::algs::communicator::{CommTag, Communicator, Wait};
use crate::algs::wire::{WireCount, cast_slice, cast_vec_from};
use crate::mesh_error::MeshError;
use bytemuck::Pod;
use std::mem::size_of;

pub const SIZE_TAG: CommTag = CommTag::new(0xD151);
pub const CONTENT_TAG: CommTag = CommTag::new(0xD152);
pub const REDUCE_TAG: CommTag = CommTag::new(0xD153);

fn comm_error(neighbor: usize, message: impl Into<String>) -> MeshError {
    MeshError::CommError {
        neighbor,
        message: message.into(),
    }
}

/// All-to-all exchange of one count per rank.
///
/// `counts[r]` is what this rank sends to rank `r`; the result holds, per
/// source rank, the count that rank sent here.
pub fn exchange_counts<C: Communicator>(
    comm: &C,
    tag: CommTag,
    counts: &[usize],
) -> Result<Vec<usize>, MeshError> {
    let size = comm.size();
    if counts.len() != size {
        return Err(MeshError::SizeMismatch {
            what: "per-rank counts",
            expected: size,
            actual: counts.len(),
        });
    }

    // 1) post all receives
    let recvs: Vec<_> = (0..size)
        .map(|peer| comm.irecv(peer, tag.as_u16(), size_of::<WireCount>()))
        .collect();

    // 2) post all sends
    let pending_sends: Vec<_> = counts
        .iter()
        .enumerate()
        .map(|(peer, &n)| comm.isend(peer, tag.as_u16(), cast_slice(&[WireCount::new(n)])))
        .collect();

    // 3) wait for all recvs, keep the first error but drain everything
    let mut sizes_in = Vec::with_capacity(size);
    let mut maybe_err = None;
    for (peer, h) in recvs.into_iter().enumerate() {
        let got = h.wait();
        if maybe_err.is_some() {
            continue;
        }
        match got.as_deref().and_then(cast_vec_from::<WireCount>) {
            Some(cnt) if cnt.len() == 1 => sizes_in.push(cnt[0].get()),
            Some(_) | None => {
                maybe_err = Some(comm_error(
                    peer,
                    format!("failed to receive size header from rank {peer}"),
                ));
            }
        }
    }

    // 4) always drain all send handles before returning
    for send in pending_sends {
        let _ = send.wait();
    }

    match maybe_err {
        Some(err) => Err(err),
        None => Ok(sizes_in),
    }
}

/// Send `sends[i].1` to rank `sends[i].0` and receive `recvs[j].1` records
/// from rank `recvs[j].0`; the received records are concatenated in `recvs`
/// order.
pub fn exchange_content<C, T>(
    comm: &C,
    tag: CommTag,
    sends: &[(usize, &[T])],
    recvs: &[(usize, usize)],
) -> Result<Vec<T>, MeshError>
where
    C: Communicator,
    T: Pod,
{
    let handles: Vec<_> = recvs
        .iter()
        .map(|&(peer, n)| comm.irecv(peer, tag.as_u16(), n * size_of::<T>()))
        .collect();

    let pending_sends: Vec<_> = sends
        .iter()
        .map(|&(peer, data)| comm.isend(peer, tag.as_u16(), cast_slice(data)))
        .collect();

    let total = recvs.iter().map(|&(_, n)| n).sum();
    let mut out = Vec::with_capacity(total);
    let mut maybe_err = None;
    for (&(peer, n), h) in recvs.iter().zip(handles) {
        let got = h.wait();
        if maybe_err.is_some() {
            continue;
        }
        match got {
            Some(bytes) if bytes.len() == n * size_of::<T>() => match cast_vec_from::<T>(&bytes) {
                Some(records) => out.extend_from_slice(&records),
                None if n == 0 => {}
                None => maybe_err = Some(comm_error(peer, "misaligned payload")),
            },
            Some(bytes) => {
                maybe_err = Some(comm_error(
                    peer,
                    format!(
                        "expected {} bytes of payload, got {}",
                        n * size_of::<T>(),
                        bytes.len()
                    ),
                ));
            }
            None => {
                maybe_err = Some(comm_error(
                    peer,
                    format!("failed to receive payload from rank {peer}"),
                ));
            }
        }
    }

    for send in pending_sends {
        let _ = send.wait();
    }

    match maybe_err {
        Some(err) => Err(err),
        None => Ok(out),
    }
}

/// Gather one value from every rank onto every rank.
pub fn all_gather_u64<C: Communicator>(comm: &C, value: u64) -> Result<Vec<u64>, MeshError> {
    let size = comm.size();
    let mine = [value];
    let sends: Vec<(usize, &[u64])> = (0..size).map(|peer| (peer, &mine[..])).collect();
    let recvs: Vec<(usize, usize)> = (0..size).map(|peer| (peer, 1)).collect();
    exchange_content(comm, REDUCE_TAG, &sends, &recvs)
}

pub fn allreduce_sum<C: Communicator>(comm: &C, value: u64) -> Result<u64, MeshError> {
    Ok(all_gather_u64(comm, value)?.into_iter().sum())
}

pub fn allreduce_max<C: Communicator>(comm: &C, value: u64) -> Result<u64, MeshError> {
    Ok(all_gather_u64(comm, value)?
        .into_iter()
        .max()
        .unwrap_or(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::ThreadComm;

    #[test]
    fn counts_are_transposed() {
        let got = ThreadComm::run(3, |comm| {
            let r = comm.rank();
            let counts: Vec<usize> = (0..3).map(|peer| 10 * r + peer).collect();
            exchange_counts(&comm, SIZE_TAG, &counts).unwrap()
        });
        assert_eq!(got[0], vec![0, 10, 20]);
        assert_eq!(got[1], vec![1, 11, 21]);
        assert_eq!(got[2], vec![2, 12, 22]);
    }

    #[test]
    fn content_is_concatenated_in_recv_order() {
        let got = ThreadComm::run(2, |comm| {
            let r = comm.rank() as i32;
            let payload = [r, r + 100];
            let sends = [(0, &payload[..]), (1, &payload[..1])];
            let recvs = if comm.rank() == 0 {
                [(1, 2), (0, 2)]
            } else {
                [(1, 1), (0, 1)]
            };
            exchange_content(&comm, CONTENT_TAG, &sends, &recvs).unwrap()
        });
        assert_eq!(got[0], vec![1, 101, 0, 100]);
        assert_eq!(got[1], vec![1, 0]);
    }

    #[test]
    fn reductions_agree_on_every_rank() {
        let got = ThreadComm::run(4, |comm| {
            let v = comm.rank() as u64 + 1;
            (
                allreduce_sum(&comm, v).unwrap(),
                allreduce_max(&comm, v).unwrap(),
            )
        });
        assert!(got.iter().all(|&pair| pair == (10, 4)));
    }
}
