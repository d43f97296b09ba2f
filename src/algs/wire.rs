//! Fixed, little-endian wire types for Dist setup and migration exchanges.

use crate::topology::ownership::Remote;
use bytemuck::{Pod, Zeroable};
use static_assertions::const_assert_eq;
use std::mem::size_of;

pub fn cast_slice<T: Pod>(v: &[T]) -> &[u8] {
    bytemuck::cast_slice(v)
}

/// Copy raw bytes into a freshly allocated, correctly aligned `Vec<T>`.
///
/// Returns `None` when `bytes` is not a whole number of `T` records.
pub fn cast_vec_from<T: Pod>(bytes: &[u8]) -> Option<Vec<T>> {
    let width = size_of::<T>();
    if width == 0 || bytes.len() % width != 0 {
        return None;
    }
    let mut out = vec![T::zeroed(); bytes.len() / width];
    bytemuck::cast_slice_mut(&mut out).copy_from_slice(bytes);
    Some(out)
}

/// Message-size header exchanged before every payload.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct WireCount {
    pub n_le: u64,
}

impl WireCount {
    pub fn new(n: usize) -> Self {
        Self {
            n_le: (n as u64).to_le(),
        }
    }
    pub fn get(&self) -> usize {
        u64::from_le(self.n_le) as usize
    }
}

/// A `(rank, index)` location carried on the wire, with a reserved "none" value.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct WireRemote {
    pub rank_le: u64,
    pub idx_le: u64,
}

impl WireRemote {
    pub const NONE: WireRemote = WireRemote {
        rank_le: u64::MAX,
        idx_le: u64::MAX,
    };

    pub fn new(rank: usize, idx: usize) -> Self {
        Self {
            rank_le: (rank as u64).to_le(),
            idx_le: (idx as u64).to_le(),
        }
    }

    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }

    pub fn remote(&self) -> Option<Remote> {
        if self.is_none() {
            None
        } else {
            Some(Remote::new(
                u64::from_le(self.rank_le) as usize,
                u64::from_le(self.idx_le) as usize,
            ))
        }
    }
}

impl From<Remote> for WireRemote {
    fn from(r: Remote) -> Self {
        WireRemote::new(r.rank, r.idx)
    }
}

const_assert_eq!(size_of::<WireCount>(), 8);
const_assert_eq!(size_of::<WireRemote>(), 16);
