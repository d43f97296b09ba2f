//! Thin façade over intra-process (threads) or inter-process (MPI) message passing.
//!
//! Messages are *contiguous byte slices* (no zero-copy guarantees).
//! All handles are **waitable** but non-blocking: exchanges post every
//! receive and send first and call `.wait()` before trusting a buffer.
//! Messages between one (source, destination, tag) triple are delivered in
//! the order they were sent, which lets collective exchanges reuse tags.

use bytes::Bytes;
use hashbrown::HashMap;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Non-blocking communication interface (minimal by design).
pub trait Communicator: Clone {
    /// Handle returned by `isend`.
    type SendHandle: Wait;
    /// Handle returned by `irecv`.
    type RecvHandle: Wait;

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle;
    /// Post a receive of `len` bytes from `peer`.
    fn irecv(&self, peer: usize, tag: u16, len: usize) -> Self::RecvHandle;
    fn rank(&self) -> usize;
    fn size(&self) -> usize;
}

/// Anything that can be waited on.
pub trait Wait {
    /// Wait for completion and return the received data (if any).
    fn wait(self) -> Option<Vec<u8>>;
}

impl Wait for () {
    fn wait(self) -> Option<Vec<u8>> {
        None
    }
}

/// Typed message tag; each exchange stage uses its own.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CommTag(u16);

impl CommTag {
    pub const fn new(tag: u16) -> Self {
        Self(tag)
    }
    pub const fn as_u16(self) -> u16 {
        self.0
    }
}

// --- ThreadComm: one process, one thread per rank ---
type Key = (usize, usize, u16); // (src, dst, tag)

#[derive(Default)]
struct Mailbox {
    slots: Mutex<HashMap<Key, VecDeque<Bytes>>>,
    arrived: Condvar,
}

/// In-process communicator: every rank of a world is a thread sharing one mailbox.
#[derive(Clone)]
pub struct ThreadComm {
    rank: usize,
    size: usize,
    mailbox: Arc<Mailbox>,
    timeout: Duration,
}

impl fmt::Debug for ThreadComm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadComm")
            .field("rank", &self.rank)
            .field("size", &self.size)
            .finish()
    }
}

impl ThreadComm {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Create the `size` rank handles of a fresh world.
    pub fn world(size: usize) -> Vec<ThreadComm> {
        let mailbox = Arc::new(Mailbox::default());
        (0..size)
            .map(|rank| ThreadComm {
                rank,
                size,
                mailbox: mailbox.clone(),
                timeout: Self::DEFAULT_TIMEOUT,
            })
            .collect()
    }

    /// A world with a single rank.
    pub fn solo() -> Self {
        Self::world(1).remove(0)
    }

    /// Receives give up (and report a communication error) after `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run `f` on every rank of a fresh world of `size` threads and collect
    /// the results in rank order.
    pub fn run<R, F>(size: usize, f: F) -> Vec<R>
    where
        R: Send,
        F: Fn(ThreadComm) -> R + Sync,
    {
        let comms = Self::world(size);
        std::thread::scope(|scope| {
            let handles: Vec<_> = comms
                .into_iter()
                .map(|comm| {
                    let f = &f;
                    scope.spawn(move || f(comm))
                })
                .collect();
            handles
                .into_iter()
                .map(|h| match h.join() {
                    Ok(r) => r,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        })
    }
}

/// Receive handle of [`ThreadComm`]; the message is taken from the mailbox on `wait`.
pub struct ThreadRecv {
    mailbox: Arc<Mailbox>,
    key: Key,
    timeout: Duration,
}

impl Wait for ThreadRecv {
    fn wait(self) -> Option<Vec<u8>> {
        let deadline = Instant::now() + self.timeout;
        let mut slots = self.mailbox.slots.lock();
        loop {
            if let Some(queue) = slots.get_mut(&self.key) {
                if let Some(msg) = queue.pop_front() {
                    if queue.is_empty() {
                        slots.remove(&self.key);
                    }
                    return Some(msg.to_vec());
                }
            }
            if self
                .mailbox
                .arrived
                .wait_until(&mut slots, deadline)
                .timed_out()
            {
                return None;
            }
        }
    }
}

impl Communicator for ThreadComm {
    type SendHandle = ();
    type RecvHandle = ThreadRecv;

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle {
        let key = (self.rank, peer, tag);
        let mut slots = self.mailbox.slots.lock();
        slots
            .entry(key)
            .or_default()
            .push_back(Bytes::copy_from_slice(buf));
        drop(slots);
        self.mailbox.arrived.notify_all();
    }

    fn irecv(&self, peer: usize, tag: u16, _len: usize) -> Self::RecvHandle {
        ThreadRecv {
            mailbox: self.mailbox.clone(),
            key: (peer, self.rank, tag),
            timeout: self.timeout,
        }
    }

    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }
}

// --- MPI backend (feature = "mpi-support") ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::{Communicator, Wait};
    use mpi::point_to_point::{Destination, Source};
    use mpi::request::StaticScope;
    use mpi::topology::{Communicator as _, SimpleCommunicator};

    /// World communicator; `mpi::initialize()` must have been called.
    #[derive(Clone, Debug, Default)]
    pub struct MpiComm;

    impl MpiComm {
        pub fn new() -> Self {
            Self
        }
    }

    pub struct MpiSendHandle(Option<Box<dyn FnOnce()>>);

    impl Wait for MpiSendHandle {
        fn wait(mut self) -> Option<Vec<u8>> {
            if let Some(finish) = self.0.take() {
                finish();
            }
            None
        }
    }

    pub struct MpiRecvHandle {
        peer: i32,
        tag: i32,
    }

    impl Wait for MpiRecvHandle {
        fn wait(self) -> Option<Vec<u8>> {
            let world = SimpleCommunicator::world();
            let (data, _status) = world
                .process_at_rank(self.peer)
                .receive_vec_with_tag::<u8>(self.tag);
            Some(data)
        }
    }

    impl Communicator for MpiComm {
        type SendHandle = MpiSendHandle;
        type RecvHandle = MpiRecvHandle;

        fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> MpiSendHandle {
            let world = SimpleCommunicator::world();
            let ptr: *mut [u8] = Box::into_raw(buf.to_vec().into_boxed_slice());
            // SAFETY: the buffer is leaked until the request below completes.
            let data: &'static [u8] = unsafe { &*ptr };
            let req = world
                .process_at_rank(peer as i32)
                .immediate_send_with_tag(StaticScope, data, tag as i32);
            MpiSendHandle(Some(Box::new(move || {
                req.wait();
                // SAFETY: MPI no longer reads the buffer once the send completed.
                drop(unsafe { Box::from_raw(ptr) });
            })))
        }

        fn irecv(&self, peer: usize, tag: u16, _len: usize) -> MpiRecvHandle {
            MpiRecvHandle {
                peer: peer as i32,
                tag: tag as i32,
            }
        }

        fn rank(&self) -> usize {
            SimpleCommunicator::world().rank() as usize
        }

        fn size(&self) -> usize {
            SimpleCommunicator::world().size() as usize
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiComm;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_roundtrip_two_ranks() {
        let mut comms = ThreadComm::world(2);
        let comm1 = comms.pop().unwrap();
        let comm0 = comms.pop().unwrap();

        let recv = comm1.irecv(0, 7, 4);
        comm0.isend(1, 7, &[1, 2, 3, 4]).wait();
        let data = recv.wait().expect("Expected to receive data from rank 0");
        assert_eq!(data, vec![1, 2, 3, 4]);
    }

    #[test]
    fn same_tag_messages_stay_ordered() {
        let comm = ThreadComm::solo();
        comm.isend(0, 3, &[1]);
        comm.isend(0, 3, &[2]);
        assert_eq!(comm.irecv(0, 3, 1).wait(), Some(vec![1]));
        assert_eq!(comm.irecv(0, 3, 1).wait(), Some(vec![2]));
    }

    #[test]
    fn missing_message_times_out() {
        let comm = ThreadComm::solo().with_timeout(Duration::from_millis(20));
        assert_eq!(comm.irecv(0, 9, 1).wait(), None);
    }

    #[test]
    fn run_collects_in_rank_order() {
        let ranks = ThreadComm::run(3, |comm| {
            let next = (comm.rank() + 1) % comm.size();
            let prev = (comm.rank() + comm.size() - 1) % comm.size();
            comm.isend(next, 1, &[comm.rank() as u8]);
            comm.irecv(prev, 1, 1).wait().unwrap()[0]
        });
        assert_eq!(ranks, vec![2, 0, 1]);
    }
}
