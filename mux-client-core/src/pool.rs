//! The packet pool: a fixed-size array of packets with a lock-free
//! free-list, per §4.1. Pre-allocation bounds memory and yields O(1)
//! acquire/release.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::error::AcquireStatus;
use crate::packet::{Packet, PacketStatus};
use crate::stack::AtomicStack;

#[cfg(any(test, debug_assertions))]
use crate::packet::PacketState;

/// Owns the fixed storage backing every packet a `Context` will ever hand
/// out, plus the free-list used to acquire and release them.
///
/// `storage` is a pinned, fixed-length allocation: packets are never moved
/// after construction, because every intrusive link in the rest of the core
/// is a raw pointer into this array.
pub(crate) struct PacketPool {
    storage: Box<[Packet]>,
    free: AtomicStack,
    shutdown: AtomicBool,
    in_use: AtomicUsize,
}

impl PacketPool {
    /// Allocate `concurrency_max` packets and fill the free stack.
    pub(crate) fn new(concurrency_max: u32) -> Self {
        let storage: Box<[Packet]> = (0..concurrency_max).map(|_| Packet::empty()).collect();
        let free = AtomicStack::new();

        // Push every slot onto the free stack. Order doesn't matter: the
        // free stack has no fairness requirement.
        for packet in storage.iter() {
            let ptr = packet as *const Packet as *mut Packet;
            free.push(ptr);
        }

        Self {
            storage,
            free,
            shutdown: AtomicBool::new(false),
            in_use: AtomicUsize::new(0),
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Acquire one packet from the free stack. Safe from any thread.
    pub(crate) fn acquire(&self) -> Result<*mut Packet, AcquireStatus> {
        if self.shutdown.load(Ordering::Acquire) {
            return Err(AcquireStatus::Shutdown);
        }
        match self.free.pop() {
            Some(packet) => {
                self.in_use.fetch_add(1, Ordering::Relaxed);
                #[cfg(any(test, debug_assertions))]
                unsafe {
                    (*packet).set_state(PacketState::Submitted);
                }
                unsafe {
                    (*packet).status = PacketStatus::Pending;
                }
                Ok(packet)
            }
            None => Err(AcquireStatus::ConcurrencyMaxExceeded),
        }
    }

    /// Return one packet to the free stack. Safe from any thread.
    pub(crate) fn release(&self, packet: *mut Packet) {
        #[cfg(any(test, debug_assertions))]
        unsafe {
            (*packet).set_state(PacketState::Free);
        }
        self.free.push(packet);
        self.in_use.fetch_sub(1, Ordering::Relaxed);
    }

    /// Mark the pool as terminating. Subsequent `acquire` calls observe this
    /// and return `shutdown`.
    pub(crate) fn begin_shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    /// Drain every packet currently on the free stack, one at a time,
    /// counting how many were drained. Used by the reactor loop to detect
    /// that every outstanding packet has been returned (§4.7 shutdown).
    pub(crate) fn try_drain_one(&self) -> bool {
        self.free.pop().is_some()
    }

    #[cfg(test)]
    pub(crate) fn in_use(&self) -> usize {
        self.in_use.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_release_conserves_free_count() {
        let pool = PacketPool::new(4);
        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        assert_eq!(pool.in_use(), 2);
        pool.release(a);
        pool.release(b);
        assert_eq!(pool.in_use(), 0);
    }

    #[test]
    fn acquire_exhausted_pool_reports_concurrency_max_exceeded() {
        let pool = PacketPool::new(2);
        let _a = pool.acquire().unwrap();
        let _b = pool.acquire().unwrap();
        assert_eq!(
            pool.acquire(),
            Err(AcquireStatus::ConcurrencyMaxExceeded)
        );
    }

    #[test]
    fn acquire_after_shutdown_reports_shutdown() {
        let pool = PacketPool::new(2);
        pool.begin_shutdown();
        assert_eq!(pool.acquire(), Err(AcquireStatus::Shutdown));
    }
}
