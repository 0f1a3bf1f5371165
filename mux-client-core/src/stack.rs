//! Intrusive, lock-free LIFO stack shared by the free stack (§4.1) and the
//! MPSC submission stack (§4.2).
//!
//! Packets already exist as pool slots with a stable address, so the stack
//! links directly through [`crate::packet::Packet::link`] rather than
//! allocating separate owning nodes — the same reasoning the specification's
//! design notes give for intrusive chains in general.
//!
//! ## Memory ordering
//!
//! `push` is called from any thread; `pop`/`drain` are called only from a
//! single consumer (the packet-pool side has multiple consumers across
//! `acquire`, but each pop is independent and self-contained). The CAS loop
//! publishes the new head with `Release` so a subsequent `Acquire` load by
//! another thread observes the fully-initialized packet; `pop` loads the
//! head with `Acquire` to synchronize with that publication.

use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

use crate::packet::{Packet, link_load, link_store};

/// A lock-free, intrusive LIFO of packets linked through their shared `link`
/// field. Safe to push from any thread; pop is safe from any thread too, but
/// only one logical consumer is assumed by the components built on top of
/// this (the packet pool's free stack has many producers and many
/// consumers, each independent; the submission stack has many producers and
/// exactly one consumer, the reactor thread).
pub(crate) struct AtomicStack {
    head: AtomicPtr<Packet>,
}

impl AtomicStack {
    pub(crate) const fn new() -> Self {
        Self {
            head: AtomicPtr::new(ptr::null_mut()),
        }
    }

    /// Push one packet onto the stack. Wait-free modulo contention: retries
    /// only on a losing CAS.
    pub(crate) fn push(&self, packet: *mut Packet) {
        let mut head = self.head.load(Ordering::Relaxed);
        loop {
            link_store(packet, head);
            match self
                .head
                .compare_exchange_weak(head, packet, Ordering::Release, Ordering::Relaxed)
            {
                Ok(_) => return,
                Err(observed) => head = observed,
            }
        }
    }

    /// Pop one packet, or `None` if the stack was empty at the moment of the
    /// successful exchange.
    pub(crate) fn pop(&self) -> Option<*mut Packet> {
        let mut head = self.head.load(Ordering::Acquire);
        loop {
            if head.is_null() {
                return None;
            }
            let next = link_load(head);
            match self
                .head
                .compare_exchange_weak(head, next, Ordering::Acquire, Ordering::Acquire)
            {
                Ok(_) => return Some(head),
                Err(observed) => head = observed,
            }
        }
    }

    /// Atomically take the entire stack, leaving it empty. Used by the
    /// reactor thread to drain the submission stack once per wake-up.
    pub(crate) fn drain_all(&self) -> Option<*mut Packet> {
        let head = self.head.swap(ptr::null_mut(), Ordering::Acquire);
        if head.is_null() { None } else { Some(head) }
    }
}
