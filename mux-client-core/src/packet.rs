//! The packet: the unit of submission across the FFI boundary.
//!
//! A `Packet` is a pool-allocated, `#[repr(C)]` descriptor. Its address is
//! handed to the application as an opaque pointer, so the type must never be
//! moved once it is placed in [`crate::pool::PacketPool`] storage — every
//! intrusive link below is a raw pointer into that same pinned storage.

use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

use crate::operations::Operation;

/// Outcome of a packet, set before completion.
///
/// Mirrors the status table in the specification: validation failures are
/// resolved locally by the batcher and never reach the wire; `ok` is the only
/// status that carries a meaningful reply slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketStatus {
    /// Not yet completed.
    Pending = 0,
    /// Completed with a valid reply slice.
    Ok = 1,
    /// `data_size` exceeded the maximum protocol message body.
    TooMuchData = 2,
    /// `operation` is not one of the known request variants.
    InvalidOperation = 3,
    /// `data_size` was zero or not a multiple of the operation's event size.
    InvalidDataSize = 4,
    /// The cluster rejected or could not complete the request at the
    /// transport layer; the core treats the specific reason as opaque.
    TransportError = 5,
}

/// Debug-only tag tracking which list a packet currently belongs to.
///
/// Not load-bearing: nothing in the core branches on this value outside of
/// `debug_assert!`. It exists purely so a reviewer (or a property test) can
/// catch a packet being linked into two lists at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PacketState {
    Free,
    Submitted,
    PendingRoot,
    PendingMember,
    InflightRoot,
    InflightMember,
    Completing,
}

/// A single application request, pool-allocated and reused for its entire
/// lifetime in the `Context`.
///
/// # Safety
///
/// `Packet` is `#[repr(C)]` and is never moved after
/// [`crate::pool::PacketPool::new`] places it in its backing storage: every
/// link field below is a raw pointer into that same storage, and a move
/// would dangle every other packet's view of this one.
#[repr(C)]
pub struct Packet {
    /// Which request variant this packet carries, as the raw wire code the
    /// application wrote before calling `submit`. Kept as `u8` rather than
    /// `Operation` directly: an application can write any byte through the
    /// FFI boundary, and transmuting an out-of-range discriminant into a
    /// `repr(u8)` enum is undefined behavior. [`Self::operation`] is the
    /// validated view the rest of the core uses.
    pub operation_code: u8,
    /// Outcome, set by the batcher, dispatcher, or demultiplexer.
    pub status: PacketStatus,
    /// Caller-owned request payload. Immutable for the packet's lifetime
    /// between submit and completion.
    pub data: *const u8,
    /// Length of `data` in bytes.
    pub data_size: u32,
    /// Opaque value returned verbatim to the caller on completion.
    pub user_tag: u128,

    /// Intrusive LIFO link, shared by the free stack and the MPSC submission
    /// stack. The two uses never overlap in time (a packet is either free or
    /// submitted, never both, see [`PacketState`]), so one field suffices.
    pub(crate) link: AtomicPtr<Packet>,

    /// Batch-chain successor. `None` (null) for a singleton root or tail.
    pub(crate) batch_next: *mut Packet,
    /// Batch-chain tail, meaningful only on the root. Enables O(1) append.
    pub(crate) batch_tail: *mut Packet,
    /// Sum of `data_size` across the whole chain, meaningful only on the root.
    pub(crate) batch_size: u32,
    /// Pending-queue successor, meaningful only on a root once enqueued.
    pub(crate) pending_next: *mut Packet,

    #[cfg(any(test, debug_assertions))]
    pub(crate) state: PacketState,
}

// Packets move between threads (producer -> reactor) but are only ever
// dereferenced by whichever component currently owns them, per the
// specification's single-owner invariant.
unsafe impl Send for Packet {}

// The pool storage backing every packet is shared behind `Arc<PacketPool>`
// so that `Context::acquire`/`release` are callable from any thread (§4.1).
// `&Packet` crossing threads is sound under the same single-owner
// discipline as `Send` above: whichever list currently holds a packet is
// the only component that touches it until it hands the packet off.
unsafe impl Sync for Packet {}

impl Packet {
    /// Construct a packet in its `free` state, zeroed of request content.
    pub(crate) fn empty() -> Self {
        Packet {
            operation_code: 0,
            status: PacketStatus::Pending,
            data: ptr::null(),
            data_size: 0,
            user_tag: 0,
            link: AtomicPtr::new(ptr::null_mut()),
            batch_next: ptr::null_mut(),
            batch_tail: ptr::null_mut(),
            batch_size: 0,
            pending_next: ptr::null_mut(),
            #[cfg(any(test, debug_assertions))]
            state: PacketState::Free,
        }
    }

    /// Re-initialize this packet as a singleton batch root, per step 3 of
    /// the batcher's admission algorithm.
    pub(crate) fn init_singleton_root(&mut self) {
        self.batch_next = ptr::null_mut();
        self.batch_tail = self as *mut Packet;
        self.batch_size = self.data_size;
        self.pending_next = ptr::null_mut();
    }

    /// Validated view of [`Self::operation_code`], or `None` if the
    /// application wrote a byte that names no known request variant.
    pub(crate) fn operation(&self) -> Option<Operation> {
        Operation::from_code(self.operation_code)
    }

    /// View of this packet's request payload.
    ///
    /// # Safety
    /// Caller must ensure `data`/`data_size` still describe memory owned by
    /// the application (true between submit and completion).
    pub(crate) unsafe fn data_slice(&self) -> &[u8] {
        if self.data_size == 0 {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(self.data, self.data_size as usize) }
    }

    #[cfg(any(test, debug_assertions))]
    pub(crate) fn set_state(&mut self, state: PacketState) {
        self.state = state;
    }

    #[cfg(not(any(test, debug_assertions)))]
    pub(crate) fn set_state(&mut self, _state: PacketState) {}
}

/// Load a packet's intrusive `link` with acquire ordering.
#[inline]
pub(crate) fn link_load(packet: *mut Packet) -> *mut Packet {
    unsafe { (*packet).link.load(Ordering::Acquire) }
}

#[inline]
pub(crate) fn link_store(packet: *mut Packet, next: *mut Packet) {
    unsafe { (*packet).link.store(next, Ordering::Release) };
}
