//! The admission + batching algorithm (§4.4): validates a freshly-submitted
//! packet, then either hands it straight to the dispatcher, merges it into a
//! compatible pending root, or enqueues it as a new one.

use crate::config::MAX_MESSAGE_BODY;
use crate::packet::{Packet, PacketState, PacketStatus};
use crate::pending::PendingQueue;

/// What the reactor loop must do next with a packet the batcher has just
/// processed.
pub(crate) enum Admission {
    /// Failed local validation; `status` is already set. The caller owns
    /// completing and releasing it — the batcher never touches the pool or
    /// invokes completions itself.
    Rejected,
    /// No request was inflight: hand this packet straight to the dispatcher.
    DispatchNow(*mut Packet),
    /// Merged into an existing pending root, or enqueued as a new one.
    Queued,
}

/// Run one packet through admission. `inflight` reports whether the
/// dispatcher currently holds the single inflight slot.
///
/// # Safety
/// `packet` must be a pool-owned packet not currently linked into any other
/// list.
pub(crate) unsafe fn admit(packet: *mut Packet, pending: &mut PendingQueue, inflight: bool) -> Admission {
    let operation = match unsafe { (*packet).operation() } {
        Some(op) => op,
        None => {
            unsafe { (*packet).status = PacketStatus::InvalidOperation };
            unsafe { (*packet).set_state(PacketState::Completing) };
            return Admission::Rejected;
        }
    };

    let data_size = unsafe { (*packet).data_size };
    let event_size = operation.event_size();
    if data_size == 0 || data_size % event_size != 0 {
        unsafe { (*packet).status = PacketStatus::InvalidDataSize };
        unsafe { (*packet).set_state(PacketState::Completing) };
        return Admission::Rejected;
    }
    if data_size as usize > MAX_MESSAGE_BODY {
        unsafe { (*packet).status = PacketStatus::TooMuchData };
        unsafe { (*packet).set_state(PacketState::Completing) };
        return Admission::Rejected;
    }

    unsafe { (*packet).init_singleton_root() };

    if !inflight {
        unsafe { (*packet).set_state(PacketState::InflightRoot) };
        return Admission::DispatchNow(packet);
    }

    if operation.batching_allowed() {
        let merged = pending.find_mut(|root| unsafe {
            (*root).operation_code == (*packet).operation_code
                && (*root).batch_size + data_size <= MAX_MESSAGE_BODY as u32
        });
        if let Some(root) = merged {
            unsafe {
                let tail = (*root).batch_tail;
                (*tail).batch_next = packet;
                (*root).batch_tail = packet;
                (*root).batch_size += data_size;
            }
            unsafe { (*packet).set_state(PacketState::PendingMember) };
            return Admission::Queued;
        }
    }

    unsafe { (*packet).set_state(PacketState::PendingRoot) };
    pending.push_back(packet);
    Admission::Queued
}
