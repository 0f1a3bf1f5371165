//! The demultiplexer: walks a batch chain and carves a batched reply into
//! per-packet slices, per §4.6.
//!
//! The reply buffer's lifetime ends when [`demultiplex`] returns; anything a
//! completion wants to retain must be copied out before then (§4.6).

use crate::operations::{DemuxKind, Operation, SPARSE_REPLY_EVENT_SIZE};
use crate::packet::{Packet, PacketStatus};

/// Carve `reply` into one subrange per member of the chain rooted at `root`
/// and invoke `complete` once per packet with its slice.
///
/// # Safety
/// `root` must head a well-formed chain of packets all sharing `operation`
/// (§8, invariant 5), each still owning valid `data`/`data_size`.
pub(crate) unsafe fn demultiplex(
    operation: Operation,
    reply: &[u8],
    root: *mut Packet,
    complete: &mut dyn FnMut(*mut Packet, &[u8]),
) {
    match operation.demux_kind() {
        DemuxKind::Aligned => unsafe { demux_aligned(operation, reply, root, complete) },
        DemuxKind::Sparse => unsafe { demux_sparse(operation, reply, root, complete) },
    }
}

/// # Safety
/// Same obligations as [`demultiplex`].
unsafe fn demux_aligned(
    operation: Operation,
    reply: &[u8],
    root: *mut Packet,
    complete: &mut dyn FnMut(*mut Packet, &[u8]),
) {
    // Non-batchable operations never legitimately merge (§4.4: "always
    // enqueued as their own root; they remain singletons"). If one
    // nonetheless arrives here as a chain, that is a defect upstream, not a
    // supported code path (§9, open question).
    if !operation.batching_allowed() {
        debug_assert!(unsafe { (*root).batch_next }.is_null());
        unsafe { (*root).status = PacketStatus::Ok };
        complete(root, reply);
        return;
    }

    let event_size = operation.event_size() as usize;
    let reply_event_size = operation.reply_event_size() as usize;
    let mut event_offset = 0usize;
    let mut cur = root;
    loop {
        let data_size = unsafe { (*cur).data_size } as usize;
        let event_count = data_size / event_size.max(1);
        let start = (event_offset * reply_event_size).min(reply.len());
        let end = ((event_offset + event_count) * reply_event_size).min(reply.len());
        let slice = &reply[start..end];

        unsafe { (*cur).status = PacketStatus::Ok };
        complete(cur, slice);

        event_offset += event_count;
        let next = unsafe { (*cur).batch_next };
        if next.is_null() {
            break;
        }
        cur = next;
    }
}

/// # Safety
/// Same obligations as [`demultiplex`].
unsafe fn demux_sparse(
    operation: Operation,
    reply: &[u8],
    root: *mut Packet,
    complete: &mut dyn FnMut(*mut Packet, &[u8]),
) {
    if !operation.batching_allowed() {
        debug_assert!(unsafe { (*root).batch_next }.is_null());
        unsafe { (*root).status = PacketStatus::Ok };
        complete(root, reply);
        return;
    }

    let event_size = operation.event_size() as usize;
    let stride = SPARSE_REPLY_EVENT_SIZE as usize;
    let mut event_offset = 0u32;
    let mut cur = root;
    loop {
        let data_size = unsafe { (*cur).data_size };
        let event_count = data_size / (event_size.max(1) as u32);
        let local_start = event_offset;
        let local_end = event_offset + event_count;

        // Partition the sparse (index, reason) stream by range and rebase
        // each surviving index to this packet's local frame.
        let mut local = Vec::new();
        let mut i = 0usize;
        while i + stride <= reply.len() {
            let index = u32::from_le_bytes(reply[i..i + 4].try_into().unwrap());
            if index >= local_start && index < local_end {
                local.extend_from_slice(&(index - local_start).to_le_bytes());
                local.extend_from_slice(&reply[i + 4..i + stride]);
            }
            i += stride;
        }

        unsafe { (*cur).status = PacketStatus::Ok };
        complete(cur, &local);

        event_offset = local_end;
        let next = unsafe { (*cur).batch_next };
        if next.is_null() {
            break;
        }
        cur = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::PacketState;

    unsafe fn make_chain(operation: Operation, sizes: &[u32]) -> Vec<Box<Packet>> {
        let mut packets: Vec<Box<Packet>> = sizes
            .iter()
            .map(|&sz| {
                let mut p = Box::new(Packet::empty());
                p.operation_code = operation.code();
                p.data_size = sz;
                p.set_state(PacketState::InflightMember);
                p
            })
            .collect();

        let mut batch_size = 0u32;
        for i in 0..packets.len() {
            batch_size += packets[i].data_size;
        }
        let tail_ptr = packets.last_mut().unwrap().as_mut() as *mut Packet;
        for i in 0..packets.len() {
            let next_ptr = if i + 1 < packets.len() {
                packets[i + 1].as_mut() as *mut Packet
            } else {
                std::ptr::null_mut()
            };
            packets[i].batch_next = next_ptr;
        }
        packets[0].batch_tail = tail_ptr;
        packets[0].batch_size = batch_size;
        packets
    }

    #[test]
    fn aligned_demux_reconstructs_reply_by_concatenation() {
        unsafe {
            let op = Operation::LookupAccounts;
            // event_size 16 => 2 events = 32 bytes request each.
            let mut packets = make_chain(op, &[32, 32]);
            let root = packets[0].as_mut() as *mut Packet;

            // reply_event_size 128 per lookup event, 4 events total = 512 bytes.
            let reply: Vec<u8> = (0..512u32).map(|b| (b % 256) as u8).collect();

            let mut slices: Vec<Vec<u8>> = Vec::new();
            let mut complete = |_p: *mut Packet, slice: &[u8]| slices.push(slice.to_vec());
            demultiplex(op, &reply, root, &mut complete);

            assert_eq!(slices.len(), 2);
            let mut reconstructed = Vec::new();
            reconstructed.extend_from_slice(&slices[0]);
            reconstructed.extend_from_slice(&slices[1]);
            assert_eq!(reconstructed, reply);
        }
    }

    #[test]
    fn sparse_demux_rebases_indices_to_local_range() {
        unsafe {
            let op = Operation::CreateAccounts;
            // event_size 128 => one request event each.
            let mut packets = make_chain(op, &[128, 128]);
            let root = packets[0].as_mut() as *mut Packet;

            // Reply reports index 1 (second event overall, i.e. local index 0
            // of the second packet) failed with reason 7.
            let mut reply = Vec::new();
            reply.extend_from_slice(&1u32.to_le_bytes());
            reply.extend_from_slice(&7u32.to_le_bytes());

            let mut per_packet: Vec<Vec<u8>> = Vec::new();
            let mut complete = |_p: *mut Packet, slice: &[u8]| per_packet.push(slice.to_vec());
            demultiplex(op, &reply, root, &mut complete);

            assert_eq!(per_packet.len(), 2);
            assert!(per_packet[0].is_empty());
            assert_eq!(per_packet[1].len(), 8);
            let rebased_index = u32::from_le_bytes(per_packet[1][0..4].try_into().unwrap());
            assert_eq!(rebased_index, 0);
        }
    }

    #[test]
    fn non_batchable_operation_gets_whole_reply() {
        unsafe {
            let op = Operation::QueryAccounts;
            let mut packets = make_chain(op, &[64]);
            let root = packets[0].as_mut() as *mut Packet;
            let reply = vec![1, 2, 3, 4];

            let mut slices = Vec::new();
            let mut complete = |_p: *mut Packet, slice: &[u8]| slices.push(slice.to_vec());
            demultiplex(op, &reply, root, &mut complete);

            assert_eq!(slices, vec![reply]);
        }
    }
}
