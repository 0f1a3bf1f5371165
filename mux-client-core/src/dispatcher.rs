//! The dispatcher (§4.5): builds a protocol request from a batch root chain,
//! holds the single-inflight invariant, and on reply pops the next pending
//! root before handing the completed one to the demultiplexer.

use crate::demux::demultiplex;
use crate::operations::Operation;
use crate::packet::{Packet, PacketStatus};
use crate::pending::PendingQueue;
use crate::protocol::{Message, MessagePool, PendingReply, ProtocolClient, ReplyOutcome, RequestTag};

/// `cluster_id` (16) + `client_id` (16) + `operation` (1) + `body_size` (4).
const HEADER_SIZE: usize = 16 + 16 + 1 + 4;

/// Build a request message from `root`'s chain and hand it to `protocol`.
///
/// # Safety
/// `root` must head a well-formed, fully-populated batch chain (§8,
/// invariants 4 and 5) not already inflight.
pub(crate) unsafe fn submit(
    root: *mut Packet,
    cluster_id: u128,
    client_id: u128,
    message_pool: &mut dyn MessagePool,
    protocol: &mut dyn ProtocolClient,
) {
    debug_assert!(!protocol.request_inflight());

    let operation = unsafe { (*root).operation() }.expect("root packet already validated");
    let batch_size = unsafe { (*root).batch_size } as usize;

    let mut message = message_pool.get_message(HEADER_SIZE + batch_size);
    message.buf.extend_from_slice(&cluster_id.to_le_bytes());
    message.buf.extend_from_slice(&client_id.to_le_bytes());
    message.buf.push(operation.code());
    message.buf.extend_from_slice(&(batch_size as u32).to_le_bytes());

    let mut copied = 0usize;
    let mut cur = root;
    loop {
        let data = unsafe { (*cur).data_slice() };
        message.buf.extend_from_slice(data);
        copied += data.len();
        let next = unsafe { (*cur).batch_next };
        if next.is_null() {
            break;
        }
        cur = next;
    }
    debug_assert_eq!(copied, batch_size, "copied bytes must equal root.batch_size (§8, invariant 4)");

    let tag = RequestTag(root as usize);
    protocol.raw_request(operation, message, tag);
}

/// Process one reply. Pops and dispatches the next pending root *before*
/// demultiplexing the reply in hand, per §4.5's pipelining rationale: the
/// wire should never sit idle while user completions run.
///
/// `complete` is invoked once per packet in the completed chain with its
/// final status and reply slice (empty for anything but `ok`).
///
/// # Safety
/// `reply.tag` must be the [`RequestTag`] this dispatcher handed to
/// `protocol.raw_request` for the chain it names.
pub(crate) unsafe fn handle_reply(
    reply: PendingReply,
    pending: &mut PendingQueue,
    cluster_id: u128,
    client_id: u128,
    message_pool: &mut dyn MessagePool,
    protocol: &mut dyn ProtocolClient,
    mut complete: impl FnMut(*mut Packet, PacketStatus, &[u8]),
) -> *mut Packet {
    if let Some(next_root) = pending.pop_front() {
        unsafe { submit(next_root, cluster_id, client_id, message_pool, protocol) };
    }

    let root = reply.tag.0 as *mut Packet;
    let operation = unsafe { (*root).operation() }.expect("root packet already validated");

    match reply.outcome {
        ReplyOutcome::Ok { body } => {
            let mut wrapped = |packet: *mut Packet, slice: &[u8]| complete(packet, PacketStatus::Ok, slice);
            unsafe { demultiplex(operation, &body, root, &mut wrapped) };
        }
        ReplyOutcome::TransportError => {
            unsafe { fail_chain(root, PacketStatus::TransportError, &mut complete) };
        }
    }

    root
}

/// Walk a chain setting every member's status and invoking `complete` with
/// an empty slice. Used when the protocol client cannot produce a reply.
unsafe fn fail_chain(root: *mut Packet, status: PacketStatus, complete: &mut impl FnMut(*mut Packet, PacketStatus, &[u8])) {
    let mut cur = root;
    loop {
        unsafe { (*cur).status = status };
        complete(cur, status, &[]);
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
    use crate::operations::Operation as Op;

    struct FakeProtocol {
        inflight: bool,
        requests: Vec<(Op, Vec<u8>, RequestTag)>,
        registered: bool,
    }

    impl FakeProtocol {
        fn new() -> Self {
            Self {
                inflight: false,
                requests: Vec::new(),
                registered: true,
            }
        }
    }

    impl ProtocolClient for FakeProtocol {
        fn request_inflight(&self) -> bool {
            self.inflight
        }
        fn raw_request(&mut self, operation: Operation, message: Message, tag: RequestTag) {
            self.inflight = true;
            self.requests.push((operation, message.buf, tag));
        }
        fn tick(&mut self) {}
        fn poll_reply(&mut self) -> Option<PendingReply> {
            None
        }
        fn begin_registration(&mut self) {
            self.registered = true;
        }
        fn registered(&self) -> bool {
            self.registered
        }
    }

    struct FakePool;
    impl MessagePool for FakePool {
        fn get_message(&mut self, capacity: usize) -> Message {
            Message { buf: Vec::with_capacity(capacity) }
        }
        fn release_message(&mut self, _message: Message) {}
    }

    fn singleton(operation: Op, data: &[u8]) -> Box<Packet> {
        let mut p = Box::new(Packet::empty());
        p.operation_code = operation.code();
        p.data = data.as_ptr();
        p.data_size = data.len() as u32;
        p.init_singleton_root();
        p
    }

    #[test]
    fn submit_writes_header_and_concatenated_body() {
        let data = [7u8; 128];
        let mut root = singleton(Op::CreateAccounts, &data);
        let root_ptr = root.as_mut() as *mut Packet;

        let mut protocol = FakeProtocol::new();
        let mut pool = FakePool;
        unsafe { submit(root_ptr, 1, 2, &mut pool, &mut protocol) };

        assert_eq!(protocol.requests.len(), 1);
        let (op, body, tag) = &protocol.requests[0];
        assert_eq!(*op, Op::CreateAccounts);
        assert_eq!(body.len(), HEADER_SIZE + 128);
        assert_eq!(&body[HEADER_SIZE..], &data[..]);
        assert_eq!(tag.0, root_ptr as usize);
    }

    #[test]
    fn handle_reply_dispatches_next_pending_root_first() {
        let data_a = [1u8; 128];
        let mut root_a = singleton(Op::CreateAccounts, &data_a);
        let root_a_ptr = root_a.as_mut() as *mut Packet;

        let data_b = [2u8; 128];
        let mut root_b = singleton(Op::CreateAccounts, &data_b);
        let root_b_ptr = root_b.as_mut() as *mut Packet;

        let mut pending = PendingQueue::new();
        pending.push_back(root_b_ptr);

        let mut protocol = FakeProtocol::new();
        let mut pool = FakePool;

        let reply = PendingReply {
            tag: RequestTag(root_a_ptr as usize),
            outcome: ReplyOutcome::Ok { body: vec![0u8; 8] },
        };

        let mut completed = Vec::new();
        let finished = unsafe {
            handle_reply(reply, &mut pending, 1, 2, &mut pool, &mut protocol, |p, status, _| {
                completed.push((p, status));
            })
        };

        assert_eq!(finished, root_a_ptr);
        assert_eq!(protocol.requests.len(), 1);
        assert_eq!(protocol.requests[0].2.0, root_b_ptr as usize);
        assert!(pending.is_empty());
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].1, PacketStatus::Ok);
    }

    #[test]
    fn transport_error_completes_every_chain_member() {
        let data = [1u8; 128];
        let mut p1 = singleton(Op::CreateAccounts, &data);
        let p1_ptr = p1.as_mut() as *mut Packet;
        let mut p2 = singleton(Op::CreateAccounts, &data);
        let p2_ptr = p2.as_mut() as *mut Packet;
        p1.batch_next = p2_ptr;
        p1.batch_tail = p2_ptr;
        p1.batch_size = 256;

        let mut pending = PendingQueue::new();
        let mut protocol = FakeProtocol::new();
        let mut pool = FakePool;

        let reply = PendingReply {
            tag: RequestTag(p1_ptr as usize),
            outcome: ReplyOutcome::TransportError,
        };

        let mut completed = Vec::new();
        unsafe {
            handle_reply(reply, &mut pending, 1, 2, &mut pool, &mut protocol, |p, status, _| {
                completed.push((p, status));
            })
        };

        assert_eq!(completed.len(), 2);
        assert!(completed.iter().all(|(_, s)| *s == PacketStatus::TransportError));
    }
}
