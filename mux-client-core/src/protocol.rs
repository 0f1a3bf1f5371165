//! The contract the core consumes from its two external collaborators: the
//! cluster protocol client and the message-buffer pool (§6, "Protocol
//! client contract (consumed)"). Both are out of scope for this
//! specification's core and are modeled here as traits so the dispatcher can
//! be driven by a real cluster client or, in tests, by an in-memory fake.

use crate::operations::Operation;

/// An opaque tag the dispatcher attaches to an outstanding request and the
/// protocol client returns verbatim alongside the reply. In this
/// implementation it is the address of the batch root packet — already a
/// stable handle since packet storage is pinned for the Context's lifetime,
/// per the design note's "prefer a handle... plus a lookup" resolution (see
/// DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTag(pub(crate) usize);

/// A request or reply message body. The core treats the bytes as opaque; it
/// only ever writes a header plus concatenated per-packet event data.
pub struct Message {
    pub buf: Vec<u8>,
}

/// Message buffer pooling capability (§1, out of scope for this spec's
/// core; a minimal default is provided so the dispatcher has something
/// concrete to allocate from).
pub trait MessagePool {
    fn get_message(&mut self, capacity: usize) -> Message;
    fn release_message(&mut self, message: Message);
}

/// Trivial message pool: allocates a fresh buffer per request and drops it
/// on release. Adequate because message pooling internals are explicitly
/// out of scope (§1); a size-classed pool would be solving a problem this
/// specification does not ask the core to own.
#[derive(Default)]
pub struct HeapMessagePool;

impl MessagePool for HeapMessagePool {
    fn get_message(&mut self, capacity: usize) -> Message {
        Message {
            buf: Vec::with_capacity(capacity),
        }
    }

    fn release_message(&mut self, _message: Message) {}
}

/// Outcome of a request, as observed by the dispatcher when it polls for a
/// reply.
pub enum ReplyOutcome {
    /// The request completed; `body` is the full reply payload.
    Ok { body: Vec<u8> },
    /// The cluster layer could not complete the request. The core treats
    /// the underlying reason as opaque (§7: "Protocol-level failures are
    /// opaque to the core").
    TransportError,
}

/// One reply the dispatcher has not yet processed.
pub struct PendingReply {
    pub tag: RequestTag,
    pub outcome: ReplyOutcome,
}

/// The one-request-inflight cluster protocol client (§6, consumed).
///
/// Driven by polling rather than an inversion-of-control callback: `tick`
/// advances the client's internal state machine, and `poll_reply`/
/// `poll_registered` surface completed work. This keeps the dispatcher free
/// of raw callbacks into the `Context` — the alternative the design notes
/// call out to the cyclic-reference problem (§9) — since the only thing
/// handed across the boundary is the opaque [`RequestTag`].
pub trait ProtocolClient {
    /// Whether a request is currently outstanding. The dispatcher must never
    /// call `raw_request` while this is true (§8, invariant 2).
    fn request_inflight(&self) -> bool;

    /// Submit the only request allowed in flight. Precondition:
    /// `!self.request_inflight()`.
    fn raw_request(&mut self, operation: Operation, message: Message, tag: RequestTag);

    /// Advance the client's internal state (e.g. drive the wire). Called
    /// once per reactor tick.
    fn tick(&mut self);

    /// Take the next completed reply, if any, clearing the inflight slot.
    fn poll_reply(&mut self) -> Option<PendingReply>;

    /// Begin the one-shot registration handshake. Called once, at init.
    fn begin_registration(&mut self);

    /// Whether the registration handshake has completed. Polled once per
    /// tick until it returns `true`; no `raw_request` may be issued before
    /// that point (§8, invariant 8).
    fn registered(&self) -> bool;
}
