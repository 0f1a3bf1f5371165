//! In-memory fakes for `mux-client-core`'s two external collaborators
//! (the protocol client and the reactor), plus small harness helpers for
//! driving a [`Context`] from a test without a live cluster or OS reactor.
//!
//! Mirrors the role the teacher workspace's own `*-test` support crate
//! plays: the core crate stays generic over its collaborators via traits,
//! and this crate supplies deterministic, introspectable substitutes so the
//! concurrency and batching invariants can be exercised directly.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use mux_client_core::{
    ClientConfig, CompletionCallback, Context, HeapMessagePool, Message, Operation, PacketStatus,
    PendingReply, ProtocolClient, Reactor, ReplyOutcome, RequestTag, Signal,
};

/// One request the fake protocol client has accepted, recorded for
/// assertions (batch shape, dispatch order).
#[derive(Debug, Clone)]
pub struct DispatchRecord {
    pub operation: Operation,
    /// Length of the request body *after* the header (cluster id, client
    /// id, operation, body size) — i.e. `root.batch_size` as written by the
    /// dispatcher.
    pub body_len: usize,
}

/// `cluster_id(16) + client_id(16) + operation(1) + body_size(4)`, matching
/// the header the dispatcher writes (§4.5).
const HEADER_SIZE: usize = 16 + 16 + 1 + 4;

struct Shared {
    registered: bool,
    ticks_until_registered: u32,
    inflight: Option<(Operation, RequestTag, usize)>,
    hold_replies: bool,
    dispatch_log: Vec<DispatchRecord>,
    raw_request_while_inflight: bool,
    reply_before_registered: bool,
}

/// A fake single-inflight cluster protocol client.
///
/// Registration completes after a configurable number of `tick()` calls.
/// Replies are held back until [`LoopbackHandle::release_replies`] is
/// called, which lets a test observe the batcher's pending-queue behavior
/// (S2/S3/S4 in the specification) while a request is still outstanding.
/// Every request is logged to [`LoopbackHandle::dispatch_log`] so a test can
/// assert batch shape and dispatch order without reaching into the core's
/// private pending queue.
pub struct LoopbackProtocolClient {
    shared: Arc<Mutex<Shared>>,
}

/// A cloneable handle onto a [`LoopbackProtocolClient`]'s shared state,
/// usable from the test thread while the client itself runs on the reactor
/// thread inside a `Context`.
#[derive(Clone)]
pub struct LoopbackHandle {
    shared: Arc<Mutex<Shared>>,
}

impl LoopbackProtocolClient {
    /// A client that registers on its first `tick()` and replies
    /// immediately (unless held).
    pub fn new() -> (Self, LoopbackHandle) {
        Self::with_registration_delay(1)
    }

    /// A client that takes `ticks` calls to `tick()` before registration
    /// completes, so a test can assert nothing is dispatched before then
    /// (§8, invariant 8).
    pub fn with_registration_delay(ticks: u32) -> (Self, LoopbackHandle) {
        let shared = Arc::new(Mutex::new(Shared {
            registered: false,
            ticks_until_registered: ticks.max(1),
            inflight: None,
            hold_replies: false,
            dispatch_log: Vec::new(),
            raw_request_while_inflight: false,
            reply_before_registered: false,
        }));
        (
            Self { shared: shared.clone() },
            LoopbackHandle { shared },
        )
    }
}

impl ProtocolClient for LoopbackProtocolClient {
    fn request_inflight(&self) -> bool {
        self.shared.lock().unwrap().inflight.is_some()
    }

    fn raw_request(&mut self, operation: Operation, message: Message, tag: RequestTag) {
        let mut shared = self.shared.lock().unwrap();
        if shared.inflight.is_some() {
            // The dispatcher must never do this (§8, invariant 2). Record
            // rather than panic: a panic here would run on the reactor
            // thread and hang the test waiting on `deinit`'s join.
            shared.raw_request_while_inflight = true;
        }
        let body_len = message.buf.len() - HEADER_SIZE;
        shared.dispatch_log.push(DispatchRecord { operation, body_len });
        shared.inflight = Some((operation, tag, body_len));
    }

    fn tick(&mut self) {
        let mut shared = self.shared.lock().unwrap();
        if !shared.registered {
            shared.ticks_until_registered = shared.ticks_until_registered.saturating_sub(1);
            if shared.ticks_until_registered == 0 {
                shared.registered = true;
            }
        }
    }

    fn poll_reply(&mut self) -> Option<PendingReply> {
        let mut shared = self.shared.lock().unwrap();
        if shared.hold_replies {
            return None;
        }
        if !shared.registered {
            if shared.inflight.is_some() {
                shared.reply_before_registered = true;
            }
            return None;
        }
        let (operation, tag, body_len) = shared.inflight.take()?;
        let event_count = body_len as u32 / operation.event_size();
        let body = match operation.demux_kind() {
            mux_client_core::DemuxKind::Aligned => {
                vec![0u8; (event_count * operation.reply_event_size()) as usize]
            }
            // No failures reported: an empty sparse stream is a valid,
            // well-formed reply (every submitted event succeeded).
            mux_client_core::DemuxKind::Sparse => Vec::new(),
        };
        Some(PendingReply { tag, outcome: ReplyOutcome::Ok { body } })
    }

    fn begin_registration(&mut self) {
        // Registration is driven purely by the `tick()` countdown here;
        // nothing to kick off separately.
    }

    fn registered(&self) -> bool {
        self.shared.lock().unwrap().registered
    }
}

impl LoopbackHandle {
    /// Stop returning replies from `poll_reply` until [`Self::release_replies`].
    pub fn hold_replies(&self) {
        self.shared.lock().unwrap().hold_replies = true;
    }

    /// Resume returning replies.
    pub fn release_replies(&self) {
        self.shared.lock().unwrap().hold_replies = false;
    }

    /// Every request accepted so far, in dispatch order.
    pub fn dispatch_log(&self) -> Vec<DispatchRecord> {
        self.shared.lock().unwrap().dispatch_log.clone()
    }

    /// Whether `raw_request` was ever called while another request was
    /// already inflight — a violation of the single-inflight invariant
    /// (§8, invariant 2).
    pub fn single_inflight_violated(&self) -> bool {
        self.shared.lock().unwrap().raw_request_while_inflight
    }

    /// Whether a reply was ever produced before registration completed —
    /// a violation of the registration gate (§8, invariant 8).
    pub fn replied_before_registered(&self) -> bool {
        self.shared.lock().unwrap().reply_before_registered
    }
}

/// A [`Reactor`] that suspends purely on its [`Signal`] — there is no real
/// I/O to poll in tests, so `run_for` degenerates to waiting for either a
/// notification or the tick timeout.
pub struct TestReactor {
    signal: Signal,
}

impl TestReactor {
    pub fn new() -> Self {
        Self { signal: Signal::new() }
    }
}

impl Default for TestReactor {
    fn default() -> Self {
        Self::new()
    }
}

impl Reactor for TestReactor {
    fn run_for(&mut self, tick: Duration) -> Result<(), mux_client_core::ReactorError> {
        self.signal.wait_timeout(tick);
        Ok(())
    }

    fn signal(&self) -> Signal {
        self.signal.clone()
    }
}

/// One packet's observed completion, captured by [`recording_completion`].
#[derive(Debug, Clone)]
pub struct CompletionRecord {
    pub user_tag: u128,
    pub status: PacketStatus,
    pub reply: Vec<u8>,
}

/// Shared log a [`CompletionCallback`] built by [`recording_completion`]
/// appends to. Keyed by `user_tag` rather than packet address, since a
/// released packet's slot is reused by a later `acquire`.
#[derive(Clone, Default)]
pub struct CompletionLog {
    inner: Arc<Mutex<Vec<CompletionRecord>>>,
}

impl CompletionLog {
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> Vec<CompletionRecord> {
        self.inner.lock().unwrap().clone()
    }

    /// Block until at least `n` completions have been recorded, or panic
    /// after `timeout`.
    pub fn wait_for(&self, n: usize, timeout: Duration) -> Vec<CompletionRecord> {
        let deadline = Instant::now() + timeout;
        loop {
            let snap = self.snapshot();
            if snap.len() >= n {
                return snap;
            }
            assert!(
                Instant::now() < deadline,
                "timed out waiting for {n} completions, only {} observed",
                snap.len()
            );
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    /// Find the completion for a specific `user_tag`, waiting up to
    /// `timeout` if it hasn't arrived yet.
    pub fn wait_for_tag(&self, user_tag: u128, timeout: Duration) -> CompletionRecord {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(found) = self.inner.lock().unwrap().iter().find(|r| r.user_tag == user_tag) {
                return found.clone();
            }
            assert!(Instant::now() < deadline, "timed out waiting for completion of tag {user_tag}");
            std::thread::sleep(Duration::from_millis(2));
        }
    }
}

/// Build a [`CompletionCallback`] that records every completion into a
/// [`CompletionLog`] the test thread can poll.
pub fn recording_completion() -> (CompletionCallback, CompletionLog) {
    let log = CompletionLog::default();
    let recorder = log.clone();
    let cb: CompletionCallback = Box::new(move |packet, reply| {
        let (user_tag, status) = unsafe { ((*packet).user_tag, (*packet).status) };
        recorder
            .inner
            .lock()
            .unwrap()
            .push(CompletionRecord { user_tag, status, reply: reply.to_vec() });
    });
    (cb, log)
}

/// Bring up a `Context` wired to a fresh [`LoopbackProtocolClient`] and
/// [`TestReactor`], returning the handle used to control replies/
/// registration and the log completions land in.
pub fn test_context(concurrency_max: u32) -> (Context, LoopbackHandle, CompletionLog) {
    test_context_with_registration_delay(concurrency_max, 1)
}

pub fn test_context_with_registration_delay(
    concurrency_max: u32,
    registration_delay_ticks: u32,
) -> (Context, LoopbackHandle, CompletionLog) {
    let (protocol, handle) = LoopbackProtocolClient::with_registration_delay(registration_delay_ticks);
    let (completion, log) = recording_completion();
    let config = ClientConfig::new(0xC0FFEE, "127.0.0.1:3000").concurrency_max(concurrency_max);
    let ctx = Context::init(config, TestReactor::new(), protocol, HeapMessagePool, completion)
        .expect("test context init must succeed");
    (ctx, handle, log)
}

/// Acquire a packet from `ctx` and submit it with the given operation,
/// payload, and `user_tag`. `data` must outlive the packet's completion —
/// tests typically keep it alive on the stack for the scenario's duration.
///
/// Returns nothing: the packet may be recycled into another `acquire`
/// (possibly on a different thread) the instant it completes, so holding
/// onto its address past submission is not safe. Identify a submission's
/// completion by `user_tag` via [`CompletionLog::wait_for_tag`] instead.
///
/// # Safety
/// `data` must remain valid and unmodified until the submitted packet
/// completes.
pub unsafe fn submit(ctx: &Context, operation: Operation, data: &[u8], user_tag: u128) {
    let packet = ctx.acquire().expect("pool must have room for this submission");
    unsafe {
        (*packet).operation_code = operation.code();
        (*packet).data = data.as_ptr();
        (*packet).data_size = data.len() as u32;
        (*packet).user_tag = user_tag;
        ctx.submit(packet);
    }
}

/// Re-export so integration tests don't need a separate `mux-client-core`
/// dependency declaration just to name these types.
pub use mux_client_core::{DemuxKind, InitStatus, Operation as Op, StatsSnapshot};
