//! The stable C ABI (§6): opaque client and packet handles, a caller-owned
//! completion function pointer, and five entry points covering the whole of
//! the core's producer-facing surface.
//!
//! A 128-bit value has no native C ABI representation, so `cluster_id`
//! crosses this boundary as a high/low `u64` pair, reassembled on this side.

use std::ffi::{c_char, CStr};
use std::mem::MaybeUninit;
use std::ptr;

use mux_client_core::{
    AcquireStatus, ClientConfig, CompletionCallback, Context, HeapMessagePool, IdleReactor,
    InitStatus, Message, MessagePool as _, Operation, Packet, PendingReply, ProtocolClient,
    ReplyOutcome, RequestTag,
};

/// Opaque client handle returned by [`mux_client_init`] and consumed by
/// every other entry point.
pub struct MuxClient {
    context: Context,
}

/// Mirrors [`mux_client_core::InitStatus`] as a C-ABI-safe discriminant.
#[repr(i32)]
pub enum MuxInitStatus {
    Ok = 0,
    ConcurrencyMaxInvalid = 1,
    AddressInvalid = 2,
    AddressLimitExceeded = 3,
    SystemResources = 4,
    OutOfMemory = 5,
    Unexpected = 6,
}

impl From<&InitStatus> for MuxInitStatus {
    fn from(status: &InitStatus) -> Self {
        match status {
            InitStatus::ConcurrencyMaxInvalid => MuxInitStatus::ConcurrencyMaxInvalid,
            InitStatus::AddressInvalid => MuxInitStatus::AddressInvalid,
            InitStatus::AddressLimitExceeded => MuxInitStatus::AddressLimitExceeded,
            InitStatus::SystemResources(_) => MuxInitStatus::SystemResources,
            InitStatus::OutOfMemory => MuxInitStatus::OutOfMemory,
            InitStatus::Unexpected(_) => MuxInitStatus::Unexpected,
        }
    }
}

/// Mirrors [`mux_client_core::AcquireStatus`].
#[repr(i32)]
pub enum MuxAcquireStatus {
    Ok = 0,
    ConcurrencyMaxExceeded = 1,
    Shutdown = 2,
}

impl From<AcquireStatus> for MuxAcquireStatus {
    fn from(status: AcquireStatus) -> Self {
        match status {
            AcquireStatus::ConcurrencyMaxExceeded => MuxAcquireStatus::ConcurrencyMaxExceeded,
            AcquireStatus::Shutdown => MuxAcquireStatus::Shutdown,
        }
    }
}

/// `completion_ctx` is returned verbatim; `client` is this call's own
/// handle; `packet` carries `status`; `reply_ptr`/`reply_len` are null/0
/// unless `status == ok`.
pub type MuxCompletionFn = extern "C" fn(
    completion_ctx: usize,
    client: *mut MuxClient,
    packet: *mut Packet,
    reply_ptr: *const u8,
    reply_len: usize,
);

/// Stand-in for the cluster wire protocol, which this crate consumes but
/// does not implement (§1, out of scope — "assumed as a protocol client
/// capability"). Registration completes on the first tick; every request
/// afterwards reports a transport error. This is enough to exercise the
/// whole lifecycle end to end without a live cluster; a real deployment
/// replaces [`NullProtocolClient::new`] with a client that actually speaks
/// the wire protocol.
struct NullProtocolClient {
    inflight: Option<RequestTag>,
    registered: bool,
}

impl NullProtocolClient {
    fn new() -> Self {
        Self { inflight: None, registered: false }
    }
}

impl ProtocolClient for NullProtocolClient {
    fn request_inflight(&self) -> bool {
        self.inflight.is_some()
    }

    fn raw_request(&mut self, _operation: Operation, _message: Message, tag: RequestTag) {
        self.inflight = Some(tag);
    }

    fn tick(&mut self) {
        self.registered = true;
    }

    fn poll_reply(&mut self) -> Option<PendingReply> {
        let tag = self.inflight.take()?;
        Some(PendingReply { tag, outcome: ReplyOutcome::TransportError })
    }

    fn begin_registration(&mut self) {}

    fn registered(&self) -> bool {
        self.registered
    }
}

/// Bring up a client and start its reactor thread.
///
/// Resolves the cyclic-reference design note (§9) by pinning the client's
/// storage before `Context::init` runs: the completion closure captures the
/// address the handle will live at, and that address is filled in only once
/// `Context::init` succeeds. If init fails, the placeholder is freed and
/// nothing has been handed to the caller.
///
/// # Safety
/// `addresses` must be a valid, NUL-terminated UTF-8 C string. `out_client`
/// must be a valid, writable pointer. `completion_fn` must be safe to call
/// from the reactor thread for the client's entire lifetime.
#[no_mangle]
pub unsafe extern "C" fn mux_client_init(
    out_client: *mut *mut MuxClient,
    cluster_id_high: u64,
    cluster_id_low: u64,
    addresses: *const c_char,
    concurrency_max: u32,
    completion_ctx: usize,
    completion_fn: MuxCompletionFn,
) -> MuxInitStatus {
    let addresses = match unsafe { CStr::from_ptr(addresses) }.to_str() {
        Ok(s) => s,
        Err(_) => return MuxInitStatus::AddressInvalid,
    };
    let cluster_id = ((cluster_id_high as u128) << 64) | cluster_id_low as u128;

    let placeholder: Box<MaybeUninit<MuxClient>> = Box::new(MaybeUninit::uninit());
    let client_ptr = Box::into_raw(placeholder) as *mut MuxClient;

    let completion: CompletionCallback = Box::new(move |packet, reply| {
        let (reply_ptr, reply_len) = if reply.is_empty() { (ptr::null(), 0) } else { (reply.as_ptr(), reply.len()) };
        completion_fn(completion_ctx, client_ptr, packet, reply_ptr, reply_len);
    });

    let config = ClientConfig::new(cluster_id, addresses).concurrency_max(concurrency_max);

    match Context::init(config, IdleReactor::new(), NullProtocolClient::new(), HeapMessagePool, completion) {
        Ok(context) => {
            unsafe { client_ptr.write(MuxClient { context }) };
            unsafe { *out_client = client_ptr };
            MuxInitStatus::Ok
        }
        Err(e) => {
            let status = MuxInitStatus::from(&e);
            tracing::warn!(error = %e, "mux_client_init failed");
            unsafe { drop(Box::from_raw(client_ptr as *mut MaybeUninit<MuxClient>)) };
            status
        }
    }
}

/// # Safety
/// `client` must be a live handle from [`mux_client_init`]; `out_packet`
/// must be a valid, writable pointer.
#[no_mangle]
pub unsafe extern "C" fn mux_client_acquire_packet(
    client: *mut MuxClient,
    out_packet: *mut *mut Packet,
) -> MuxAcquireStatus {
    let client = unsafe { &*client };
    match client.context.acquire() {
        Ok(packet) => {
            unsafe { *out_packet = packet };
            MuxAcquireStatus::Ok
        }
        Err(e) => MuxAcquireStatus::from(e),
    }
}

/// # Safety
/// `client` must be a live handle; `packet` must have come from
/// [`mux_client_acquire_packet`] on the same client and not already be
/// released.
#[no_mangle]
pub unsafe extern "C" fn mux_client_release_packet(client: *mut MuxClient, packet: *mut Packet) {
    let client = unsafe { &*client };
    client.context.release(packet);
}

/// # Safety
/// `client` must be a live handle; `packet` must be an acquired packet the
/// caller has populated (`operation_code`, `data`, `data_size`, `user_tag`)
/// and not yet submitted.
#[no_mangle]
pub unsafe extern "C" fn mux_client_submit(client: *mut MuxClient, packet: *mut Packet) {
    let client = unsafe { &*client };
    unsafe { client.context.submit(packet) };
}

/// Shut down and free a client. Safe to call more than once is not
/// supported at the FFI boundary — unlike [`Context::deinit`], this takes
/// ownership of `client` and the pointer must not be used again.
///
/// # Safety
/// `client` must be a live handle from [`mux_client_init`] not already
/// passed to this function.
#[no_mangle]
pub unsafe extern "C" fn mux_client_deinit(client: *mut MuxClient) {
    if client.is_null() {
        return;
    }
    let client = unsafe { Box::from_raw(client) };
    client.context.deinit();
}
