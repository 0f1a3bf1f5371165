//! The `Context`: the one long-lived object the rest of this crate exists to
//! support (§3, §4.7). Owns packet storage, the submission/pending queues,
//! and the reactor thread; exposes the producer-facing API any number of
//! application threads call concurrently.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use crate::batcher::{self, Admission};
use crate::config::{ClientConfig, DEFAULT_TICK};
use crate::dispatcher;
use crate::error::{AcquireStatus, InitStatus};
use crate::packet::Packet;
use crate::pending::PendingQueue;
use crate::pool::PacketPool;
use crate::protocol::{MessagePool, ProtocolClient};
use crate::reactor::Reactor;
use crate::stats::{Stats, StatsSnapshot};
use crate::submission::SubmissionStack;

#[cfg(any(test, debug_assertions))]
use crate::packet::PacketState;

/// Invoked once per completed packet, on the reactor thread, with the
/// packet (status already set) and its reply slice (empty unless
/// `status == PacketStatus::Ok`).
pub type CompletionCallback = Box<dyn Fn(*mut Packet, &[u8]) + Send + Sync>;

/// The multiplexer's client handle. `acquire`, `submit`, `release`, and
/// `deinit` are safe to call from any thread (§5); everything else lives on
/// the dedicated reactor thread spawned by [`Context::init`].
pub struct Context {
    cluster_id: u128,
    client_id: u128,
    pool: Arc<PacketPool>,
    submission: Arc<SubmissionStack>,
    shutdown: Arc<AtomicBool>,
    signal: crate::reactor::Signal,
    stats: Arc<Stats>,
    reactor_thread: Mutex<Option<thread::JoinHandle<()>>>,
}

impl Context {
    /// Bring up a `Context`: validate configuration, allocate packet
    /// storage, spawn the reactor thread, and kick off registration.
    /// Mirrors §4.7 steps (a)-(j); there is nothing to roll back on error
    /// before the reactor thread is spawned, since nothing below is
    /// allocated until validation succeeds.
    pub fn init<R, P, M>(
        config: ClientConfig,
        reactor: R,
        protocol: P,
        message_pool: M,
        completion: CompletionCallback,
    ) -> Result<Self, InitStatus>
    where
        R: Reactor + Send + 'static,
        P: ProtocolClient + Send + 'static,
        M: MessagePool + Send + 'static,
    {
        let (concurrency_max, _addresses) = config.build()?;
        let cluster_id = config.cluster_id();
        let client_id = random_client_id();

        let pool = Arc::new(PacketPool::new(concurrency_max));
        let submission = Arc::new(SubmissionStack::new());
        let shutdown = Arc::new(AtomicBool::new(false));
        let stats = Arc::new(Stats::default());
        let signal = reactor.signal();

        tracing::info!(client_id = %client_id, concurrency_max, "initializing mux-client context");

        let thread_pool = pool.clone();
        let thread_submission = submission.clone();
        let thread_shutdown = shutdown.clone();
        let thread_stats = stats.clone();

        let reactor_thread = thread::Builder::new()
            .name("mux-client-reactor".to_string())
            .spawn(move || {
                reactor_loop(RunState {
                    reactor,
                    protocol,
                    message_pool,
                    completion,
                    pool: thread_pool,
                    submission: thread_submission,
                    shutdown: thread_shutdown,
                    stats: thread_stats,
                    cluster_id,
                    client_id,
                })
            })?;

        Ok(Context {
            cluster_id,
            client_id,
            pool,
            submission,
            shutdown,
            signal,
            stats,
            reactor_thread: Mutex::new(Some(reactor_thread)),
        })
    }

    pub fn cluster_id(&self) -> u128 {
        self.cluster_id
    }

    pub fn client_id(&self) -> u128 {
        self.client_id
    }

    /// Acquire one packet from the free stack. Safe from any thread (§4.1).
    pub fn acquire(&self) -> Result<*mut Packet, AcquireStatus> {
        self.pool.acquire()
    }

    /// Return a packet to the free stack. Safe from any thread (§4.1).
    pub fn release(&self, packet: *mut Packet) {
        self.pool.release(packet);
    }

    /// Hand a packet to the multiplexer. Safe from any thread (§4.2).
    ///
    /// # Safety
    /// `packet` must have been returned by [`Self::acquire`] on this
    /// `Context` and not yet submitted or released.
    pub unsafe fn submit(&self, packet: *mut Packet) {
        #[cfg(any(test, debug_assertions))]
        unsafe {
            (*packet).set_state(PacketState::Submitted);
        }
        self.submission.push(packet);
        self.stats.record_submitted();
        self.signal.notify();
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Begin shutdown. The first caller to observe the flag's prior value as
    /// `false` joins the reactor thread and blocks until it exits; every
    /// later call is a no-op (§4.7).
    pub fn deinit(&self) {
        let was_already_shutdown = self.shutdown.swap(true, Ordering::AcqRel);
        self.pool.begin_shutdown();
        self.signal.notify();
        if !was_already_shutdown {
            if let Some(handle) = self.reactor_thread.lock().unwrap().take() {
                let _ = handle.join();
            }
        }
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        self.deinit();
    }
}

fn random_client_id() -> u128 {
    loop {
        let id: u128 = rand::random();
        if id != 0 {
            return id;
        }
    }
}

struct RunState<R, P, M> {
    reactor: R,
    protocol: P,
    message_pool: M,
    completion: CompletionCallback,
    pool: Arc<PacketPool>,
    submission: Arc<SubmissionStack>,
    shutdown: Arc<AtomicBool>,
    stats: Arc<Stats>,
    cluster_id: u128,
    client_id: u128,
}

/// The reactor thread's body (§4.7 "Reactor loop"). Runs until every
/// outstanding packet has been returned to the free stack after shutdown.
fn reactor_loop<R: Reactor, P: ProtocolClient, M: MessagePool>(mut state: RunState<R, P, M>) {
    let mut pending = PendingQueue::new();
    let mut drained_since_shutdown = 0usize;

    state.protocol.begin_registration();

    loop {
        if state.shutdown.load(Ordering::Acquire) {
            while state.pool.try_drain_one() {
                drained_since_shutdown += 1;
            }
            if drained_since_shutdown >= state.pool.capacity() {
                tracing::info!(client_id = %state.client_id, "reactor thread observed full drain, exiting");
                break;
            }
        }

        state.protocol.tick();

        if state.protocol.registered() {
            for packet in state.submission.drain() {
                match unsafe { batcher::admit(packet, &mut pending, state.protocol.request_inflight()) } {
                    Admission::Rejected => {
                        let status = unsafe { (*packet).status };
                        tracing::debug!(?status, "packet rejected during admission");
                        state.stats.record_rejected();
                        (state.completion)(packet, &[]);
                    }
                    Admission::DispatchNow(root) => {
                        unsafe {
                            dispatcher::submit(
                                root,
                                state.cluster_id,
                                state.client_id,
                                &mut state.message_pool,
                                &mut state.protocol,
                            )
                        };
                        state.stats.record_dispatched();
                    }
                    Admission::Queued => {
                        state.stats.record_queued();
                    }
                }
            }

            if !state.protocol.request_inflight() {
                if let Some(root) = pending.pop_front() {
                    unsafe {
                        dispatcher::submit(
                            root,
                            state.cluster_id,
                            state.client_id,
                            &mut state.message_pool,
                            &mut state.protocol,
                        )
                    };
                    state.stats.record_dispatched();
                }
            }

            if let Some(reply) = state.protocol.poll_reply() {
                state.stats.record_reply();
                unsafe {
                    dispatcher::handle_reply(
                        reply,
                        &mut pending,
                        state.cluster_id,
                        state.client_id,
                        &mut state.message_pool,
                        &mut state.protocol,
                        |packet, _status, slice| (state.completion)(packet, slice),
                    )
                };
            }
        }

        if let Err(e) = state.reactor.run_for(DEFAULT_TICK) {
            tracing::error!(client_id = %state.client_id, error = %e, "fatal reactor I/O error, aborting process");
            std::process::abort();
        }
    }
}
