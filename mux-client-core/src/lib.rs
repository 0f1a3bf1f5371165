//! Batching multiplexer core.
//!
//! Coalesces independently submitted request packets into single-inflight
//! cluster requests, dispatches them over a pluggable protocol client, and
//! demultiplexes the reply back to each submitter. See [`Context`] for the
//! entry point.

mod address;
mod batcher;
mod config;
mod context;
mod demux;
mod dispatcher;
mod error;
mod operations;
mod packet;
mod pending;
mod pool;
mod protocol;
mod reactor;
mod stack;
mod stats;
mod submission;

pub use address::{Address, AddressList, MAX_REPLICAS};
pub use config::{ClientConfig, DEFAULT_TICK, MAX_CONCURRENCY_MAX, MAX_MESSAGE_BODY};
pub use context::{CompletionCallback, Context};
pub use error::{AcquireStatus, InitStatus};
pub use operations::{DemuxKind, Operation};
pub use packet::{Packet, PacketStatus};
pub use protocol::{HeapMessagePool, Message, MessagePool, PendingReply, ProtocolClient, ReplyOutcome, RequestTag};
pub use reactor::{IdleReactor, Reactor, ReactorError, Signal};
pub use stats::StatsSnapshot;
