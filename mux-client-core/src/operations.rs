//! The closed enumeration of request variants and their per-operation
//! properties, resolved at compile time.
//!
//! Every request variant needs three pieces of static information before a
//! packet can be admitted: its event size (for size validation), whether it
//! may share a batch with other packets, and how its reply is demultiplexed.
//! This module is the table-driven alternative the design notes call out —
//! a closed `enum` plus a `const` array, rather than a `HashMap` built at
//! runtime.

/// A request variant. `#[repr(u8)]` so it round-trips through the FFI
/// boundary as a single byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Operation {
    CreateAccounts = 1,
    CreateTransfers = 2,
    LookupAccounts = 3,
    LookupTransfers = 4,
    QueryAccounts = 5,
    QueryTransfers = 6,
}

impl Operation {
    /// Resolve a raw wire code to an `Operation`, or `None` if it names no
    /// known request variant (`invalid_operation`).
    #[inline]
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Operation::CreateAccounts),
            2 => Some(Operation::CreateTransfers),
            3 => Some(Operation::LookupAccounts),
            4 => Some(Operation::LookupTransfers),
            5 => Some(Operation::QueryAccounts),
            6 => Some(Operation::QueryTransfers),
            _ => None,
        }
    }

    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    #[inline]
    fn spec(self) -> &'static OperationSpec {
        &OPERATION_TABLE[(self as u8 - 1) as usize]
    }

    /// Size in bytes of one request event for this operation.
    #[inline]
    pub fn event_size(self) -> u32 {
        self.spec().event_size
    }

    /// Size in bytes of one reply event for this operation (only meaningful
    /// when [`Self::demux_kind`] is [`DemuxKind::Aligned`]).
    #[inline]
    pub fn reply_event_size(self) -> u32 {
        self.spec().reply_event_size
    }

    /// Whether packets of this operation may be coalesced with other
    /// packets of the same operation into one batch.
    #[inline]
    pub fn batching_allowed(self) -> bool {
        self.spec().batching_allowed
    }

    /// How a reply to this operation is carved into per-packet slices.
    #[inline]
    pub fn demux_kind(self) -> DemuxKind {
        self.spec().demux_kind
    }
}

/// How a batched reply is partitioned back to its member packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemuxKind {
    /// The reply is index-aligned with the request: member `i`'s events
    /// occupy a fixed-size subrange computed purely from a running offset.
    Aligned,
    /// The reply is a sparse set of `(index, event)` pairs (e.g. only
    /// failures are reported); members are carved out by partitioning on
    /// the index field and rebasing it to the member's local range.
    Sparse,
}

struct OperationSpec {
    event_size: u32,
    reply_event_size: u32,
    batching_allowed: bool,
    demux_kind: DemuxKind,
}

/// Size in bytes of one sparse reply event: a `(u32 index, u32 reason)` pair
/// reporting one rejected request event.
pub const SPARSE_REPLY_EVENT_SIZE: u32 = 8;

const OPERATION_TABLE: [OperationSpec; 6] = [
    // CreateAccounts
    OperationSpec {
        event_size: 128,
        reply_event_size: SPARSE_REPLY_EVENT_SIZE,
        batching_allowed: true,
        demux_kind: DemuxKind::Sparse,
    },
    // CreateTransfers
    OperationSpec {
        event_size: 128,
        reply_event_size: SPARSE_REPLY_EVENT_SIZE,
        batching_allowed: true,
        demux_kind: DemuxKind::Sparse,
    },
    // LookupAccounts
    OperationSpec {
        event_size: 16,
        reply_event_size: 128,
        batching_allowed: true,
        demux_kind: DemuxKind::Aligned,
    },
    // LookupTransfers
    OperationSpec {
        event_size: 16,
        reply_event_size: 128,
        batching_allowed: true,
        demux_kind: DemuxKind::Aligned,
    },
    // QueryAccounts: filter-shaped request, variable-length result set.
    // Never batched, so the whole reply goes to the single submitting
    // packet regardless of `reply_event_size`.
    OperationSpec {
        event_size: 64,
        reply_event_size: 128,
        batching_allowed: false,
        demux_kind: DemuxKind::Aligned,
    },
    // QueryTransfers
    OperationSpec {
        event_size: 64,
        reply_event_size: 128,
        batching_allowed: false,
        demux_kind: DemuxKind::Aligned,
    },
];
