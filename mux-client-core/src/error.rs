//! Init-time and acquire-time error surface.
//!
//! Hand-written `Display`/`std::error::Error` impls, following the
//! convention used throughout this workspace's collaborators rather than
//! pulling in a derive-macro error crate: the error set here is small,
//! closed, and each variant's message is simple enough not to benefit from
//! one.

use std::fmt;

/// Failure surfaced from [`crate::context::Context::init`].
#[derive(Debug)]
pub enum InitStatus {
    /// `concurrency_max` was outside `1..=8192`.
    ConcurrencyMaxInvalid,
    /// An address in the cluster address list could not be parsed.
    AddressInvalid,
    /// More addresses were supplied than the compiled-in replica cap.
    AddressLimitExceeded,
    /// The OS refused to hand over a resource the core needs (thread, fd).
    SystemResources(std::io::Error),
    /// The allocator could not satisfy a request.
    OutOfMemory,
    /// Anything else; the core has no more specific diagnosis to offer.
    Unexpected(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for InitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitStatus::ConcurrencyMaxInvalid => {
                write!(f, "concurrency_max must be in 1..=8192")
            }
            InitStatus::AddressInvalid => write!(f, "malformed cluster address"),
            InitStatus::AddressLimitExceeded => {
                write!(f, "more addresses supplied than the replica cap allows")
            }
            InitStatus::SystemResources(e) => write!(f, "system resource error: {e}"),
            InitStatus::OutOfMemory => write!(f, "out of memory"),
            InitStatus::Unexpected(e) => write!(f, "unexpected error: {e}"),
        }
    }
}

impl std::error::Error for InitStatus {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InitStatus::SystemResources(e) => Some(e),
            InitStatus::Unexpected(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for InitStatus {
    fn from(e: std::io::Error) -> Self {
        InitStatus::SystemResources(e)
    }
}

/// Failure surfaced from [`crate::context::Context::acquire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireStatus {
    /// Every packet in the pool is currently in use.
    ConcurrencyMaxExceeded,
    /// The `Context` is terminating; no further packets will be handed out.
    Shutdown,
}

impl fmt::Display for AcquireStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcquireStatus::ConcurrencyMaxExceeded => write!(f, "concurrency_max exceeded"),
            AcquireStatus::Shutdown => write!(f, "client is shutting down"),
        }
    }
}

impl std::error::Error for AcquireStatus {}
