//! Client configuration, built with a fluent builder in the style of the
//! teacher workspace's `MemPoolConfig`/`EthConf` (validated only when
//! consumed, never partially applied).

use crate::address::AddressList;
use crate::error::InitStatus;

/// Upper bound on `concurrency_max`, per the specification.
pub const MAX_CONCURRENCY_MAX: u32 = 8192;

/// Tick interval the reactor thread blocks for between iterations of its
/// loop when there is no signaled work (see [`crate::context::Context`]).
pub const DEFAULT_TICK: std::time::Duration = std::time::Duration::from_millis(10);

/// Maximum size, in bytes, of a request message body the dispatcher will
/// build (header + batched event data). Validation against this bound is
/// what produces [`crate::packet::PacketStatus::TooMuchData`].
pub const MAX_MESSAGE_BODY: usize = 1024 * 1024;

/// Builder for [`crate::context::Context::init`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    cluster_id: u128,
    addresses_raw: String,
    concurrency_max: u32,
}

impl ClientConfig {
    /// Start a config targeting the given cluster id and address list.
    pub fn new(cluster_id: u128, addresses: impl Into<String>) -> Self {
        Self {
            cluster_id,
            addresses_raw: addresses.into(),
            concurrency_max: 256,
        }
    }

    /// Set the maximum number of packets that may be in flight (acquired,
    /// submitted, pending, or inflight) at once. Must be in `1..=8192`.
    pub fn concurrency_max(mut self, concurrency_max: u32) -> Self {
        self.concurrency_max = concurrency_max;
        self
    }

    pub(crate) fn cluster_id(&self) -> u128 {
        self.cluster_id
    }

    /// Validate and parse the builder into its resolved parts.
    pub(crate) fn build(&self) -> Result<(u32, AddressList), InitStatus> {
        if self.concurrency_max == 0 || self.concurrency_max > MAX_CONCURRENCY_MAX {
            return Err(InitStatus::ConcurrencyMaxInvalid);
        }
        let addresses = AddressList::parse(&self.addresses_raw)?;
        Ok((self.concurrency_max, addresses))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_concurrency() {
        let cfg = ClientConfig::new(1, "localhost:3000").concurrency_max(0);
        assert!(matches!(
            cfg.build(),
            Err(InitStatus::ConcurrencyMaxInvalid)
        ));
    }

    #[test]
    fn rejects_concurrency_above_max() {
        let cfg = ClientConfig::new(1, "localhost:3000").concurrency_max(MAX_CONCURRENCY_MAX + 1);
        assert!(matches!(
            cfg.build(),
            Err(InitStatus::ConcurrencyMaxInvalid)
        ));
    }

    #[test]
    fn accepts_boundary_values() {
        assert!(
            ClientConfig::new(1, "localhost:3000")
                .concurrency_max(1)
                .build()
                .is_ok()
        );
        assert!(
            ClientConfig::new(1, "localhost:3000")
                .concurrency_max(MAX_CONCURRENCY_MAX)
                .build()
                .is_ok()
        );
    }
}
