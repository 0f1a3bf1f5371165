//! Cluster address list parsing.
//!
//! The format is deliberately not URL syntax (no scheme, bare `host:port`
//! pairs separated by commas or spaces) so a small hand-written parser is a
//! better fit than a general-purpose URL crate, the same judgment call the
//! teacher workspace makes for its own small formats (e.g. an EAL core-list
//! string) rather than reaching for a heavier dependency.

use arrayvec::ArrayVec;

use crate::error::InitStatus;

/// Maximum number of replica addresses accepted by [`AddressList::parse`].
///
/// A compile-time cap, not a runtime config knob: bounds the fixed-size
/// storage the dispatcher would otherwise need for replica bookkeeping, the
/// same way the teacher workspace bounds a burst buffer with a const
/// generic rather than a `Vec`.
pub const MAX_REPLICAS: usize = 6;

/// One parsed `host:port` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub host: String,
    pub port: u16,
}

/// A parsed, bounded list of cluster replica addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressList {
    addresses: ArrayVec<Address, MAX_REPLICAS>,
}

impl AddressList {
    /// Parse a comma- or space-separated list of `host:port` entries.
    ///
    /// Returns [`InitStatus::AddressLimitExceeded`] if more than
    /// [`MAX_REPLICAS`] entries are present, or [`InitStatus::AddressInvalid`]
    /// if any entry is not a well-formed `host:port` pair.
    pub fn parse(raw: &str) -> Result<Self, InitStatus> {
        let entries: Vec<&str> = raw
            .split([',', ' '])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();

        if entries.is_empty() {
            return Err(InitStatus::AddressInvalid);
        }
        if entries.len() > MAX_REPLICAS {
            return Err(InitStatus::AddressLimitExceeded);
        }

        let mut addresses = ArrayVec::new();
        for entry in entries {
            addresses.push(parse_one(entry)?);
        }

        Ok(AddressList { addresses })
    }

    pub fn as_slice(&self) -> &[Address] {
        &self.addresses
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

fn parse_one(entry: &str) -> Result<Address, InitStatus> {
    let (host, port) = entry.rsplit_once(':').ok_or(InitStatus::AddressInvalid)?;
    if host.is_empty() {
        return Err(InitStatus::AddressInvalid);
    }
    let port: u16 = port.parse().map_err(|_| InitStatus::AddressInvalid)?;
    Ok(Address {
        host: host.to_string(),
        port,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_separated() {
        let list = AddressList::parse("10.0.0.1:3000,10.0.0.2:3000").unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list.as_slice()[0].port, 3000);
    }

    #[test]
    fn parses_space_separated() {
        let list = AddressList::parse("host-a:9000 host-b:9001").unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list.as_slice()[1].host, "host-b");
    }

    #[test]
    fn rejects_malformed_entry() {
        assert!(matches!(
            AddressList::parse("not-an-address"),
            Err(InitStatus::AddressInvalid)
        ));
        assert!(matches!(
            AddressList::parse("host:notaport"),
            Err(InitStatus::AddressInvalid)
        ));
    }

    #[test]
    fn rejects_too_many_replicas() {
        let raw = (0..MAX_REPLICAS + 1)
            .map(|i| format!("host{i}:3000"))
            .collect::<Vec<_>>()
            .join(",");
        assert!(matches!(
            AddressList::parse(&raw),
            Err(InitStatus::AddressLimitExceeded)
        ));
    }

    #[test]
    fn rejects_empty_list() {
        assert!(matches!(
            AddressList::parse("   "),
            Err(InitStatus::AddressInvalid)
        ));
    }
}
