//! CIDR blocks: a network address paired with a prefix length.

use crate::error::{IpPoolError, Result};
use crate::models::{same_version, IpNumber, Prefix};
use num_bigint::BigUint;
use serde::de;
use serde::{Deserialize, Deserializer, Serialize};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// An address block expressible as `network-address/prefix-length`.
///
/// The stored address is always the network address. Constructing a
/// `CidrRange` from a misaligned address normalizes it by masking down to the
/// block boundary; use [`CidrRange::new_strict`] to reject misalignment
/// instead.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CidrRange {
    network: IpNumber,
    prefix: Prefix,
}

impl CidrRange {
    /// Create a block from an address and prefix, normalizing the address to
    /// the block's network address. Fails on mixed versions.
    pub fn new(address: IpNumber, prefix: Prefix) -> Result<CidrRange> {
        if address.version() != prefix.version() {
            return Err(IpPoolError::MixedVersion {
                left: address.version(),
                right: prefix.version(),
            });
        }
        let network = IpNumber::new_unchecked(address.version(), address.value() & prefix.mask());
        Ok(CidrRange { network, prefix })
    }

    /// Like [`CidrRange::new`], but rejects addresses not already aligned to
    /// the prefix boundary.
    pub fn new_strict(address: IpNumber, prefix: Prefix) -> Result<CidrRange> {
        let range = CidrRange::new(address, prefix)?;
        if range.network != address {
            return Err(IpPoolError::InvalidCidr(format!(
                "{address}/{prefix} is not on a /{prefix} boundary"
            )));
        }
        Ok(range)
    }

    // Callers uphold that `network` is aligned and versions match.
    pub(crate) const fn new_unchecked(network: IpNumber, prefix: Prefix) -> CidrRange {
        CidrRange { network, prefix }
    }

    /// The network address (lowest address of the block).
    pub const fn network(&self) -> IpNumber {
        self.network
    }

    /// The prefix of this block.
    pub const fn prefix(&self) -> Prefix {
        self.prefix
    }

    /// First address of the block; same as the network address.
    pub const fn first(&self) -> IpNumber {
        self.network
    }

    /// Last address of the block: `first + size - 1`.
    pub fn last(&self) -> IpNumber {
        let host_mask = self.prefix.version().max_value() & !self.prefix.mask();
        IpNumber::new_unchecked(self.network.version(), self.network.value() | host_mask)
    }

    /// Number of addresses in the block.
    pub fn size(&self) -> BigUint {
        self.prefix.size()
    }

    /// Whether the given address falls inside this block.
    pub fn contains(&self, address: &IpNumber) -> bool {
        same_version(&self.network, address).is_ok()
            && self.first().value() <= address.value()
            && address.value() <= self.last().value()
    }
}

impl std::fmt::Display for CidrRange {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix)
    }
}

impl FromStr for CidrRange {
    type Err = IpPoolError;

    /// Parse `address/length` notation, e.g. `10.0.0.0/24` or `2001:db8::/32`.
    /// The address is normalized to the block boundary, matching
    /// [`CidrRange::new`].
    fn from_str(s: &str) -> Result<CidrRange> {
        let s = s.trim();
        let (addr_part, len_part) = s
            .split_once('/')
            .ok_or_else(|| IpPoolError::InvalidCidr(format!("missing '/' in {s:?}")))?;
        let length = u8::from_str(len_part)
            .map_err(|_| IpPoolError::InvalidCidr(format!("bad prefix length {len_part:?}")))?;
        let address = if addr_part.contains(':') {
            IpNumber::from(
                Ipv6Addr::from_str(addr_part)
                    .map_err(|_| IpPoolError::InvalidCidr(format!("bad address {addr_part:?}")))?,
            )
        } else {
            IpNumber::from(
                Ipv4Addr::from_str(addr_part)
                    .map_err(|_| IpPoolError::InvalidCidr(format!("bad address {addr_part:?}")))?,
            )
        };
        let prefix = Prefix::new(address.version(), length)?;
        CidrRange::new(address, prefix)
    }
}

impl Serialize for CidrRange {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for CidrRange {
    fn deserialize<D>(deserializer: D) -> std::result::Result<CidrRange, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        CidrRange::from_str(&s).map_err(de::Error::custom)
    }
}
