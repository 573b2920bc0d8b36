//! Versioned IP address numbers.
//!
//! Provides [`IpNumber`], an IPv4/IPv6 address as an exact unsigned integer,
//! along with [`IpVersion`] describing the address family and its bit width.
//! All arithmetic is exact: values at the top of the IPv6 space round-trip
//! without truncation.

use crate::error::{IpPoolError, Result};
use std::cmp::Ordering;
use std::net::{Ipv4Addr, Ipv6Addr};

/// IP address family, carrying the bit width of its address space.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IpVersion {
    /// IPv4, 32-bit addresses.
    V4,
    /// IPv6, 128-bit addresses.
    V6,
}

impl IpVersion {
    /// Width of the address space in bits (32 or 128).
    pub const fn bit_size(&self) -> u8 {
        match self {
            IpVersion::V4 => 32,
            IpVersion::V6 => 128,
        }
    }

    /// Largest address value representable in this version.
    pub const fn max_value(&self) -> u128 {
        match self {
            IpVersion::V4 => u32::MAX as u128,
            IpVersion::V6 => u128::MAX,
        }
    }
}

impl std::fmt::Display for IpVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            IpVersion::V4 => write!(f, "IPv4"),
            IpVersion::V6 => write!(f, "IPv6"),
        }
    }
}

/// An IP address as an exact numeric value within its version's bit width.
///
/// Immutable value type: every arithmetic operation returns a new value or
/// fails. The derived ordering sorts by version first, then value; use
/// [`IpNumber::compare`] when mixing versions must be an error rather than
/// an ordering.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IpNumber {
    version: IpVersion,
    value: u128,
}

impl IpNumber {
    /// Create an IPv4 number from its 32-bit value.
    pub const fn v4(value: u32) -> IpNumber {
        IpNumber {
            version: IpVersion::V4,
            value: value as u128,
        }
    }

    /// Create an IPv6 number from its 128-bit value.
    pub const fn v6(value: u128) -> IpNumber {
        IpNumber {
            version: IpVersion::V6,
            value,
        }
    }

    /// Create a number for the given version, rejecting values wider than
    /// the version's address space.
    pub fn new(version: IpVersion, value: u128) -> Result<IpNumber> {
        if value > version.max_value() {
            return Err(IpPoolError::InvalidRange(format!(
                "{value:#x} does not fit a {version} address"
            )));
        }
        Ok(IpNumber { version, value })
    }

    // Callers uphold `value <= version.max_value()`.
    pub(crate) const fn new_unchecked(version: IpVersion, value: u128) -> IpNumber {
        IpNumber { version, value }
    }

    /// The address family of this number.
    pub const fn version(&self) -> IpVersion {
        self.version
    }

    /// The numeric address value.
    pub const fn value(&self) -> u128 {
        self.value
    }

    /// True unless this is the last address of its version's space.
    pub const fn has_next(&self) -> bool {
        self.value < self.version.max_value()
    }

    /// True unless this is address zero.
    pub const fn has_previous(&self) -> bool {
        self.value > 0
    }

    /// The next address up, or [`IpPoolError::RangeExhausted`] at the top of
    /// the address space.
    pub fn next(&self) -> Result<IpNumber> {
        if !self.has_next() {
            return Err(IpPoolError::RangeExhausted(self.version));
        }
        Ok(IpNumber {
            version: self.version,
            value: self.value + 1,
        })
    }

    /// The next address down, or [`IpPoolError::RangeExhausted`] at zero.
    pub fn previous(&self) -> Result<IpNumber> {
        if !self.has_previous() {
            return Err(IpPoolError::RangeExhausted(self.version));
        }
        Ok(IpNumber {
            version: self.version,
            value: self.value - 1,
        })
    }

    /// Compare two numbers of the same version, rejecting mixed versions.
    pub fn compare(&self, other: &IpNumber) -> Result<Ordering> {
        same_version(self, other)?;
        Ok(self.value.cmp(&other.value))
    }

    /// Trailing zero bits of the address value, capped at the version's bit
    /// width. This bounds the largest CIDR block that can start here.
    pub fn trailing_zeros(&self) -> u8 {
        let bits = self.version.bit_size() as u32;
        self.value.trailing_zeros().min(bits) as u8
    }
}

/// Check that two numbers share an address version.
pub(crate) fn same_version(a: &IpNumber, b: &IpNumber) -> Result<()> {
    if a.version != b.version {
        return Err(IpPoolError::MixedVersion {
            left: a.version,
            right: b.version,
        });
    }
    Ok(())
}

impl From<Ipv4Addr> for IpNumber {
    fn from(addr: Ipv4Addr) -> IpNumber {
        IpNumber::v4(u32::from(addr))
    }
}

impl From<Ipv6Addr> for IpNumber {
    fn from(addr: Ipv6Addr) -> IpNumber {
        IpNumber::v6(u128::from(addr))
    }
}

impl std::fmt::Display for IpNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self.version {
            IpVersion::V4 => write!(f, "{}", Ipv4Addr::from(self.value as u32)),
            IpVersion::V6 => write!(f, "{}", Ipv6Addr::from(self.value)),
        }
    }
}
