//! Validated CIDR prefix lengths.

use crate::error::{IpPoolError, Result};
use crate::models::IpVersion;
use num_bigint::BigUint;

/// A CIDR prefix length bound to an address version.
///
/// Valid lengths run from 0 to the version's bit width (32 for IPv4, 128 for
/// IPv6); [`Prefix::new`] rejects anything longer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Prefix {
    version: IpVersion,
    length: u8,
}

impl Prefix {
    /// Create a prefix for the given version, validating the length.
    pub fn new(version: IpVersion, length: u8) -> Result<Prefix> {
        let max = version.bit_size();
        if length > max {
            return Err(IpPoolError::InvalidPrefixLength {
                version,
                length,
                max,
            });
        }
        Ok(Prefix { version, length })
    }

    /// Shorthand for an IPv4 prefix.
    pub fn v4(length: u8) -> Result<Prefix> {
        Prefix::new(IpVersion::V4, length)
    }

    /// Shorthand for an IPv6 prefix.
    pub fn v6(length: u8) -> Result<Prefix> {
        Prefix::new(IpVersion::V6, length)
    }

    // Callers uphold `length <= version.bit_size()`.
    pub(crate) const fn new_unchecked(version: IpVersion, length: u8) -> Prefix {
        Prefix { version, length }
    }

    /// The address version this prefix is bound to.
    pub const fn version(&self) -> IpVersion {
        self.version
    }

    /// The prefix length.
    pub const fn length(&self) -> u8 {
        self.length
    }

    /// Number of host bits left of the prefix: `bit_size - length`.
    pub const fn host_bits(&self) -> u8 {
        self.version.bit_size() - self.length
    }

    /// Number of addresses in a block of this prefix: `2^host_bits`.
    ///
    /// Exact even for an IPv6 `/0`, whose size (`2^128`) does not fit any
    /// native integer.
    pub fn size(&self) -> BigUint {
        BigUint::from(1u8) << self.host_bits()
    }

    /// The network mask as a numeric value within the version's bit width.
    pub fn mask(&self) -> u128 {
        if self.length == 0 {
            return 0;
        }
        let right = self.host_bits() as u32;
        (self.version.max_value() >> right) << right
    }
}

impl std::fmt::Display for Prefix {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.length)
    }
}
