//! Inclusive address ranges and their minimal CIDR cover.
//!
//! [`RangedSet`] is the canonical range type of the crate: an inclusive
//! `(first, last)` pair of same-version addresses. Unlike a [`CidrRange`] it
//! can start and end anywhere; `to_cidr_ranges` recovers the minimal ordered
//! sequence of CIDR blocks that exactly covers it.

use crate::error::{IpPoolError, Result};
use crate::models::{same_version, CidrRange, IpNumber, IpVersion, Prefix};
use num_bigint::BigUint;
use serde::de;
use serde::{Deserialize, Deserializer, Serialize};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// An inclusive range of addresses of one version, `first <= last`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RangedSet {
    first: IpNumber,
    last: IpNumber,
}

impl RangedSet {
    /// Create a range from its boundaries. Fails on mixed versions or
    /// out-of-order boundaries.
    pub fn new(first: IpNumber, last: IpNumber) -> Result<RangedSet> {
        same_version(&first, &last)?;
        if first.value() > last.value() {
            return Err(IpPoolError::InvalidRange(format!(
                "first {first} is above last {last}"
            )));
        }
        Ok(RangedSet { first, last })
    }

    // Callers uphold same version and `first <= last`.
    pub(crate) const fn new_unchecked(first: IpNumber, last: IpNumber) -> RangedSet {
        RangedSet { first, last }
    }

    /// The range covered by a CIDR block.
    pub fn from_cidr(cidr: &CidrRange) -> RangedSet {
        RangedSet {
            first: cidr.first(),
            last: cidr.last(),
        }
    }

    /// A single-address range.
    pub const fn from_single(address: IpNumber) -> RangedSet {
        RangedSet {
            first: address,
            last: address,
        }
    }

    /// First (lowest) address of the range.
    pub const fn first(&self) -> IpNumber {
        self.first
    }

    /// Last (highest) address of the range.
    pub const fn last(&self) -> IpNumber {
        self.last
    }

    /// Address version of the range.
    pub const fn version(&self) -> IpVersion {
        self.first.version()
    }

    /// Number of addresses in the range: `last - first + 1`, exact even at
    /// the top of the IPv6 space.
    pub fn size(&self) -> BigUint {
        BigUint::from(self.last.value() - self.first.value()) + 1u8
    }

    /// Whether `other` lies entirely inside this range. Ranges of different
    /// versions never contain each other.
    pub fn contains(&self, other: &RangedSet) -> bool {
        self.version() == other.version()
            && self.first.value() <= other.first.value()
            && other.last.value() <= self.last.value()
    }

    /// Whether the two ranges share at least one address.
    pub fn is_overlapping(&self, other: &RangedSet) -> bool {
        self.version() == other.version()
            && self.first.value() <= other.last.value()
            && other.first.value() <= self.last.value()
    }

    /// Whether one range ends exactly where the other begins.
    pub fn is_adjacent(&self, other: &RangedSet) -> bool {
        if self.version() != other.version() {
            return false;
        }
        let follows = |a: &RangedSet, b: &RangedSet| {
            a.last.has_next() && a.last.value() + 1 == b.first.value()
        };
        follows(self, other) || follows(other, self)
    }

    /// Decompose the range into the minimal ordered sequence of CIDR blocks
    /// whose union is exactly `[first, last]`.
    ///
    /// Greedy walk: at each cursor the block is the largest power-of-two run
    /// bounded by the cursor's own alignment (trailing zero bits) and by the
    /// space left in the range. At most `bit_size` blocks are emitted.
    pub fn to_cidr_ranges(&self) -> Vec<CidrRange> {
        let version = self.version();
        let bit_size = version.bit_size() as u32;
        let end = self.last.value();
        let mut cursor = self.first.value();
        let mut blocks = Vec::new();
        loop {
            let align = cursor.trailing_zeros().min(bit_size);
            let span = end - cursor;
            let fit = if span == u128::MAX {
                bit_size
            } else {
                (span + 1).ilog2()
            };
            let log = align.min(fit);
            let prefix = Prefix::new_unchecked(version, (bit_size - log) as u8);
            let network = IpNumber::new_unchecked(version, cursor);
            blocks.push(CidrRange::new_unchecked(network, prefix));
            let block_last = cursor + block_span(log);
            if block_last >= end {
                break;
            }
            cursor = block_last + 1;
        }
        blocks
    }
}

/// Block size minus one for a power-of-two exponent, without overflowing at
/// `2^128`.
pub(crate) fn block_span(log: u32) -> u128 {
    if log >= 128 {
        u128::MAX
    } else {
        (1u128 << log) - 1
    }
}

impl std::fmt::Display for RangedSet {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}-{}", self.first, self.last)
    }
}

impl FromStr for RangedSet {
    type Err = IpPoolError;

    /// Parse `first-last` notation, e.g. `10.0.0.3-10.0.0.200`.
    fn from_str(s: &str) -> Result<RangedSet> {
        let s = s.trim();
        let (first_part, last_part) = s
            .split_once('-')
            .ok_or_else(|| IpPoolError::InvalidRange(format!("missing '-' in {s:?}")))?;
        RangedSet::new(parse_address(first_part)?, parse_address(last_part)?)
    }
}

fn parse_address(s: &str) -> Result<IpNumber> {
    if s.contains(':') {
        Ipv6Addr::from_str(s)
            .map(IpNumber::from)
            .map_err(|_| IpPoolError::InvalidRange(format!("bad address {s:?}")))
    } else {
        Ipv4Addr::from_str(s)
            .map(IpNumber::from)
            .map_err(|_| IpPoolError::InvalidRange(format!("bad address {s:?}")))
    }
}

impl Serialize for RangedSet {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for RangedSet {
    fn deserialize<D>(deserializer: D) -> std::result::Result<RangedSet, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        RangedSet::from_str(&s).map_err(de::Error::custom)
    }
}
