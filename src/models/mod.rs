//! Value types for the address-range domain.
//!
//! This module contains the core data structures used throughout the crate:
//! - [`IpNumber`] and [`IpVersion`] - exact, versioned address numbers
//! - [`Prefix`] - validated CIDR prefix length
//! - [`CidrRange`] - network address + prefix block
//! - [`RangedSet`] - inclusive address range with CIDR decomposition

mod cidr;
mod ip_number;
mod prefix;
mod range_set;

// Re-export public types
pub use cidr::CidrRange;
pub use ip_number::{IpNumber, IpVersion};
pub use prefix::Prefix;
pub use range_set::RangedSet;

pub(crate) use ip_number::same_version;
pub(crate) use range_set::block_span;
