//! IP address ranges and CIDR blocks as exact numeric intervals, with a
//! mergeable and allocatable [`Pool`].
//!
//! The value types live in [`models`]: [`IpNumber`] (an IPv4/IPv6 address as
//! an exact integer), [`Prefix`], [`CidrRange`] and [`RangedSet`] (an
//! inclusive range that can decompose itself into its minimal CIDR cover).
//! The [`Pool`] in [`processing`] holds ranges and owns the aggregation,
//! allocation and subtraction algorithms on top of them.
//!
//! ```
//! use ip_pool::{Pool, Prefix, RangedSet};
//! use std::str::FromStr;
//!
//! let mut pool = Pool::from_range_sets(vec![
//!     RangedSet::from_str("10.0.0.0-10.0.0.127").unwrap(),
//!     RangedSet::from_str("10.0.0.128-10.0.0.255").unwrap(),
//! ])
//! .unwrap();
//!
//! // Adjacent halves aggregate into one /24.
//! let aggregated = pool.aggregate();
//! assert_eq!(aggregated.len(), 1);
//!
//! // Carve a /26 from it, then subtract the allocation.
//! let block = pool.get_single_cidr_range(Prefix::v4(26).unwrap()).unwrap();
//! assert_eq!(block.to_string(), "10.0.0.0/26");
//! pool.remove_overlapping(&RangedSet::from_cidr(&block));
//! ```
//!
//! Everything is synchronous, in-memory and single-threaded; sharing a pool
//! across threads requires external mutual exclusion.

pub mod error;
pub mod models;
pub mod processing;

pub use error::{IpPoolError, Result};
pub use models::{CidrRange, IpNumber, IpVersion, Prefix, RangedSet};
pub use processing::Pool;
