//! Typed errors for address, range and pool operations.
//!
//! All failures are synchronous and structural; nothing here is transient or
//! worth retrying. Operations that fail leave their receiver unchanged.

use crate::models::IpVersion;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, IpPoolError>;

/// Errors produced by address, range and pool operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IpPoolError {
    /// Prefix length outside `[0, bit_size]` for the address version.
    #[error("prefix length /{length} is out of range for {version} (max /{max})")]
    InvalidPrefixLength {
        /// Address version the prefix was bound to.
        version: IpVersion,
        /// The rejected length.
        length: u8,
        /// Largest valid length for the version.
        max: u8,
    },

    /// IPv4 and IPv6 values combined in one operation.
    #[error("cannot combine {left} and {right} values in one operation")]
    MixedVersion {
        /// Version of the left-hand operand.
        left: IpVersion,
        /// Version of the right-hand operand.
        right: IpVersion,
    },

    /// `next()`/`previous()` at the numeric boundary of the address space.
    #[error("no adjacent value: at the edge of the {0} address space")]
    RangeExhausted(IpVersion),

    /// The pool cannot satisfy an allocation request.
    #[error("no suitable range in pool: {0}")]
    NoSuchRange(String),

    /// Range boundaries out of order, or a value too wide for its version.
    #[error("invalid range: {0}")]
    InvalidRange(String),

    /// Text that does not parse as `address/length`, or a misaligned network
    /// address where alignment is required.
    #[error("invalid CIDR: {0}")]
    InvalidCidr(String),
}
