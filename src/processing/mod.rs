//! Range-collection algorithms.
//!
//! This module contains the algorithmic side of the crate:
//! - [`Pool`] - mutable range collection with aggregation, allocation and
//!   subtraction

mod pool;

// Re-export public types
pub use pool::Pool;
