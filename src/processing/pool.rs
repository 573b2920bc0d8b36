//! Pool of address ranges: aggregation, allocation and subtraction.
//!
//! A [`Pool`] owns an unordered collection of [`RangedSet`]s of one address
//! version. The backing collection may hold overlapping or unsorted ranges;
//! only [`Pool::aggregate`] imposes the canonical sorted, merged, minimal
//! form, and the read-style allocators aggregate internally first so stale
//! overlaps never skew their answers.

use crate::error::{IpPoolError, Result};
use crate::models::{block_span, CidrRange, IpNumber, IpVersion, Prefix, RangedSet};
use itertools::Itertools;
use num_bigint::BigUint;

/// A mutable collection of address ranges supporting merge, allocate and
/// subtract operations.
///
/// All mutation is in place; [`Pool::aggregate`] is the exception and returns
/// a new pool, leaving the receiver unchanged. Operations that fail leave the
/// pool exactly as it was. Concurrent use of one pool requires external
/// serialization by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pool {
    ranges: Vec<RangedSet>,
}

impl Pool {
    /// An empty pool. It takes the version of the first ranges added.
    pub fn new() -> Pool {
        Pool { ranges: Vec::new() }
    }

    /// Build a pool from individual addresses, each becoming a
    /// single-address range. Fails if the addresses mix versions.
    pub fn from_ip_numbers(addresses: &[IpNumber]) -> Result<Pool> {
        Pool::from_range_sets(addresses.iter().copied().map(RangedSet::from_single).collect())
    }

    /// Build a pool from ranges. Fails if the ranges mix versions.
    pub fn from_range_sets(ranges: Vec<RangedSet>) -> Result<Pool> {
        check_homogeneous(None, &ranges)?;
        Ok(Pool { ranges })
    }

    /// Build a pool from CIDR blocks. Fails if the blocks mix versions.
    pub fn from_cidr_ranges(cidrs: &[CidrRange]) -> Result<Pool> {
        Pool::from_range_sets(cidrs.iter().map(RangedSet::from_cidr).collect())
    }

    /// The ranges currently in the pool, in storage order.
    pub fn ranges(&self) -> &[RangedSet] {
        &self.ranges
    }

    /// Number of stored ranges (not addresses; see [`Pool::get_size`]).
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Whether the pool holds no ranges.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Address version of the pool, or `None` while it is empty.
    pub fn version(&self) -> Option<IpVersion> {
        self.ranges.first().map(|r| r.version())
    }

    /// Append ranges to the pool without merging. Fails without mutating if
    /// the new ranges mix versions with the pool or each other.
    pub fn add(&mut self, ranges: Vec<RangedSet>) -> Result<()> {
        check_homogeneous(self.version(), &ranges)?;
        self.ranges.extend(ranges);
        Ok(())
    }

    /// Empty the pool and refill it with the given ranges. Fails without
    /// mutating if the new ranges mix versions.
    pub fn reset_with(&mut self, ranges: Vec<RangedSet>) -> Result<()> {
        check_homogeneous(None, &ranges)?;
        self.ranges = ranges;
        Ok(())
    }

    /// Remove one range exactly equal to `range`. No-op if none matches.
    pub fn remove_exact(&mut self, range: &RangedSet) {
        if let Some(pos) = self.ranges.iter().position(|r| r == range) {
            self.ranges.remove(pos);
        } else {
            log::trace!("remove_exact: {range} not in pool, nothing removed");
        }
    }

    /// Subtract `range` from the pool: every stored range intersecting it is
    /// replaced by the piece(s) of itself outside `range`. Stored ranges
    /// without intersection are untouched.
    pub fn remove_overlapping(&mut self, range: &RangedSet) {
        let before = self.ranges.len();
        let mut kept = Vec::with_capacity(before);
        for stored in self.ranges.drain(..) {
            if !stored.is_overlapping(range) {
                kept.push(stored);
                continue;
            }
            if stored.first().value() < range.first().value() {
                let left_end =
                    IpNumber::new_unchecked(stored.version(), range.first().value() - 1);
                kept.push(RangedSet::new_unchecked(stored.first(), left_end));
            }
            if stored.last().value() > range.last().value() {
                let right_start =
                    IpNumber::new_unchecked(stored.version(), range.last().value() + 1);
                kept.push(RangedSet::new_unchecked(right_start, stored.last()));
            }
        }
        self.ranges = kept;
        log::debug!(
            "remove_overlapping: {} range(s) before, {} after subtracting {range}",
            before,
            self.ranges.len()
        );
    }

    /// Drop every range from the pool.
    pub fn clear(&mut self) {
        self.ranges.clear();
    }

    /// Total number of addresses across all stored ranges, as an exact sum.
    ///
    /// Overlapping stored ranges are counted as stored; aggregate first for
    /// the deduplicated footprint.
    pub fn get_size(&self) -> BigUint {
        self.ranges.iter().map(RangedSet::size).sum()
    }

    /// Merge all overlapping and adjacent ranges into the minimal sorted
    /// disjoint cover. Returns a new pool; the receiver is unchanged. The
    /// result is the same for any storage order of equal contents.
    pub fn aggregate(&self) -> Pool {
        let mut merged: Vec<RangedSet> = Vec::new();
        for range in self
            .ranges
            .iter()
            .copied()
            .sorted_by_key(|r| (r.first(), r.last()))
        {
            match merged.last_mut() {
                Some(current) if current.is_overlapping(&range) || current.is_adjacent(&range) => {
                    if range.last().value() > current.last().value() {
                        *current = RangedSet::new_unchecked(current.first(), range.last());
                    }
                }
                _ => merged.push(range),
            }
        }
        log::debug!(
            "aggregate: {} range(s) merged into {}",
            self.ranges.len(),
            merged.len()
        );
        Pool { ranges: merged }
    }

    /// Carve one CIDR block of the given prefix from the pool.
    ///
    /// The aggregated pool must hold exactly one range large enough for the
    /// prefix; zero or several candidates fail with
    /// [`IpPoolError::NoSuchRange`], as does a candidate whose start is not
    /// aligned for the prefix. The block is taken from the start of the
    /// range. Read-only: consuming the block is the caller's explicit
    /// [`Pool::remove_overlapping`] follow-up.
    pub fn get_single_cidr_range(&self, prefix: Prefix) -> Result<CidrRange> {
        self.check_prefix_version(prefix)?;
        let aggregated = self.aggregate();
        let wanted = prefix.size();
        let mut candidates = aggregated.ranges.iter().filter(|r| r.size() >= wanted);
        let range = candidates.next().ok_or_else(|| {
            IpPoolError::NoSuchRange(format!("no range in pool is large enough for /{prefix}"))
        })?;
        if candidates.next().is_some() {
            return Err(IpPoolError::NoSuchRange(format!(
                "more than one range could satisfy /{prefix}; pool must hold exactly one candidate"
            )));
        }
        let start = range.first();
        if start.trailing_zeros() < prefix.host_bits() {
            return Err(IpPoolError::NoSuchRange(format!(
                "range start {start} is not aligned for a /{prefix} block"
            )));
        }
        Ok(CidrRange::new_unchecked(start, prefix))
    }

    /// Carve CIDR blocks totalling the size of the given prefix from the
    /// pool, walking the aggregated ranges in order and emitting
    /// alignment-aware blocks from each until the request is covered.
    ///
    /// Fails with [`IpPoolError::NoSuchRange`] if the pool's total capacity
    /// is insufficient. Read-only, like [`Pool::get_single_cidr_range`].
    pub fn get_multiple_cidr_ranges(&self, prefix: Prefix) -> Result<Vec<CidrRange>> {
        self.check_prefix_version(prefix)?;
        let aggregated = self.aggregate();
        let wanted = prefix.size();
        let available = aggregated.get_size();
        if available < wanted {
            return Err(IpPoolError::NoSuchRange(format!(
                "pool holds {available} address(es), a /{prefix} needs {wanted}"
            )));
        }

        let bit_size = prefix.version().bit_size() as u32;
        let zero = BigUint::from(0u8);
        let mut remaining = wanted;
        let mut blocks = Vec::new();
        'ranges: for range in &aggregated.ranges {
            let end = range.last().value();
            let mut cursor = range.first().value();
            loop {
                if remaining == zero {
                    break 'ranges;
                }
                // Block exponent bounded by cursor alignment, by the space
                // left in this range, and by the size still wanted.
                let align = cursor.trailing_zeros().min(bit_size);
                let span = end - cursor;
                let fit = if span == u128::MAX {
                    bit_size
                } else {
                    (span + 1).ilog2()
                };
                let want = (remaining.bits() - 1) as u32;
                let log = align.min(fit).min(want);

                let network = IpNumber::new_unchecked(range.version(), cursor);
                let block_prefix = Prefix::new_unchecked(prefix.version(), (bit_size - log) as u8);
                blocks.push(CidrRange::new_unchecked(network, block_prefix));
                remaining -= BigUint::from(1u8) << log;

                let block_last = cursor + block_span(log);
                if block_last >= end {
                    break;
                }
                cursor = block_last + 1;
            }
        }
        debug_assert_eq!(remaining, zero, "capacity pre-check guarantees coverage");
        log::debug!("get_multiple_cidr_ranges: /{prefix} covered by {} block(s)", blocks.len());
        Ok(blocks)
    }

    fn check_prefix_version(&self, prefix: Prefix) -> Result<()> {
        match self.version() {
            Some(version) if version != prefix.version() => Err(IpPoolError::MixedVersion {
                left: version,
                right: prefix.version(),
            }),
            _ => Ok(()),
        }
    }
}

/// Check that `ranges` all share one version, and that it matches `version`
/// when the pool already has one.
fn check_homogeneous(version: Option<IpVersion>, ranges: &[RangedSet]) -> Result<()> {
    let mut version = version;
    for range in ranges {
        match version {
            Some(v) if v != range.version() => {
                return Err(IpPoolError::MixedVersion {
                    left: v,
                    right: range.version(),
                })
            }
            Some(_) => {}
            None => version = Some(range.version()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn cidr(s: &str) -> CidrRange {
        CidrRange::from_str(s).unwrap()
    }

    fn range(s: &str) -> RangedSet {
        RangedSet::from_str(s).unwrap()
    }

    fn pool_of(cidrs: &[&str]) -> Pool {
        let cidrs: Vec<CidrRange> = cidrs.iter().map(|s| cidr(s)).collect();
        Pool::from_cidr_ranges(&cidrs).unwrap()
    }

    fn range_strings(pool: &Pool) -> Vec<String> {
        pool.ranges().iter().map(|r| r.to_string()).collect()
    }

    #[test]
    fn test_aggregate_merges_adjacent_halves() {
        // Two /25 halves aggregate into one /24.
        let pool = pool_of(&["10.0.0.0/25", "10.0.0.128/25"]);
        let aggregated = pool.aggregate();
        assert_eq!(range_strings(&aggregated), vec!["10.0.0.0-10.0.0.255"]);
        assert_eq!(
            aggregated.ranges()[0].to_cidr_ranges(),
            vec![cidr("10.0.0.0/24")]
        );
        // The receiver is unchanged.
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_aggregate_keeps_disjoint_ranges_apart() {
        let pool = pool_of(&["10.0.0.0/24", "10.0.2.0/24"]);
        let aggregated = pool.aggregate();
        assert_eq!(
            range_strings(&aggregated),
            vec!["10.0.0.0-10.0.0.255", "10.0.2.0-10.0.2.255"]
        );
    }

    #[test]
    fn test_aggregate_merges_overlaps_and_contained_ranges() {
        let pool = Pool::from_range_sets(vec![
            range("10.0.0.0-10.0.0.200"),
            range("10.0.0.100-10.0.1.50"),
            range("10.0.0.50-10.0.0.60"),
        ])
        .unwrap();
        assert_eq!(range_strings(&pool.aggregate()), vec!["10.0.0.0-10.0.1.50"]);
    }

    #[test]
    fn test_aggregate_is_idempotent() {
        let pool = pool_of(&["10.0.0.0/25", "10.0.0.128/25", "10.0.2.0/24", "10.0.2.128/26"]);
        let once = pool.aggregate();
        assert_eq!(once.aggregate(), once);
    }

    #[test]
    fn test_aggregate_is_order_independent() {
        let inputs = ["10.0.2.0/24", "10.0.0.128/25", "192.168.0.0/16", "10.0.0.0/25"];
        let baseline = pool_of(&inputs).aggregate();
        for k in 0..inputs.len() {
            let mut rotated = inputs.to_vec();
            rotated.rotate_left(k);
            let cidrs: Vec<CidrRange> = rotated.iter().map(|s| cidr(s)).collect();
            assert_eq!(Pool::from_cidr_ranges(&cidrs).unwrap().aggregate(), baseline);
        }
    }

    #[test]
    fn test_aggregate_conserves_size() {
        let pool = pool_of(&["10.0.0.0/25", "10.0.0.128/25", "10.0.2.0/24"]);
        assert_eq!(pool.get_size(), pool.aggregate().get_size());
        assert_eq!(pool.get_size(), BigUint::from(512u32));
    }

    #[test]
    fn test_get_size_is_exact_for_full_v6_space() {
        let pool = pool_of(&["::/0"]);
        assert_eq!(pool.get_size(), BigUint::from(1u8) << 128);
        let halves = pool_of(&["::/1", "8000::/1"]);
        assert_eq!(halves.get_size(), BigUint::from(1u8) << 128);
    }

    #[test]
    fn test_get_single_cidr_range() {
        let pool = pool_of(&["10.0.0.0/24"]);
        let got = pool.get_single_cidr_range(Prefix::v4(26).unwrap()).unwrap();
        assert_eq!(got, cidr("10.0.0.0/26"));
        // Read-only call.
        assert_eq!(range_strings(&pool), vec!["10.0.0.0-10.0.0.255"]);
    }

    #[test]
    fn test_get_single_cidr_range_exact_fit() {
        let pool = pool_of(&["10.0.0.0/24"]);
        let got = pool.get_single_cidr_range(Prefix::v4(24).unwrap()).unwrap();
        assert_eq!(got, cidr("10.0.0.0/24"));
    }

    #[test]
    fn test_get_single_cidr_range_too_small() {
        let pool = pool_of(&["10.0.0.0/24"]);
        assert!(matches!(
            pool.get_single_cidr_range(Prefix::v4(22).unwrap()),
            Err(IpPoolError::NoSuchRange(_))
        ));
    }

    #[test]
    fn test_get_single_cidr_range_ambiguous() {
        let pool = pool_of(&["10.0.0.0/24", "10.0.2.0/24"]);
        assert!(matches!(
            pool.get_single_cidr_range(Prefix::v4(26).unwrap()),
            Err(IpPoolError::NoSuchRange(_))
        ));
    }

    #[test]
    fn test_get_single_cidr_range_empty_pool() {
        let pool = Pool::new();
        assert!(matches!(
            pool.get_single_cidr_range(Prefix::v4(24).unwrap()),
            Err(IpPoolError::NoSuchRange(_))
        ));
    }

    #[test]
    fn test_get_single_cidr_range_unaligned_start() {
        // 10.0.0.64 can host a /26 but not a /25.
        let pool = Pool::from_range_sets(vec![range("10.0.0.64-10.0.0.255")]).unwrap();
        let got = pool.get_single_cidr_range(Prefix::v4(26).unwrap()).unwrap();
        assert_eq!(got, cidr("10.0.0.64/26"));
        assert!(matches!(
            pool.get_single_cidr_range(Prefix::v4(25).unwrap()),
            Err(IpPoolError::NoSuchRange(_))
        ));
    }

    #[test]
    fn test_get_single_cidr_range_rejects_mixed_version() {
        let pool = pool_of(&["10.0.0.0/24"]);
        assert!(matches!(
            pool.get_single_cidr_range(Prefix::v6(64).unwrap()),
            Err(IpPoolError::MixedVersion { .. })
        ));
    }

    #[test]
    fn test_get_multiple_cidr_ranges_single_block() {
        let pool = pool_of(&["10.0.0.0/24"]);
        let got = pool.get_multiple_cidr_ranges(Prefix::v4(26).unwrap()).unwrap();
        assert_eq!(got, vec![cidr("10.0.0.0/26")]);
    }

    #[test]
    fn test_get_multiple_cidr_ranges_spans_ranges() {
        // A /24 worth of addresses carved from two /25-sized ranges.
        let pool = pool_of(&["10.0.0.0/25", "10.0.2.0/25"]);
        let got = pool.get_multiple_cidr_ranges(Prefix::v4(24).unwrap()).unwrap();
        assert_eq!(got, vec![cidr("10.0.0.0/25"), cidr("10.0.2.0/25")]);
        let total: BigUint = got.iter().map(CidrRange::size).sum();
        assert_eq!(total, Prefix::v4(24).unwrap().size());
    }

    #[test]
    fn test_get_multiple_cidr_ranges_partial_range() {
        // More capacity than needed: only the wanted size is emitted.
        let pool = pool_of(&["10.0.0.0/25", "10.0.2.0/24"]);
        let got = pool.get_multiple_cidr_ranges(Prefix::v4(24).unwrap()).unwrap();
        assert_eq!(got, vec![cidr("10.0.0.0/25"), cidr("10.0.2.0/25")]);
    }

    #[test]
    fn test_get_multiple_cidr_ranges_unaligned_capacity() {
        // 192 addresses available, 128 wanted. Alignment keeps every emitted
        // block on its own boundary, so the request is covered by a /26 plus
        // two /27s rather than a misaligned /25.
        let pool = Pool::from_range_sets(vec![
            range("10.0.0.64-10.0.0.127"),
            range("10.0.1.32-10.0.1.159"),
        ])
        .unwrap();
        let got = pool.get_multiple_cidr_ranges(Prefix::v4(25).unwrap()).unwrap();
        let strings: Vec<String> = got.iter().map(|c| c.to_string()).collect();
        assert_eq!(
            strings,
            vec!["10.0.0.64/26", "10.0.1.32/27", "10.0.1.64/27"]
        );
        let total: BigUint = got.iter().map(CidrRange::size).sum();
        assert_eq!(total, Prefix::v4(25).unwrap().size());
    }

    #[test]
    fn test_get_multiple_cidr_ranges_insufficient() {
        let pool = pool_of(&["10.0.0.0/26", "10.0.2.0/26"]);
        assert!(matches!(
            pool.get_multiple_cidr_ranges(Prefix::v4(24).unwrap()),
            Err(IpPoolError::NoSuchRange(_))
        ));
    }

    #[test]
    fn test_remove_overlapping_splits_range() {
        // Subtracting 10.0.0.64/26 from a /24 leaves a /26 and a /25.
        let mut pool = pool_of(&["10.0.0.0/24"]);
        pool.remove_overlapping(&RangedSet::from_cidr(&cidr("10.0.0.64/26")));
        assert_eq!(
            range_strings(&pool),
            vec!["10.0.0.0-10.0.0.63", "10.0.0.128-10.0.0.255"]
        );
        let blocks: Vec<CidrRange> = pool
            .ranges()
            .iter()
            .flat_map(|r| r.to_cidr_ranges())
            .collect();
        assert_eq!(blocks, vec![cidr("10.0.0.0/26"), cidr("10.0.0.128/25")]);
    }

    #[test]
    fn test_remove_overlapping_drops_covered_ranges() {
        let mut pool = pool_of(&["10.0.0.0/26", "10.0.0.64/26", "10.0.2.0/24"]);
        pool.remove_overlapping(&RangedSet::from_cidr(&cidr("10.0.0.0/24")));
        assert_eq!(range_strings(&pool), vec!["10.0.2.0-10.0.2.255"]);
    }

    #[test]
    fn test_remove_overlapping_trims_edges() {
        let mut pool = Pool::from_range_sets(vec![range("10.0.0.100-10.0.1.50")]).unwrap();
        pool.remove_overlapping(&range("10.0.0.200-10.0.0.255"));
        assert_eq!(
            range_strings(&pool),
            vec!["10.0.0.100-10.0.0.199", "10.0.1.0-10.0.1.50"]
        );
    }

    #[test]
    fn test_remove_overlapping_untouched_without_intersection() {
        let mut pool = pool_of(&["10.0.0.0/24"]);
        pool.remove_overlapping(&RangedSet::from_cidr(&cidr("10.0.2.0/24")));
        assert_eq!(range_strings(&pool), vec!["10.0.0.0-10.0.0.255"]);
    }

    #[test]
    fn test_remove_exact() {
        let mut pool = pool_of(&["10.0.0.0/24", "10.0.2.0/24"]);
        // Overlap is not enough; only an exactly equal range is removed.
        pool.remove_exact(&range("10.0.0.0-10.0.0.127"));
        assert_eq!(pool.len(), 2);
        pool.remove_exact(&range("10.0.0.0-10.0.0.255"));
        assert_eq!(range_strings(&pool), vec!["10.0.2.0-10.0.2.255"]);
        // No-op on a second removal.
        pool.remove_exact(&range("10.0.0.0-10.0.0.255"));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_add_reset_clear() {
        let mut pool = Pool::new();
        assert!(pool.is_empty());
        assert_eq!(pool.version(), None);

        pool.add(vec![range("10.0.0.0-10.0.0.255")]).unwrap();
        assert_eq!(pool.version(), Some(IpVersion::V4));
        // No merging on add.
        pool.add(vec![range("10.0.0.0-10.0.0.127")]).unwrap();
        assert_eq!(pool.len(), 2);

        pool.reset_with(vec![range("10.0.2.0-10.0.2.255")]).unwrap();
        assert_eq!(range_strings(&pool), vec!["10.0.2.0-10.0.2.255"]);

        pool.clear();
        assert!(pool.is_empty());
        assert_eq!(pool.get_size(), BigUint::from(0u8));
    }

    #[test]
    fn test_mixed_versions_rejected_without_mutation() {
        let v6 = RangedSet::new(IpNumber::v6(0), IpNumber::v6(0xffff)).unwrap();
        assert!(matches!(
            Pool::from_range_sets(vec![range("10.0.0.0-10.0.0.255"), v6]),
            Err(IpPoolError::MixedVersion { .. })
        ));

        let mut pool = pool_of(&["10.0.0.0/24"]);
        assert!(pool.add(vec![v6]).is_err());
        assert_eq!(pool.len(), 1);
        assert!(pool.reset_with(vec![range("10.0.0.0-10.0.0.1"), v6]).is_err());
        assert_eq!(range_strings(&pool), vec!["10.0.0.0-10.0.0.255"]);
    }

    #[test]
    fn test_from_ip_numbers() {
        let pool = Pool::from_ip_numbers(&[
            IpNumber::v4(0x0a000001),
            IpNumber::v4(0x0a000002),
            IpNumber::v4(0x0a000003),
            IpNumber::v4(0x0a000010),
        ])
        .unwrap();
        assert_eq!(pool.get_size(), BigUint::from(4u8));
        let aggregated = pool.aggregate();
        assert_eq!(
            range_strings(&aggregated),
            vec!["10.0.0.1-10.0.0.3", "10.0.0.16-10.0.0.16"]
        );
    }

    #[test]
    fn test_v6_pool_end_to_end() {
        let pool = pool_of(&["2001:db8::/33", "2001:db8:8000::/33"]);
        let aggregated = pool.aggregate();
        assert_eq!(aggregated.len(), 1);
        assert_eq!(
            aggregated.ranges()[0].to_cidr_ranges(),
            vec![cidr("2001:db8::/32")]
        );
        let got = pool.get_single_cidr_range(Prefix::v6(48).unwrap()).unwrap();
        assert_eq!(got, cidr("2001:db8::/48"));
    }
}
