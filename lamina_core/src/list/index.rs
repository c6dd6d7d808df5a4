// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Proxy addresses and tree-order keys.

use core::fmt;

/// Address of a proxy inside a [`WidgetList`](super::WidgetList): a segment
/// and a slot within it.
///
/// Stable while the list only changes content. Splitting, merging or
/// removing the owning segment reassigns it, and the list reports the
/// change through
/// [`ChildOrderObserver::proxies_reindexed`](super::ChildOrderObserver::proxies_reindexed).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct WidgetIndex {
    /// Segment in the list's segment pool.
    pub segment: u16,
    /// Slot within the segment.
    pub slot: u16,
}

impl WidgetIndex {
    /// The "no proxy" index, used as the parent of the list root.
    pub const INVALID: Self = Self {
        segment: u16::MAX,
        slot: u16::MAX,
    };

    /// Creates an index from its parts.
    #[inline]
    #[must_use]
    pub const fn new(segment: u16, slot: u16) -> Self {
        Self { segment, slot }
    }

    /// Returns `false` for [`INVALID`](Self::INVALID).
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.segment != u16::MAX
    }
}

impl Default for WidgetIndex {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Debug for WidgetIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "WidgetIndex({}:{})", self.segment, self.slot)
        } else {
            f.write_str("WidgetIndex(INVALID)")
        }
    }
}

/// A proxy's position in tree pre-order, as one comparable integer.
///
/// The high bits hold the owning segment's order number and the low bits
/// the slot, so comparing two keys compares tree positions: parents before
/// children, siblings in child-list order. Only meaningful until the list
/// is next restructured.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SortOrder(pub u32);

impl SortOrder {
    /// Packs a segment order number and a slot.
    #[inline]
    #[must_use]
    pub const fn new(segment_order: u32, slot: u16, slot_bits: u32) -> Self {
        Self((segment_order << slot_bits) | slot as u32)
    }

    /// The key immediately after this one.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

/// An inclusive range of tree positions, typically one widget's subtree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IndexRange {
    /// First position in the range.
    pub min: SortOrder,
    /// Last position in the range.
    pub max: SortOrder,
}

impl IndexRange {
    /// Creates a range from `min` to `max`, both included.
    #[inline]
    #[must_use]
    pub const fn new(min: SortOrder, max: SortOrder) -> Self {
        Self { min, max }
    }

    /// Returns `true` if `order` lies inside the range.
    #[inline]
    #[must_use]
    pub fn includes(&self, order: SortOrder) -> bool {
        self.min <= order && order <= self.max
    }

    /// Returns `true` if the range contains nothing.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_order_dominates_slot() {
        let a = SortOrder::new(1, 63, 6);
        let b = SortOrder::new(2, 0, 6);
        assert!(a < b, "a later segment always sorts after an earlier one");
    }

    #[test]
    fn includes_is_inclusive() {
        let range = IndexRange::new(SortOrder(10), SortOrder(20));
        assert!(range.includes(SortOrder(10)));
        assert!(range.includes(SortOrder(20)));
        assert!(!range.includes(SortOrder(9)));
        assert!(!range.includes(SortOrder(21)));
    }

    #[test]
    fn inverted_range_is_empty() {
        let range = IndexRange::new(SortOrder(5).next(), SortOrder(5));
        assert!(range.is_empty());
        assert!(!range.includes(SortOrder(5)));
    }

    #[test]
    fn invalid_index_debug() {
        use alloc::format;

        assert_eq!(format!("{:?}", WidgetIndex::INVALID), "WidgetIndex(INVALID)");
        assert_eq!(format!("{:?}", WidgetIndex::new(2, 7)), "WidgetIndex(2:7)");
    }
}
