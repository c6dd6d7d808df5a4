// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Consistency failures reported by the verification passes.

use crate::arena::WidgetId;
use crate::list::WidgetIndex;

/// A broken invariant found by
/// [`WidgetList::verify_widgets_index`](crate::list::WidgetList::verify_widgets_index)
/// or one of the other verification passes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    /// A proxy's recorded index differs from where it is stored.
    #[error("proxy stored at {found:?} records index {recorded:?}")]
    IndexMismatch {
        /// Where the proxy lives.
        found: WidgetIndex,
        /// What the proxy claims.
        recorded: WidgetIndex,
    },
    /// The widget map does not point at the widget's proxy.
    #[error("widget map entry for {widget:?} does not match its proxy")]
    WidgetMapMismatch {
        /// The widget whose entry is wrong.
        widget: WidgetId,
    },
    /// The widget map holds entries for widgets the list does not contain.
    #[error("widget map holds {mapped} entries for {listed} listed widgets")]
    WidgetMapSize {
        /// Entries in the map.
        mapped: usize,
        /// Proxies with a live widget.
        listed: usize,
    },
    /// A proxy lies outside its parent's subtree range.
    #[error("{index:?} is outside the range of its parent {parent:?}")]
    ParentOutOfRange {
        /// The child.
        index: WidgetIndex,
        /// Its recorded parent.
        parent: WidgetIndex,
    },
    /// A proxy's leaf-most child does not resolve or precedes it.
    #[error("leaf-most child {leaf:?} of {index:?} is invalid")]
    LeafBeforeIndex {
        /// The proxy.
        index: WidgetIndex,
        /// Its recorded leaf-most child.
        leaf: WidgetIndex,
    },
    /// Segment order numbers are not strictly increasing along the links.
    #[error("segment {segment} has order {order}, not above {previous}")]
    SortOrderNotIncreasing {
        /// The offending segment.
        segment: u16,
        /// Its order number.
        order: u32,
        /// The preceding segment's order number.
        previous: u32,
    },
    /// A segment's attribute or volatile slot list is unsorted, out of
    /// bounds or disagrees with the proxies.
    #[error("{list} slots of segment {segment} are inconsistent")]
    ElementIndexList {
        /// The segment.
        segment: u16,
        /// Which list, `"attribute"` or `"volatile"`.
        list: &'static str,
    },
    /// A proxy's heap membership flag disagrees with the heap contents.
    #[error("{heap} heap membership of {index:?} is inconsistent")]
    HeapMembership {
        /// The proxy.
        index: WidgetIndex,
        /// Which heap.
        heap: &'static str,
    },
    /// The list order diverges from a fresh traversal of the widget tree.
    #[error("widget list diverges from the widget tree at position {position}")]
    TraversalMismatch {
        /// First differing position in traversal order.
        position: usize,
    },
    /// The host's hit-test structures disagree with its widgets.
    #[error("hit-test grid does not match the widget tree")]
    HittestGrid,
}
