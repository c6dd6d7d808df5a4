// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The widget list: every proxy of one invalidation root, in tree pre-order.
//!
//! Proxies live in fixed-capacity **segments** linked in traversal order.
//! A [`WidgetIndex`] names a segment and a slot, and a [`SortOrder`] packs
//! the segment's order number with the slot, so any two proxies compare in
//! O(1) and a subtree is the contiguous [`IndexRange`] from a proxy to its
//! leaf-most descendant.
//!
//! # Restructuring
//!
//! When a widget's children change, only its subtree is rebuilt
//! ([`process_child_order_invalidation`](WidgetList::process_child_order_invalidation)):
//!
//! 1. The old subtree is cut out. A cut that ends mid-segment splits the
//!    segment so the survivors keep their relative order; a cut that starts
//!    a segment raises the segment's `start` instead of shifting, so the
//!    survivors keep their indices.
//! 2. Fresh proxies are appended after the widget, spilling into new
//!    segments that take order numbers from the gap between their
//!    neighbours. When there is no gap, the following segments are
//!    renumbered.
//! 3. Segments left under the configured minimum are merged into their
//!    predecessor.
//!
//! Every step that changes indices or sort orders of surviving proxies is
//! reported to a [`ChildOrderObserver`], so heaps and cursors holding
//! indices can patch themselves instead of being rebuilt.

mod build;
mod child_order;
mod cursor;
mod index;
mod verify;

use alloc::vec::Vec;

use hashbrown::HashMap;

use crate::arena::WidgetId;
use crate::proxy::WidgetProxy;
use crate::reason::UpdateFlags;

pub use child_order::{ChildOrderChange, ChildOrderObserver, Relocation};
pub use cursor::AttributeCursor;
pub use index::{IndexRange, SortOrder, WidgetIndex};

pub(crate) const NO_SEGMENT: u16 = u16::MAX;

/// Largest supported segment capacity.
pub const MAX_ELEMENTS_PER_SEGMENT: u16 = 1 << 12;

/// Tuning for a [`WidgetList`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WidgetListConfig {
    /// Proxies per segment, from 2 to [`MAX_ELEMENTS_PER_SEGMENT`].
    pub elements_per_segment: u16,
    /// Segments holding fewer live proxies than this are merged into their
    /// predecessor after a restructure, when they fit.
    pub min_elements_before_merge: u16,
    /// Gap left between consecutive segment order numbers when numbering.
    pub sort_order_padding: u32,
}

impl WidgetListConfig {
    /// The default tuning: 64 proxies per segment, merge under 16, pad 1000.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            elements_per_segment: 64,
            min_elements_before_merge: 16,
            sort_order_padding: 1000,
        }
    }

    /// Returns the configuration with a different segment capacity.
    #[must_use]
    pub const fn with_elements_per_segment(mut self, elements: u16) -> Self {
        self.elements_per_segment = elements;
        self
    }

    /// Returns the configuration with a different merge threshold.
    #[must_use]
    pub const fn with_min_elements_before_merge(mut self, elements: u16) -> Self {
        self.min_elements_before_merge = elements;
        self
    }

    /// Returns the configuration with a different order-number padding.
    #[must_use]
    pub const fn with_sort_order_padding(mut self, padding: u32) -> Self {
        self.sort_order_padding = padding;
        self
    }

    /// Capacity clamped to the supported range.
    const fn capacity(&self) -> u16 {
        if self.elements_per_segment < 2 {
            2
        } else if self.elements_per_segment > MAX_ELEMENTS_PER_SEGMENT {
            MAX_ELEMENTS_PER_SEGMENT
        } else {
            self.elements_per_segment
        }
    }
}

impl Default for WidgetListConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// A contiguous run of proxies.
///
/// Slots below `start` are dead: they were trimmed off the head and hold
/// inert proxies so the live slots keep their indices.
#[derive(Clone, Debug)]
pub(crate) struct Segment {
    pub(crate) start: u16,
    pub(crate) proxies: Vec<WidgetProxy>,
    pub(crate) prev: u16,
    pub(crate) next: u16,
    pub(crate) sort_order: u32,
    /// Live slots whose widget has bound attributes, ascending.
    pub(crate) attribute_slots: Vec<u16>,
    /// Live slots whose widget is volatile, ascending.
    pub(crate) volatile_slots: Vec<u16>,
}

impl Segment {
    fn new(sort_order: u32) -> Self {
        Self {
            start: 0,
            proxies: Vec::new(),
            prev: NO_SEGMENT,
            next: NO_SEGMENT,
            sort_order,
            attribute_slots: Vec::new(),
            volatile_slots: Vec::new(),
        }
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "segment length is bounded by MAX_ELEMENTS_PER_SEGMENT"
    )]
    pub(crate) fn end(&self) -> u16 {
        self.proxies.len() as u16
    }

    pub(crate) fn live(&self) -> u16 {
        self.end() - self.start
    }
}

/// The ordered, segmented list of widget proxies.
#[derive(Clone, Debug)]
pub struct WidgetList {
    pub(crate) segments: Vec<Option<Segment>>,
    free_segments: Vec<u16>,
    pub(crate) first: u16,
    pub(crate) last: u16,
    generation: u32,
    root: Option<WidgetId>,
    widget_map: HashMap<WidgetId, WidgetIndex>,
    config: WidgetListConfig,
    slot_bits: u32,
    processing_child_order: bool,
    len: usize,
}

impl Default for WidgetList {
    fn default() -> Self {
        Self::new(WidgetListConfig::default())
    }
}

impl WidgetList {
    /// Creates an empty list.
    #[must_use]
    pub fn new(config: WidgetListConfig) -> Self {
        let capacity = config.capacity();
        Self {
            segments: Vec::new(),
            free_segments: Vec::new(),
            first: NO_SEGMENT,
            last: NO_SEGMENT,
            generation: 0,
            root: None,
            widget_map: HashMap::new(),
            config,
            slot_bits: u16::BITS - (capacity - 1).leading_zeros(),
            processing_child_order: false,
            len: 0,
        }
    }

    /// Returns the configuration the list was created with.
    #[must_use]
    pub fn config(&self) -> WidgetListConfig {
        self.config
    }

    /// Returns the generation, bumped on every rebuild and restructure.
    #[must_use]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Returns the widget the list was last built from.
    #[must_use]
    pub fn root(&self) -> Option<WidgetId> {
        self.root
    }

    /// Returns the number of proxies with a live widget.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no proxy has a live widget.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of linked segments.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.segments.len() - self.free_segments.len()
    }

    /// Returns `true` while a child-order restructure is running.
    #[must_use]
    pub fn is_processing_child_order(&self) -> bool {
        self.processing_child_order
    }

    /// Discards every proxy and segment.
    pub fn clear(&mut self) {
        self.segments.clear();
        self.free_segments.clear();
        self.first = NO_SEGMENT;
        self.last = NO_SEGMENT;
        self.widget_map.clear();
        self.root = None;
        self.len = 0;
        self.generation = self.generation.wrapping_add(1);
    }

    // -- Lookup --

    /// Returns the proxy at `index`, if the index addresses a live slot.
    #[must_use]
    pub fn proxy(&self, index: WidgetIndex) -> Option<&WidgetProxy> {
        let segment = self.segment(index.segment)?;
        if index.slot < segment.start {
            return None;
        }
        segment.proxies.get(usize::from(index.slot))
    }

    /// Mutable access to the proxy at `index`.
    pub fn proxy_mut(&mut self, index: WidgetIndex) -> Option<&mut WidgetProxy> {
        let segment = self.segment_mut(index.segment)?;
        if index.slot < segment.start {
            return None;
        }
        segment.proxies.get_mut(usize::from(index.slot))
    }

    /// Returns the index of `widget`'s proxy.
    #[must_use]
    pub fn find_widget(&self, widget: WidgetId) -> Option<WidgetIndex> {
        let index = *self.widget_map.get(&widget)?;
        (self.proxy(index)?.widget == Some(widget)).then_some(index)
    }

    /// Returns the tree position of `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` does not address a live slot.
    #[must_use]
    pub fn sort_order(&self, index: WidgetIndex) -> SortOrder {
        match self.sort_order_checked(index) {
            Some(order) => order,
            None => panic!("{index:?} is not in the widget list"),
        }
    }

    /// Returns the tree position of `index`, or `None` if it does not
    /// address a live slot.
    #[must_use]
    pub fn sort_order_checked(&self, index: WidgetIndex) -> Option<SortOrder> {
        self.proxy(index)?;
        let segment = self.segment(index.segment)?;
        Some(SortOrder::new(
            segment.sort_order,
            index.slot,
            self.slot_bits,
        ))
    }

    /// Returns the range covering `index` and its whole subtree.
    ///
    /// # Panics
    ///
    /// Panics if `index` does not address a live slot.
    #[must_use]
    pub fn index_range(&self, index: WidgetIndex) -> IndexRange {
        let leaf = self
            .proxy(index)
            .map_or(index, |proxy| proxy.leaf_most_child_index);
        IndexRange::new(self.sort_order(index), self.sort_order(leaf))
    }

    // -- Iteration --

    /// Returns the first proxy's index in traversal order.
    #[must_use]
    pub fn first_index(&self) -> Option<WidgetIndex> {
        self.first_live_from(self.first)
    }

    /// Returns the index following `index` in traversal order.
    #[must_use]
    pub fn next_index(&self, index: WidgetIndex) -> Option<WidgetIndex> {
        let segment = self.segment(index.segment)?;
        if index.slot + 1 < segment.end() {
            return Some(WidgetIndex::new(index.segment, index.slot + 1));
        }
        self.first_live_from(segment.next)
    }

    /// Iterates every proxy in traversal order, including ones whose widget
    /// has been destroyed.
    #[must_use]
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            list: self,
            next: self.first_index(),
        }
    }

    /// Iterates proxies in traversal order starting at `index`.
    #[must_use]
    pub fn iter_from(&self, index: WidgetIndex) -> Iter<'_> {
        Iter {
            list: self,
            next: self.proxy(index).map(|_| index),
        }
    }

    /// Calls `f` with every listed widget that is still alive, in traversal
    /// order.
    pub fn for_each_widget(&self, mut f: impl FnMut(WidgetId)) {
        for proxy in self.iter() {
            if let Some(widget) = proxy.widget {
                f(widget);
            }
        }
    }

    /// Calls `f` with every proxy whose widget is still alive, in traversal
    /// order.
    pub fn for_each_proxy(&self, mut f: impl FnMut(&WidgetProxy)) {
        for proxy in self.iter() {
            if proxy.widget.is_some() {
                f(proxy);
            }
        }
    }

    /// Like [`for_each_proxy`](Self::for_each_proxy), with mutable access.
    pub fn for_each_proxy_mut(&mut self, mut f: impl FnMut(&mut WidgetProxy)) {
        let mut seg = self.first;
        while let Some(segment) = self.segment_mut(seg) {
            let start = usize::from(segment.start);
            for proxy in &mut segment.proxies[start..] {
                if proxy.widget.is_some() {
                    f(proxy);
                }
            }
            seg = segment.next;
        }
    }

    /// Returns the indices of volatile widgets, in traversal order.
    ///
    /// Widgets inside a volatile ancestor are not included; the ancestor
    /// repaints them.
    pub fn volatile_widgets(&self) -> impl Iterator<Item = WidgetIndex> + '_ {
        self.segments_in_order().flat_map(|(id, segment)| {
            segment
                .volatile_slots
                .iter()
                .map(move |&slot| WidgetIndex::new(id, slot))
        })
    }

    /// Returns the indices of widgets with bound attributes, in traversal
    /// order.
    pub fn attribute_widgets(&self) -> impl Iterator<Item = WidgetIndex> + '_ {
        self.segments_in_order().flat_map(|(id, segment)| {
            segment
                .attribute_slots
                .iter()
                .map(move |&slot| WidgetIndex::new(id, slot))
        })
    }

    // -- Element index maintenance --

    /// Records whether the widget at `index` is volatile.
    ///
    /// Keeps the proxy's [`NEEDS_VOLATILE_PAINT`](UpdateFlags::NEEDS_VOLATILE_PAINT)
    /// flag and the volatile index in step.
    pub fn set_volatile(&mut self, index: WidgetIndex, volatile: bool) {
        let Some(proxy) = self.proxy_mut(index) else {
            return;
        };
        proxy
            .update_flags
            .set(UpdateFlags::NEEDS_VOLATILE_PAINT, volatile);
        if let Some(segment) = self.segment_mut(index.segment) {
            set_sorted(&mut segment.volatile_slots, index.slot, volatile);
        }
    }

    /// Detaches a destroyed widget from its proxy.
    ///
    /// The proxy stays in place, inert, until its subtree is next rebuilt.
    /// Returns the proxy's index if the widget was listed.
    pub fn on_widget_destroyed(&mut self, widget: WidgetId) -> Option<WidgetIndex> {
        let index = self.find_widget(widget)?;
        self.widget_map.remove(&widget);
        self.detach_proxy(index);
        Some(index)
    }

    /// Clears the widget out of the proxy at `index`, leaving it inert in
    /// place. The widget map is left to the caller.
    pub(crate) fn detach_proxy(&mut self, index: WidgetIndex) {
        let Some(proxy) = self.proxy_mut(index) else {
            return;
        };
        if proxy.widget.take().is_none() {
            return;
        }
        proxy.update_flags = UpdateFlags::empty();
        if let Some(segment) = self.segment_mut(index.segment) {
            set_sorted(&mut segment.attribute_slots, index.slot, false);
            set_sorted(&mut segment.volatile_slots, index.slot, false);
        }
        self.len -= 1;
    }

    // -- Internal helpers --

    pub(crate) fn segment(&self, id: u16) -> Option<&Segment> {
        self.segments.get(usize::from(id))?.as_ref()
    }

    pub(crate) fn segment_mut(&mut self, id: u16) -> Option<&mut Segment> {
        self.segments.get_mut(usize::from(id))?.as_mut()
    }

    pub(crate) fn slot_bits(&self) -> u32 {
        self.slot_bits
    }

    pub(crate) fn capacity(&self) -> u16 {
        self.config.capacity()
    }

    pub(crate) fn max_segment_order(&self) -> u32 {
        u32::MAX >> self.slot_bits
    }

    pub(crate) fn bump_generation(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    pub(crate) fn set_root(&mut self, root: Option<WidgetId>) {
        self.root = root;
    }

    pub(crate) fn set_processing_child_order(&mut self, processing: bool) {
        self.processing_child_order = processing;
    }

    pub(crate) fn widget_map_mut(&mut self) -> &mut HashMap<WidgetId, WidgetIndex> {
        &mut self.widget_map
    }

    pub(crate) fn widget_map(&self) -> &HashMap<WidgetId, WidgetIndex> {
        &self.widget_map
    }

    pub(crate) fn adjust_len(&mut self, added: usize, removed: usize) {
        self.len = self.len + added - removed;
    }

    /// Segments in link order with their pool ids.
    pub(crate) fn segments_in_order(&self) -> impl Iterator<Item = (u16, &Segment)> + '_ {
        let mut next = self.first;
        core::iter::from_fn(move || {
            let id = next;
            let segment = self.segment(id)?;
            next = segment.next;
            Some((id, segment))
        })
    }

    fn first_live_from(&self, mut seg: u16) -> Option<WidgetIndex> {
        while let Some(segment) = self.segment(seg) {
            if segment.live() > 0 {
                return Some(WidgetIndex::new(seg, segment.start));
            }
            seg = segment.next;
        }
        None
    }

    /// Takes a segment id from the pool.
    pub(crate) fn alloc_segment(&mut self, sort_order: u32) -> u16 {
        let segment = Segment::new(sort_order);
        if let Some(id) = self.free_segments.pop() {
            self.segments[usize::from(id)] = Some(segment);
            id
        } else {
            #[expect(
                clippy::cast_possible_truncation,
                reason = "segment pool stays below u16::MAX entries"
            )]
            let id = self.segments.len() as u16;
            debug_assert!(id != NO_SEGMENT, "segment pool exhausted");
            self.segments.push(Some(segment));
            id
        }
    }

    /// Unlinks a segment and returns its id to the pool.
    pub(crate) fn free_segment(&mut self, id: u16) {
        let Some(segment) = self.segments.get_mut(usize::from(id)).and_then(Option::take) else {
            return;
        };
        match self.segment_mut(segment.prev) {
            Some(prev) => prev.next = segment.next,
            None => self.first = segment.next,
        }
        match self.segment_mut(segment.next) {
            Some(next) => next.prev = segment.prev,
            None => self.last = segment.prev,
        }
        self.free_segments.push(id);
    }
}

/// Iterator over proxies in traversal order.
///
/// Created by [`WidgetList::iter`] and [`WidgetList::iter_from`].
#[derive(Clone, Debug)]
pub struct Iter<'a> {
    list: &'a WidgetList,
    next: Option<WidgetIndex>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a WidgetProxy;

    fn next(&mut self) -> Option<&'a WidgetProxy> {
        let index = self.next?;
        self.next = self.list.next_index(index);
        self.list.proxy(index)
    }
}

/// Inserts or removes `slot` in an ascending slot list.
pub(crate) fn set_sorted(slots: &mut Vec<u16>, slot: u16, present: bool) {
    match (slots.binary_search(&slot), present) {
        (Err(at), true) => slots.insert(at, slot),
        (Ok(at), false) => {
            slots.remove(at);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use kurbo::Size;

    use super::*;
    use crate::arena::WidgetArena;

    #[test]
    fn slot_bits_follow_capacity() {
        assert_eq!(WidgetList::default().slot_bits(), 6);
        let big = WidgetListConfig::new().with_elements_per_segment(MAX_ELEMENTS_PER_SEGMENT);
        assert_eq!(WidgetList::new(big).slot_bits(), 12);
        let tiny = WidgetListConfig::new().with_elements_per_segment(1);
        assert_eq!(WidgetList::new(tiny).slot_bits(), 1, "capacity clamps to 2");
    }

    #[test]
    fn set_sorted_keeps_order() {
        let mut slots = vec![1, 5];
        set_sorted(&mut slots, 3, true);
        set_sorted(&mut slots, 3, true);
        assert_eq!(slots, [1, 3, 5]);
        set_sorted(&mut slots, 1, false);
        assert_eq!(slots, [3, 5]);
    }

    #[test]
    fn destroying_the_only_widget_empties_the_list() {
        let mut arena = WidgetArena::new();
        let root = arena.create_widget();
        let mut list = WidgetList::default();
        list.build(&arena, root);
        assert_eq!(list.len(), 1);
        arena.destroy_widget(root);
        assert!(list.on_widget_destroyed(root).is_some());
        assert!(list.is_empty());
        assert!(list.find_widget(root).is_none());
        let mut visited = 0;
        list.for_each_widget(|_| visited += 1);
        assert_eq!(visited, 0, "destroyed widgets are skipped");
    }

    #[test]
    fn next_index_crosses_segments() {
        let mut arena = WidgetArena::new();
        let root = arena.create_widget();
        for _ in 0..5 {
            arena.create_child(root, Size::ZERO);
        }
        let config = WidgetListConfig::new().with_elements_per_segment(2);
        let mut list = WidgetList::new(config);
        list.build(&arena, root);
        assert_eq!(list.segment_count(), 3);
        let mut widgets = vec![];
        list.for_each_widget(|w| widgets.push(w));
        assert_eq!(widgets, arena.subtree(root));
    }
}
