// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The three update queues.
//!
//! Each queue is a priority heap of [`WidgetIndex`] keyed by the proxy's
//! [`SortOrder`]:
//!
//! - [`PreUpdateHeap`] pops root-first. It resolves child-order and
//!   attribute-registration changes, which restructure the list, so it runs
//!   before anything that relies on indices.
//! - [`PrepassHeap`] pops root-first, so a parent's prepass covers its
//!   subtree before any queued descendant is looked at.
//! - [`PostUpdateHeap`] pops leaf-first, so a parent recomputing its desired
//!   size sees finalized child sizes.
//!
//! Membership is tracked on the proxy itself ([`HeapMembership`]), which
//! makes [`push_unique`](WidgetHeap::push_unique) idempotent in O(1).
//!
//! The post-update heap is *deferred*: until the post-update phase starts it
//! is an unsorted buffer ([`push_back_unique`](WidgetHeap::push_back_unique)),
//! so restructuring earlier in the frame never has to re-sort it. The phase
//! forms the heap once with [`heapify`](WidgetHeap::heapify).

use alloc::collections::BinaryHeap;
use alloc::vec::Vec;
use core::cmp::Ordering;
use core::marker::PhantomData;

use hashbrown::HashMap;

use crate::list::{ChildOrderObserver, IndexRange, Relocation, SortOrder, WidgetIndex, WidgetList};
use crate::proxy::HeapMembership;

/// Ordering discipline and membership bit of one heap.
pub trait HeapKind {
    /// Bit set on proxies contained in this heap.
    const MEMBERSHIP: HeapMembership;
    /// Pops the lowest sort order first when `true`.
    const ASCENDING: bool;
    /// Buffers pushes until [`WidgetHeap::heapify`] when `true`.
    const DEFERRED: bool;
    /// Name used in diagnostics.
    const NAME: &'static str;
}

/// Marker for the pre-update heap.
#[derive(Clone, Copy, Debug, Default)]
pub struct PreUpdate;

/// Marker for the prepass heap.
#[derive(Clone, Copy, Debug, Default)]
pub struct Prepass;

/// Marker for the post-update heap.
#[derive(Clone, Copy, Debug, Default)]
pub struct PostUpdate;

impl HeapKind for PreUpdate {
    const MEMBERSHIP: HeapMembership = HeapMembership::PRE_UPDATE;
    const ASCENDING: bool = true;
    const DEFERRED: bool = false;
    const NAME: &'static str = "pre-update";
}

impl HeapKind for Prepass {
    const MEMBERSHIP: HeapMembership = HeapMembership::PREPASS;
    const ASCENDING: bool = true;
    const DEFERRED: bool = false;
    const NAME: &'static str = "prepass";
}

impl HeapKind for PostUpdate {
    const MEMBERSHIP: HeapMembership = HeapMembership::POST_UPDATE;
    const ASCENDING: bool = false;
    const DEFERRED: bool = true;
    const NAME: &'static str = "post-update";
}

/// Root-first heap of widgets needing structural updates.
pub type PreUpdateHeap = WidgetHeap<PreUpdate>;
/// Root-first heap of widgets needing a layout prepass.
pub type PrepassHeap = WidgetHeap<Prepass>;
/// Leaf-first heap of widgets needing post-layout work.
pub type PostUpdateHeap = WidgetHeap<PostUpdate>;

#[derive(Clone, Copy, Debug)]
struct Entry {
    key: u32,
    index: WidgetIndex,
}

// Keys are unique per list, so ordering by key alone is total.
impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

/// A priority queue of proxies awaiting one processing phase.
#[derive(Debug)]
pub struct WidgetHeap<K: HeapKind> {
    heap: BinaryHeap<Entry>,
    deferred: Vec<WidgetIndex>,
    heapified: bool,
    _kind: PhantomData<K>,
}

impl<K: HeapKind> Default for WidgetHeap<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: HeapKind> WidgetHeap<K> {
    /// Creates an empty heap.
    #[must_use]
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            deferred: Vec::new(),
            heapified: !K::DEFERRED,
            _kind: PhantomData,
        }
    }

    /// Returns the number of queued proxies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len() + self.deferred.len()
    }

    /// Returns `true` if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if the heap property currently holds, as opposed to
    /// pushes being buffered.
    #[must_use]
    pub fn is_heapified(&self) -> bool {
        self.heapified
    }

    /// Queues `index` unless it is already queued.
    ///
    /// Returns `true` if it was added. Indices that do not resolve to a
    /// proxy are ignored.
    pub fn push_unique(&mut self, list: &mut WidgetList, index: WidgetIndex) -> bool {
        let Some(order) = list.sort_order_checked(index) else {
            return false;
        };
        let Some(proxy) = list.proxy_mut(index) else {
            return false;
        };
        if proxy.heaps.contains(K::MEMBERSHIP) {
            return false;
        }
        proxy.heaps.insert(K::MEMBERSHIP);
        if self.heapified {
            self.heap.push(Entry {
                key: Self::key(order),
                index,
            });
        } else {
            self.deferred.push(index);
        }
        true
    }

    /// Appends `index` to the unsorted buffer unless it is already queued.
    ///
    /// Equivalent to [`push_unique`](Self::push_unique); named separately
    /// for call sites that run before [`heapify`](Self::heapify).
    pub fn push_back_unique(&mut self, list: &mut WidgetList, index: WidgetIndex) -> bool {
        debug_assert!(!self.heapified, "{} heap is already heapified", K::NAME);
        self.push_unique(list, index)
    }

    /// Forms the heap from everything buffered so far.
    pub fn heapify(&mut self, list: &WidgetList) {
        let mut entries = core::mem::take(&mut self.heap).into_vec();
        entries.extend(self.deferred.drain(..).filter_map(|index| {
            list.sort_order_checked(index).map(|order| Entry {
                key: Self::key(order),
                index,
            })
        }));
        self.heap = BinaryHeap::from(entries);
        self.heapified = true;
    }

    /// Turns a deferred heap back into an unsorted buffer, keeping its
    /// contents. Does nothing for heaps that are never deferred.
    pub fn defer(&mut self) {
        if K::DEFERRED {
            self.deferred
                .extend(self.heap.drain().map(|entry| entry.index));
            self.heapified = false;
        }
    }

    /// Returns the next index and its sort order without removing it.
    #[must_use]
    pub fn peek(&self) -> Option<(SortOrder, WidgetIndex)> {
        debug_assert!(self.heapified, "{} heap peeked before heapify", K::NAME);
        self.heap
            .peek()
            .map(|entry| (Self::order(entry.key), entry.index))
    }

    /// Removes and returns the next index in this heap's order.
    pub fn pop(&mut self, list: &mut WidgetList) -> Option<WidgetIndex> {
        debug_assert!(self.heapified, "{} heap popped before heapify", K::NAME);
        let entry = self.heap.pop()?;
        if let Some(proxy) = list.proxy_mut(entry.index) {
            proxy.heaps.remove(K::MEMBERSHIP);
        }
        Some(entry.index)
    }

    /// Empties the heap.
    ///
    /// `clear_flags` also clears the membership bit on each queued proxy;
    /// skip it when the list is about to be discarded anyway.
    pub fn reset(&mut self, list: &mut WidgetList, clear_flags: bool) {
        if clear_flags {
            for index in self.iter().collect::<Vec<_>>() {
                if let Some(proxy) = list.proxy_mut(index) {
                    proxy.heaps.remove(K::MEMBERSHIP);
                }
            }
        }
        self.heap.clear();
        self.deferred.clear();
        self.heapified = !K::DEFERRED;
    }

    /// Returns the queued indices in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = WidgetIndex> + '_ {
        self.heap
            .iter()
            .map(|entry| entry.index)
            .chain(self.deferred.iter().copied())
    }

    /// Returns `true` if `index` is queued, by scanning the heap.
    ///
    /// Used to cross-check proxy membership bits.
    #[must_use]
    pub fn contains_scan(&self, index: WidgetIndex) -> bool {
        self.iter().any(|queued| queued == index)
    }

    fn key(order: SortOrder) -> u32 {
        if K::ASCENDING { !order.0 } else { order.0 }
    }

    fn order(key: u32) -> SortOrder {
        SortOrder(if K::ASCENDING { !key } else { key })
    }

    fn rebuild(&mut self, list: &WidgetList, mut remap: impl FnMut(WidgetIndex) -> WidgetIndex) {
        let entries: Vec<Entry> = core::mem::take(&mut self.heap)
            .into_vec()
            .into_iter()
            .filter_map(|entry| {
                let index = remap(entry.index);
                list.sort_order_checked(index).map(|order| Entry {
                    key: Self::key(order),
                    index,
                })
            })
            .collect();
        self.heap = BinaryHeap::from(entries);
        for index in &mut self.deferred {
            *index = remap(*index);
        }
    }
}

impl<K: HeapKind> ChildOrderObserver for WidgetHeap<K> {
    fn pre_child_remove(&mut self, list: &WidgetList, _parent: WidgetIndex, removed: IndexRange) {
        let keep = |index: &WidgetIndex| {
            list.sort_order_checked(*index)
                .is_some_and(|order| !removed.includes(order))
        };
        self.heap.retain(|entry| keep(&entry.index));
        self.deferred.retain(keep);
    }

    fn proxies_reindexed(&mut self, list: &WidgetList, moved: &[Relocation]) {
        let map: HashMap<WidgetIndex, WidgetIndex> =
            moved.iter().map(|r| (r.old, r.new)).collect();
        self.rebuild(list, |index| map.get(&index).copied().unwrap_or(index));
    }

    fn proxies_post_resort(&mut self, list: &WidgetList) {
        self.rebuild(list, |index| index);
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;

    use kurbo::Size;

    use super::*;
    use crate::arena::{WidgetArena, WidgetId};

    fn flat_list(n: usize) -> (WidgetArena, WidgetList, Vec<WidgetId>) {
        let mut arena = WidgetArena::new();
        let root = arena.create_widget();
        let mut ids = vec![root];
        for _ in 0..n {
            ids.push(arena.create_child(root, Size::new(1.0, 1.0)));
        }
        let mut list = WidgetList::default();
        list.build(&arena, root);
        (arena, list, ids)
    }

    fn index_of(list: &WidgetList, id: WidgetId) -> WidgetIndex {
        list.find_widget(id).expect("widget is listed")
    }

    #[test]
    fn push_unique_is_idempotent() {
        let (_arena, mut list, ids) = flat_list(3);
        let mut heap = PreUpdateHeap::new();
        let b = index_of(&list, ids[2]);
        assert!(heap.push_unique(&mut list, b));
        assert!(!heap.push_unique(&mut list, b), "second push is a no-op");
        assert_eq!(heap.len(), 1);
        assert!(list.proxy(b).unwrap().heaps.contains(HeapMembership::PRE_UPDATE));
    }

    #[test]
    fn ascending_heap_pops_root_first() {
        let (_arena, mut list, ids) = flat_list(3);
        let mut heap = PrepassHeap::new();
        for &id in ids.iter().rev() {
            let index = index_of(&list, id);
            heap.push_unique(&mut list, index);
        }
        let popped: Vec<_> = core::iter::from_fn(|| heap.pop(&mut list)).collect();
        let expected: Vec<_> = ids.iter().map(|&id| index_of(&list, id)).collect();
        assert_eq!(popped, expected);
    }

    #[test]
    fn post_heap_buffers_then_pops_leaf_first() {
        let (_arena, mut list, ids) = flat_list(3);
        let mut heap = PostUpdateHeap::new();
        assert!(!heap.is_heapified());
        for &id in &ids {
            let index = index_of(&list, id);
            heap.push_back_unique(&mut list, index);
        }
        heap.heapify(&list);
        let popped: Vec<_> = core::iter::from_fn(|| heap.pop(&mut list)).collect();
        let expected: Vec<_> = ids.iter().rev().map(|&id| index_of(&list, id)).collect();
        assert_eq!(popped, expected);
    }

    #[test]
    fn defer_returns_to_buffering() {
        let (_arena, mut list, ids) = flat_list(2);
        let mut heap = PostUpdateHeap::new();
        heap.heapify(&list);
        let a = index_of(&list, ids[1]);
        heap.push_unique(&mut list, a);
        heap.defer();
        assert!(!heap.is_heapified());
        assert_eq!(heap.len(), 1, "contents survive");
        let b = index_of(&list, ids[2]);
        heap.push_back_unique(&mut list, b);
        heap.heapify(&list);
        assert_eq!(heap.pop(&mut list), Some(b));
        assert_eq!(heap.pop(&mut list), Some(a));
    }

    #[test]
    fn pop_clears_membership() {
        let (_arena, mut list, ids) = flat_list(1);
        let mut heap = PreUpdateHeap::new();
        let index = index_of(&list, ids[1]);
        heap.push_unique(&mut list, index);
        assert_eq!(heap.pop(&mut list), Some(index));
        assert!(list.proxy(index).unwrap().heaps.is_empty());
        assert!(heap.push_unique(&mut list, index), "can be queued again");
    }

    #[test]
    fn reset_with_and_without_flags() {
        let (_arena, mut list, ids) = flat_list(2);
        let mut heap = PrepassHeap::new();
        let a = index_of(&list, ids[1]);
        let b = index_of(&list, ids[2]);
        heap.push_unique(&mut list, a);
        heap.reset(&mut list, false);
        assert!(heap.is_empty());
        assert!(
            list.proxy(a).unwrap().heaps.contains(HeapMembership::PREPASS),
            "flags survive a reset that skips them"
        );
        list.proxy_mut(a).unwrap().heaps = HeapMembership::empty();
        heap.push_unique(&mut list, b);
        heap.reset(&mut list, true);
        assert!(list.proxy(b).unwrap().heaps.is_empty());
    }

    #[test]
    fn pre_child_remove_drops_entries_in_range() {
        let (_arena, mut list, ids) = flat_list(3);
        let mut heap = PostUpdateHeap::new();
        for &id in &ids[1..] {
            let index = index_of(&list, id);
            heap.push_back_unique(&mut list, index);
        }
        let b = list.sort_order(index_of(&list, ids[2]));
        let root = index_of(&list, ids[0]);
        heap.pre_child_remove(&list, root, IndexRange::new(b, b));
        assert_eq!(heap.len(), 2);
        assert!(!heap.contains_scan(index_of(&list, ids[2])));
    }
}
