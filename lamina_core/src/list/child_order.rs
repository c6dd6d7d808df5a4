// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Incremental subtree rebuilds.

use alloc::vec::Vec;

use hashbrown::HashSet;

use crate::arena::WidgetId;
use crate::host::WidgetHost;
use crate::proxy::WidgetProxy;

use super::{IndexRange, WidgetIndex, WidgetList, set_sorted};

/// One proxy moved from `old` to `new` by a segment split or merge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Relocation {
    /// Index before the move.
    pub old: WidgetIndex,
    /// Index after the move.
    pub new: WidgetIndex,
}

/// Notified while a [`WidgetList`] restructures, so that anything holding
/// indices or sort orders into it can stay correct.
///
/// Every method has an empty default; `()` observes nothing.
pub trait ChildOrderObserver {
    /// `parent`'s descendants, covering `removed`, are about to be cut out.
    fn pre_child_remove(&mut self, _list: &WidgetList, _parent: WidgetIndex, _removed: IndexRange) {
    }

    /// Proxies moved to new indices.
    fn proxies_reindexed(&mut self, _list: &WidgetList, _moved: &[Relocation]) {}

    /// Segment order numbers are about to change.
    fn proxies_pre_resort(&mut self, _list: &WidgetList) {}

    /// Segment order numbers changed; cached sort orders are stale.
    fn proxies_post_resort(&mut self, _list: &WidgetList) {}

    /// `parent`'s new descendants are in place, covering `built`.
    fn proxies_built(&mut self, _list: &WidgetList, _parent: WidgetIndex, _built: Option<IndexRange>) {
    }
}

impl ChildOrderObserver for () {}

/// What a child-order rebuild changed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChildOrderChange {
    /// Widgets that were listed under the parent and no longer are.
    pub removed: Vec<WidgetId>,
    /// Every widget now listed under the parent, in traversal order.
    ///
    /// Widgets that were already listed before the rebuild are included:
    /// their proxies are fresh.
    pub rebuilt: Vec<WidgetId>,
}

impl WidgetList {
    /// Rebuilds `widget`'s descendants from the host tree.
    ///
    /// Returns `None` if `widget` is not listed. Proxies outside the subtree
    /// keep their order; indices that change are reported to `observer`.
    pub fn process_child_order_invalidation<H, O>(
        &mut self,
        host: &H,
        widget: WidgetId,
        observer: &mut O,
    ) -> Option<ChildOrderChange>
    where
        H: WidgetHost,
        O: ChildOrderObserver + ?Sized,
    {
        let parent = self.find_widget(widget)?;
        let (old_leaf, mut cursor) = self
            .proxy(parent)
            .map(|proxy| (proxy.leaf_most_child_index, proxy.parent_index))?;
        debug_assert!(
            !self.is_processing_child_order(),
            "child order processing is not re-entrant"
        );
        self.set_processing_child_order(true);

        // Ancestors whose subtree ends where ours does must follow the new end.
        let mut ancestors = Vec::new();
        while let Some(proxy) = self.proxy(cursor) {
            if proxy.leaf_most_child_index != old_leaf {
                break;
            }
            ancestors.push(cursor);
            cursor = proxy.parent_index;
        }

        let mut removed = Vec::new();
        if old_leaf != parent {
            let range = IndexRange::new(self.sort_order(parent).next(), self.sort_order(old_leaf));
            observer.pre_child_remove(self, parent, range);
            self.cut_after(parent, old_leaf, &mut removed, observer);
        }

        let visits = host.is_alive(widget) && self.visits_children(host, widget);
        let has_children = visits && host.children(widget).any(|child| !host.is_null_widget(child));
        if has_children {
            let parent_end = self.segment(parent.segment).map_or(0, |segment| segment.end());
            if parent.slot + 1 < parent_end {
                self.split_segment(parent.segment, parent.slot + 1, observer);
            }
        }

        let mut leaf = parent;
        if has_children {
            let visibility = self.proxy(parent).map(|proxy| proxy.visibility);
            let mut segment = parent.segment;
            for child in host.children(widget) {
                if host.is_null_widget(child) {
                    continue;
                }
                leaf = self.emplace_subtree(host, child, parent, visibility, &mut segment, observer);
            }
        }
        for index in core::iter::once(parent).chain(ancestors) {
            if let Some(proxy) = self.proxy_mut(index) {
                proxy.leaf_most_child_index = leaf;
            }
        }

        let mut rebuilt = Vec::new();
        let built = if leaf == parent {
            None
        } else {
            let mut next = self.next_index(parent);
            while let Some(index) = next {
                rebuilt.extend(self.proxy(index).and_then(|proxy| proxy.widget));
                if index == leaf {
                    break;
                }
                next = self.next_index(index);
            }
            Some(IndexRange::new(
                self.sort_order(parent).next(),
                self.sort_order(leaf),
            ))
        };

        if !removed.is_empty() && !rebuilt.is_empty() {
            let relisted: HashSet<WidgetId> = rebuilt.iter().copied().collect();
            removed.retain(|widget| !relisted.contains(widget));
        }
        observer.proxies_built(self, parent, built);

        self.merge_segments_around(parent, leaf, observer);

        self.bump_generation();
        self.set_processing_child_order(false);
        Some(ChildOrderChange { removed, rebuilt })
    }

    /// Cuts everything after `parent` up to and including `old_leaf`.
    fn cut_after<O>(
        &mut self,
        parent: WidgetIndex,
        old_leaf: WidgetIndex,
        removed: &mut Vec<WidgetId>,
        observer: &mut O,
    ) where
        O: ChildOrderObserver + ?Sized,
    {
        let mut cut = 0;
        let mut next = self.next_index(parent);
        while let Some(index) = next {
            if let Some(widget) = self.proxy(index).and_then(|proxy| proxy.widget) {
                self.widget_map_mut().remove(&widget);
                removed.push(widget);
                cut += 1;
            }
            if index == old_leaf {
                break;
            }
            next = self.next_index(index);
        }
        self.adjust_len(0, cut);

        let first = parent.segment;
        let last = old_leaf.segment;
        let last_end = self.segment(last).map_or(0, |segment| segment.end());
        if first == last {
            if old_leaf.slot + 1 < last_end {
                self.split_segment(first, old_leaf.slot + 1, observer);
            }
            self.truncate_segment(first, parent.slot + 1);
            return;
        }

        self.truncate_segment(first, parent.slot + 1);
        let mut seg = self.segment(first).map_or(last, |segment| segment.next);
        while seg != last {
            let Some(segment) = self.segment(seg) else {
                break;
            };
            let after = segment.next;
            self.free_segment(seg);
            seg = after;
        }
        if old_leaf.slot + 1 >= last_end {
            self.free_segment(last);
        } else {
            self.trim_segment_head(last, old_leaf.slot + 1);
        }
    }

    fn truncate_segment(&mut self, id: u16, end: u16) {
        if let Some(segment) = self.segment_mut(id) {
            segment.proxies.truncate(usize::from(end));
            segment.attribute_slots.retain(|&slot| slot < end);
            segment.volatile_slots.retain(|&slot| slot < end);
        }
    }

    /// Kills the slots before `start`; survivors keep their indices.
    fn trim_segment_head(&mut self, id: u16, start: u16) {
        if let Some(segment) = self.segment_mut(id) {
            for proxy in &mut segment.proxies[usize::from(segment.start)..usize::from(start)] {
                *proxy = WidgetProxy::inert();
            }
            segment.start = start;
            segment.attribute_slots.retain(|&slot| slot >= start);
            segment.volatile_slots.retain(|&slot| slot >= start);
        }
    }

    /// Moves the slots from `at` on into a new segment linked after `id`.
    fn split_segment<O>(&mut self, id: u16, at: u16, observer: &mut O)
    where
        O: ChildOrderObserver + ?Sized,
    {
        let target = self.insert_segment_after(id, observer);
        self.move_block(id, at, target, observer);
    }

    /// Merges segments left small by a rebuild of `parent`'s subtree into
    /// their predecessors.
    fn merge_segments_around<O>(&mut self, parent: WidgetIndex, leaf: WidgetIndex, observer: &mut O)
    where
        O: ChildOrderObserver + ?Sized,
    {
        let mut candidates = Vec::new();
        let mut seg = parent.segment;
        while let Some(segment) = self.segment(seg) {
            candidates.push(seg);
            if seg == leaf.segment {
                if self.segment(segment.next).is_some() {
                    candidates.push(segment.next);
                }
                break;
            }
            seg = segment.next;
        }

        let min = self.config().min_elements_before_merge;
        let capacity = self.capacity();
        for id in candidates {
            let Some(segment) = self.segment(id) else {
                continue;
            };
            let live = segment.live();
            if live >= min {
                continue;
            }
            let Some(prev) = self.segment(segment.prev) else {
                continue;
            };
            if prev.end() + live > capacity {
                continue;
            }
            let prev_id = segment.prev;
            let start = segment.start;
            self.move_block(id, start, prev_id, observer);
            self.free_segment(id);
        }
    }

    /// Moves slots `from..` of `src` onto the tail of `dst`.
    ///
    /// Every index that pointed into the moved block is patched: the moved
    /// proxies' own links, ancestors whose leaf-most child moved, and
    /// later proxies whose parent moved.
    fn move_block<O>(&mut self, src: u16, from: u16, dst: u16, observer: &mut O)
    where
        O: ChildOrderObserver + ?Sized,
    {
        let Some(base) = self.segment(dst).map(|segment| segment.end()) else {
            return;
        };
        let remap = move |index: WidgetIndex| {
            if index.segment == src && index.slot >= from {
                WidgetIndex::new(dst, base + (index.slot - from))
            } else {
                index
            }
        };

        let (moved, attributes, volatiles) = match self.segment_mut(src) {
            Some(segment) => {
                let moved: Vec<WidgetProxy> = segment.proxies.drain(usize::from(from)..).collect();
                let split = segment.attribute_slots.partition_point(|&slot| slot < from);
                let attributes = segment.attribute_slots.split_off(split);
                let split = segment.volatile_slots.partition_point(|&slot| slot < from);
                let volatiles = segment.volatile_slots.split_off(split);
                (moved, attributes, volatiles)
            }
            None => return,
        };
        if moved.is_empty() {
            return;
        }

        let mut relocations = Vec::with_capacity(moved.len());
        let mut patched = Vec::with_capacity(moved.len());
        for mut proxy in moved {
            let old = proxy.index;
            let new = remap(old);
            proxy.index = new;
            proxy.parent_index = remap(proxy.parent_index);
            proxy.leaf_most_child_index = remap(proxy.leaf_most_child_index);
            relocations.push(Relocation { old, new });
            patched.push(proxy);
        }
        for proxy in &patched {
            if let Some(widget) = proxy.widget {
                self.widget_map_mut().insert(widget, proxy.index);
            }
        }
        if let Some(segment) = self.segment_mut(dst) {
            segment.proxies.extend(patched);
            for slot in attributes {
                set_sorted(&mut segment.attribute_slots, remap(WidgetIndex::new(src, slot)).slot, true);
            }
            for slot in volatiles {
                set_sorted(&mut segment.volatile_slots, remap(WidgetIndex::new(src, slot)).slot, true);
            }
        }

        // Ancestors outside the block whose subtree ends inside it.
        let first_moved = relocations[0].new;
        let mut ancestor = self.proxy(first_moved).map_or(WidgetIndex::INVALID, |p| p.parent_index);
        while let Some(proxy) = self.proxy_mut(ancestor) {
            let leaf = remap(proxy.leaf_most_child_index);
            if leaf == proxy.leaf_most_child_index {
                break;
            }
            proxy.leaf_most_child_index = leaf;
            ancestor = proxy.parent_index;
        }

        // Later proxies whose parent sits in the block.
        let last_moved = relocations[relocations.len() - 1].new;
        let reach = relocations
            .iter()
            .filter_map(|r| self.proxy(r.new))
            .filter_map(|proxy| self.sort_order_checked(proxy.leaf_most_child_index))
            .max();
        let mut next = self.next_index(last_moved);
        while let (Some(index), Some(reach)) = (next, reach) {
            if self.sort_order_checked(index).is_none_or(|order| order > reach) {
                break;
            }
            if let Some(proxy) = self.proxy_mut(index) {
                proxy.parent_index = remap(proxy.parent_index);
            }
            next = self.next_index(index);
        }

        observer.proxies_reindexed(self, &relocations);
    }
}
