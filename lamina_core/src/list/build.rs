// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Emplacing proxies and numbering segments.

use crate::arena::WidgetId;
use crate::host::WidgetHost;
use crate::proxy::WidgetProxy;
use crate::reason::UpdateFlags;
use crate::visibility::WidgetVisibility;

use super::{ChildOrderObserver, NO_SEGMENT, WidgetIndex, WidgetList};

impl WidgetList {
    /// Rebuilds the list from `root`'s subtree.
    ///
    /// Null widgets are left out, and so is everything below a nested
    /// invalidation root other than `root` itself. A dead or null `root`
    /// leaves the list empty.
    pub fn build<H: WidgetHost>(&mut self, host: &H, root: WidgetId) {
        self.clear();
        self.set_root(Some(root));
        if !host.is_alive(root) || host.is_null_widget(root) {
            return;
        }
        let order = self
            .config()
            .sort_order_padding
            .clamp(1, self.max_segment_order());
        let segment = self.alloc_segment(order);
        self.first = segment;
        self.last = segment;
        let mut cursor = segment;
        self.emplace_subtree(host, root, WidgetIndex::INVALID, None, &mut cursor, &mut ());
    }

    /// Appends `widget` and its descendants after `cursor`'s tail.
    ///
    /// Returns the index of the last proxy emplaced.
    pub(crate) fn emplace_subtree<H, O>(
        &mut self,
        host: &H,
        widget: WidgetId,
        parent: WidgetIndex,
        parent_visibility: Option<WidgetVisibility>,
        cursor: &mut u16,
        observer: &mut O,
    ) -> WidgetIndex
    where
        H: WidgetHost,
        O: ChildOrderObserver + ?Sized,
    {
        let index = self.emplace_proxy(host, widget, parent, parent_visibility, cursor, observer);
        let mut leaf = index;
        if self.visits_children(host, widget) {
            let visibility = self.proxy(index).map(|proxy| proxy.visibility);
            for child in host.children(widget) {
                if host.is_null_widget(child) {
                    continue;
                }
                leaf = self.emplace_subtree(host, child, index, visibility, cursor, observer);
            }
        }
        if let Some(proxy) = self.proxy_mut(index) {
            proxy.leaf_most_child_index = leaf;
        }
        leaf
    }

    /// Nested invalidation roots own their subtree.
    pub(crate) fn visits_children<H: WidgetHost>(&self, host: &H, widget: WidgetId) -> bool {
        self.root() == Some(widget) || !host.is_invalidation_root(widget)
    }

    fn emplace_proxy<H, O>(
        &mut self,
        host: &H,
        widget: WidgetId,
        parent: WidgetIndex,
        parent_visibility: Option<WidgetVisibility>,
        cursor: &mut u16,
        observer: &mut O,
    ) -> WidgetIndex
    where
        H: WidgetHost,
        O: ChildOrderObserver + ?Sized,
    {
        let full = self
            .segment(*cursor)
            .is_none_or(|segment| segment.end() >= self.capacity());
        if full {
            *cursor = self.insert_segment_after(*cursor, observer);
        }

        let volatile = host.is_volatile(widget) && !host.is_volatile_indirectly(widget);
        let attributes = host.has_registered_attributes(widget);
        let is_root = self.root() == Some(widget);

        let Some(segment) = self.segment_mut(*cursor) else {
            return WidgetIndex::INVALID;
        };
        let slot = segment.end();
        let index = WidgetIndex::new(*cursor, slot);

        let mut proxy = WidgetProxy::new(widget, index, parent);
        let own = host.visibility(widget);
        proxy.visibility = match parent_visibility {
            Some(parent) => WidgetVisibility::new(parent, own),
            None => WidgetVisibility::root(own),
        };
        proxy.is_invalidation_root = !is_root && host.is_invalidation_root(widget);
        proxy.update_flags = host.update_flags(widget) & UpdateFlags::HOST_DRIVEN;
        proxy.update_flags.set(UpdateFlags::NEEDS_VOLATILE_PAINT, volatile);

        segment.proxies.push(proxy);
        if attributes {
            segment.attribute_slots.push(slot);
        }
        if volatile {
            segment.volatile_slots.push(slot);
        }

        self.adjust_len(1, 0);
        // A widget moved out of a subtree that has not been rebuilt yet
        // still has its old proxy there.
        if let Some(stale) = self.widget_map_mut().insert(widget, index) {
            self.detach_proxy(stale);
        }
        index
    }

    // -- Segment numbering --

    /// Links a fresh segment after `after` and gives it an order number.
    pub(crate) fn insert_segment_after<O>(&mut self, after: u16, observer: &mut O) -> u16
    where
        O: ChildOrderObserver + ?Sized,
    {
        let id = self.alloc_segment(0);
        let next = self.segment(after).map_or(NO_SEGMENT, |segment| segment.next);
        if let Some(segment) = self.segment_mut(id) {
            segment.prev = after;
            segment.next = next;
        }
        match self.segment_mut(after) {
            Some(segment) => segment.next = id,
            None => self.first = id,
        }
        match self.segment_mut(next) {
            Some(segment) => segment.prev = id,
            None => self.last = id,
        }
        self.assign_order(id, observer);
        id
    }

    fn assign_order<O>(&mut self, id: u16, observer: &mut O)
    where
        O: ChildOrderObserver + ?Sized,
    {
        let Some(segment) = self.segment(id) else {
            return;
        };
        let padding = self.config().sort_order_padding.max(1);
        let prev = self.segment(segment.prev).map_or(0, |s| s.sort_order);
        let next = self.segment(segment.next).map(|s| s.sort_order);
        let order = match next {
            Some(next) if next > prev + 1 => Some(prev + (next - prev) / 2),
            Some(_) => None,
            None => prev
                .checked_add(padding)
                .filter(|order| *order <= self.max_segment_order()),
        };
        match order {
            Some(order) => {
                if let Some(segment) = self.segment_mut(id) {
                    segment.sort_order = order;
                }
            }
            None => self.renumber_from(id, observer),
        }
    }

    /// Renumbers `from` and as many following segments as needed to open a
    /// gap, falling back to renumbering the whole list.
    fn renumber_from<O>(&mut self, from: u16, observer: &mut O)
    where
        O: ChildOrderObserver + ?Sized,
    {
        observer.proxies_pre_resort(self);
        let padding = self.config().sort_order_padding.max(1);
        let max_order = self.max_segment_order();
        let mut order = self
            .segment(from)
            .and_then(|segment| self.segment(segment.prev))
            .map_or(0, |prev| prev.sort_order);
        let mut seg = from;
        let mut fits = true;
        while let Some(segment) = self.segment(seg) {
            if seg != from && segment.sort_order > order {
                break;
            }
            let Some(next_order) = order.checked_add(padding).filter(|o| *o <= max_order) else {
                fits = false;
                break;
            };
            order = next_order;
            let next = segment.next;
            if let Some(segment) = self.segment_mut(seg) {
                segment.sort_order = order;
            }
            seg = next;
        }
        if !fits {
            self.renumber_all();
        }
        observer.proxies_post_resort(self);
    }

    fn renumber_all(&mut self) {
        let count = u32::try_from(self.segment_count()).unwrap_or(u32::MAX);
        let padding = self
            .config()
            .sort_order_padding
            .min(self.max_segment_order() / count.saturating_add(1))
            .max(1);
        let mut order = 0_u32;
        let mut seg = self.first;
        while let Some(segment) = self.segment_mut(seg) {
            order += padding;
            segment.sort_order = order;
            seg = segment.next;
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use kurbo::Size;

    use super::*;
    use crate::arena::{WidgetArena, WidgetFlags};
    use crate::list::WidgetListConfig;
    use crate::visibility::Visibility;

    fn widgets(list: &WidgetList) -> Vec<WidgetId> {
        let mut out = Vec::new();
        list.for_each_widget(|w| out.push(w));
        out
    }

    #[test]
    fn build_lists_pre_order() {
        let mut arena = WidgetArena::new();
        let root = arena.create_widget();
        let a = arena.create_child(root, Size::ZERO);
        let a1 = arena.create_child(a, Size::ZERO);
        let b = arena.create_child(root, Size::ZERO);

        let mut list = WidgetList::default();
        list.build(&arena, root);
        assert_eq!(widgets(&list), [root, a, a1, b]);

        let root_index = list.find_widget(root).unwrap();
        let a_index = list.find_widget(a).unwrap();
        let root_proxy = list.proxy(root_index).unwrap();
        assert_eq!(root_proxy.parent_index(), WidgetIndex::INVALID);
        assert_eq!(root_proxy.leaf_most_child_index(), list.find_widget(b).unwrap());
        assert_eq!(
            list.proxy(a_index).unwrap().leaf_most_child_index(),
            list.find_widget(a1).unwrap()
        );
        assert!(list.index_range(a_index).includes(list.sort_order(list.find_widget(a1).unwrap())));
        assert!(!list.index_range(a_index).includes(list.sort_order(list.find_widget(b).unwrap())));
    }

    #[test]
    fn build_skips_null_widgets_and_nested_roots() {
        let mut arena = WidgetArena::new();
        let root = arena.create_widget();
        let null = arena.create_child(root, Size::ZERO);
        arena.create_child(null, Size::ZERO);
        let nested = arena.create_child(root, Size::ZERO);
        arena.create_child(nested, Size::ZERO);
        arena.set_flags(
            null,
            WidgetFlags {
                null_widget: true,
                ..WidgetFlags::default()
            },
        );
        arena.set_flags(
            nested,
            WidgetFlags {
                invalidation_root: true,
                ..WidgetFlags::default()
            },
        );

        let mut list = WidgetList::default();
        list.build(&arena, root);
        assert_eq!(widgets(&list), [root, nested]);
        let nested_index = list.find_widget(nested).unwrap();
        assert!(list.proxy(nested_index).unwrap().is_invalidation_root());
    }

    #[test]
    fn nested_root_lists_its_own_children() {
        let mut arena = WidgetArena::new();
        let outer = arena.create_widget();
        let nested = arena.create_child(outer, Size::ZERO);
        let child = arena.create_child(nested, Size::ZERO);
        arena.set_flags(
            nested,
            WidgetFlags {
                invalidation_root: true,
                ..WidgetFlags::default()
            },
        );
        let mut list = WidgetList::default();
        list.build(&arena, nested);
        assert_eq!(widgets(&list), [nested, child]);
        assert!(!list.proxy(list.find_widget(nested).unwrap()).unwrap().is_invalidation_root());
    }

    #[test]
    fn build_of_dead_root_is_empty() {
        let mut arena = WidgetArena::new();
        let root = arena.create_widget();
        arena.destroy_widget(root);
        let mut list = WidgetList::default();
        list.build(&arena, root);
        assert!(list.is_empty());
        assert_eq!(list.first_index(), None);
    }

    #[test]
    fn build_caches_visibility_and_volatility() {
        let mut arena = WidgetArena::new();
        let root = arena.create_widget();
        let hidden = arena.create_child(root, Size::ZERO);
        let under_hidden = arena.create_child(hidden, Size::ZERO);
        let volatile = arena.create_child(root, Size::ZERO);
        let under_volatile = arena.create_child(volatile, Size::ZERO);
        arena.set_visibility(hidden, Visibility::Hidden);
        arena.set_volatile(volatile, true);
        arena.set_volatile(under_volatile, true);

        let mut list = WidgetList::default();
        list.build(&arena, root);
        let proxy = |w| list.proxy(list.find_widget(w).unwrap()).unwrap();
        assert!(!proxy(under_hidden).visibility().are_ancestors_visible());
        assert!(proxy(volatile).update_flags().contains(UpdateFlags::NEEDS_VOLATILE_PAINT));
        assert!(
            !proxy(under_volatile).update_flags().contains(UpdateFlags::NEEDS_VOLATILE_PAINT),
            "an indirectly volatile widget is painted by its ancestor"
        );
        let volatile_widgets: Vec<_> = list.volatile_widgets().collect();
        assert_eq!(volatile_widgets, [list.find_widget(volatile).unwrap()]);
    }

    #[test]
    fn segments_fill_to_capacity() {
        let mut arena = WidgetArena::new();
        let root = arena.create_widget();
        for _ in 0..9 {
            arena.create_child(root, Size::ZERO);
        }
        let config = WidgetListConfig::new().with_elements_per_segment(4);
        let mut list = WidgetList::new(config);
        list.build(&arena, root);
        assert_eq!(list.segment_count(), 3);
        assert_eq!(list.len(), 10);
        let orders: Vec<u32> = list.segments_in_order().map(|(_, s)| s.sort_order).collect();
        assert_eq!(orders, [1000, 2000, 3000]);
        list.verify_widgets_index().unwrap();
    }

    #[test]
    fn exhausted_order_space_renumbers_everything() {
        let mut arena = WidgetArena::new();
        let root = arena.create_widget();
        for _ in 0..40 {
            arena.create_child(root, Size::ZERO);
        }
        // One slot bit leaves 31 bits of order, so this padding overflows
        // on the third segment.
        let config = WidgetListConfig::new()
            .with_elements_per_segment(2)
            .with_sort_order_padding(u32::MAX >> 2);
        let mut list = WidgetList::new(config);
        list.build(&arena, root);
        assert_eq!(list.segment_count(), 21);
        list.verify_widgets_index().unwrap();
        assert_eq!(widgets(&list), arena.subtree(root));
    }
}
