// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Walking widgets with bound attributes in tree order.

use crate::arena::WidgetId;
use crate::host::WidgetHost;

use super::{
    ChildOrderObserver, IndexRange, Relocation, SortOrder, WidgetIndex, WidgetList, set_sorted,
};

/// A position among the widgets that have bound attributes.
///
/// Advances through the per-segment attribute slot lists in tree order, and
/// observes restructures so it can be advanced while the list changes
/// underneath it.
#[derive(Clone, Debug, Default)]
pub struct AttributeCursor {
    current: Option<WidgetIndex>,
    reseek: bool,
}

impl AttributeCursor {
    /// Positions a cursor on the first widget with bound attributes.
    #[must_use]
    pub fn new(list: &WidgetList) -> Self {
        Self {
            current: list.attribute_widgets().next(),
            reseek: false,
        }
    }

    /// The widget the cursor points at, or `None` once exhausted.
    #[must_use]
    pub fn current(&self) -> Option<WidgetIndex> {
        self.current
    }

    /// Sort order of [`current`](Self::current).
    #[must_use]
    pub fn current_sort_order(&self, list: &WidgetList) -> Option<SortOrder> {
        list.sort_order_checked(self.current?)
    }

    /// Moves to the next widget with bound attributes.
    pub fn advance(&mut self, list: &WidgetList) {
        self.current = self
            .current
            .and_then(|current| list.next_attribute_after(current));
    }

    /// Moves past the current widget's subtree.
    pub fn advance_to_next_sibling(&mut self, list: &WidgetList) {
        self.current = self
            .current
            .and_then(|current| list.proxy(current))
            .and_then(|proxy| list.next_attribute_after(proxy.leaf_most_child_index));
    }

    /// Moves past the subtree of the current widget's parent.
    pub fn advance_to_next_parent(&mut self, list: &WidgetList) {
        self.current = self
            .current
            .and_then(|current| list.proxy(current))
            .and_then(|proxy| list.proxy(proxy.parent_index))
            .and_then(|parent| list.next_attribute_after(parent.leaf_most_child_index));
    }
}

impl ChildOrderObserver for AttributeCursor {
    fn pre_child_remove(&mut self, list: &WidgetList, _parent: WidgetIndex, removed: IndexRange) {
        if self
            .current_sort_order(list)
            .is_some_and(|order| removed.includes(order))
        {
            self.current = None;
            self.reseek = true;
        }
    }

    fn proxies_reindexed(&mut self, _list: &WidgetList, moved: &[Relocation]) {
        if let Some(current) = self.current
            && let Some(relocation) = moved.iter().find(|r| r.old == current)
        {
            self.current = Some(relocation.new);
        }
    }

    fn proxies_built(&mut self, list: &WidgetList, parent: WidgetIndex, built: Option<IndexRange>) {
        let Some(parent_order) = list.sort_order_checked(parent) else {
            return;
        };
        let behind = self
            .current_sort_order(list)
            .is_none_or(|order| order > parent_order);
        if !self.reseek && !behind {
            return;
        }
        let candidate = list.next_attribute_after(parent);
        let fresh = candidate
            .and_then(|index| list.sort_order_checked(index))
            .zip(built)
            .is_some_and(|(order, built)| built.includes(order));
        if self.reseek || fresh {
            self.current = candidate;
        }
        self.reseek = false;
    }
}

impl WidgetList {
    /// Returns the first widget with bound attributes after `index` in
    /// traversal order.
    #[must_use]
    pub fn next_attribute_after(&self, index: WidgetIndex) -> Option<WidgetIndex> {
        let segment = self.segment(index.segment)?;
        let at = segment
            .attribute_slots
            .partition_point(|&slot| slot <= index.slot);
        if let Some(&slot) = segment.attribute_slots.get(at) {
            return Some(WidgetIndex::new(index.segment, slot));
        }
        let mut seg = segment.next;
        while let Some(segment) = self.segment(seg) {
            if let Some(&slot) = segment.attribute_slots.first() {
                return Some(WidgetIndex::new(seg, slot));
            }
            seg = segment.next;
        }
        None
    }

    /// Re-reads whether the widget has bound attributes and updates the
    /// attribute index.
    ///
    /// Returns the widget's current state, or `None` if it is not listed.
    pub fn process_attribute_registration_invalidation<H: WidgetHost>(
        &mut self,
        host: &H,
        widget: WidgetId,
    ) -> Option<bool> {
        let index = self.find_widget(widget)?;
        let registered = host.has_registered_attributes(widget);
        let segment = self.segment_mut(index.segment)?;
        set_sorted(&mut segment.attribute_slots, index.slot, registered);
        Some(registered)
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use kurbo::Size;

    use super::*;
    use crate::arena::WidgetArena;
    use crate::list::WidgetListConfig;

    struct Fixture {
        arena: WidgetArena,
        list: WidgetList,
        root: WidgetId,
        a: WidgetId,
        a1: WidgetId,
        a2: WidgetId,
        b: WidgetId,
    }

    /// `root → [a → [a1, a2], b]` with attributes on a, a1, a2 and b.
    fn fixture() -> Fixture {
        let mut arena = WidgetArena::new();
        let root = arena.create_widget();
        let a = arena.create_child(root, Size::ZERO);
        let a1 = arena.create_child(a, Size::ZERO);
        let a2 = arena.create_child(a, Size::ZERO);
        let b = arena.create_child(root, Size::ZERO);
        for w in [a, a1, a2, b] {
            arena.bind_attribute(w);
        }
        let config = WidgetListConfig::new().with_elements_per_segment(2);
        let mut list = WidgetList::new(config);
        list.build(&arena, root);
        Fixture {
            arena,
            list,
            root,
            a,
            a1,
            a2,
            b,
        }
    }

    fn widget(list: &WidgetList, cursor: &AttributeCursor) -> Option<WidgetId> {
        list.proxy(cursor.current()?)?.widget()
    }

    #[test]
    fn advance_walks_in_tree_order_across_segments() {
        let f = fixture();
        let mut cursor = AttributeCursor::new(&f.list);
        let mut seen = Vec::new();
        while let Some(w) = widget(&f.list, &cursor) {
            seen.push(w);
            cursor.advance(&f.list);
        }
        assert_eq!(seen, [f.a, f.a1, f.a2, f.b]);
    }

    #[test]
    fn sibling_and_parent_skips() {
        let f = fixture();
        let mut cursor = AttributeCursor::new(&f.list);
        cursor.advance_to_next_sibling(&f.list);
        assert_eq!(widget(&f.list, &cursor), Some(f.b), "skips a's subtree");

        let mut cursor = AttributeCursor::new(&f.list);
        cursor.advance(&f.list);
        assert_eq!(widget(&f.list, &cursor), Some(f.a1));
        cursor.advance_to_next_parent(&f.list);
        assert_eq!(widget(&f.list, &cursor), Some(f.b), "skips the rest of a");
    }

    #[test]
    fn registration_updates_the_index() {
        let mut f = fixture();
        f.arena.unbind_attribute(f.a1);
        assert_eq!(
            f.list.process_attribute_registration_invalidation(&f.arena, f.a1),
            Some(false)
        );
        f.arena.bind_attribute(f.root);
        assert_eq!(
            f.list.process_attribute_registration_invalidation(&f.arena, f.root),
            Some(true)
        );
        let widgets: Vec<_> = f
            .list
            .attribute_widgets()
            .filter_map(|index| f.list.proxy(index)?.widget())
            .collect();
        assert_eq!(widgets, [f.root, f.a, f.a2, f.b]);
    }

    #[test]
    fn cursor_survives_rebuild_of_its_subtree() {
        let mut f = fixture();
        let mut cursor = AttributeCursor::new(&f.list);
        cursor.advance(&f.list);
        assert_eq!(widget(&f.list, &cursor), Some(f.a1));

        // Replace a's children; the cursor sat on one of them.
        f.arena.remove_from_parent(f.a1);
        f.arena.destroy_widget(f.a1);
        let a3 = f.arena.create_child(f.a, Size::ZERO);
        f.arena.bind_attribute(a3);
        f.list
            .process_child_order_invalidation(&f.arena, f.a, &mut cursor)
            .unwrap();

        assert_eq!(widget(&f.list, &cursor), Some(f.a2), "reseeks after a");
        cursor.advance(&f.list);
        assert_eq!(widget(&f.list, &cursor), Some(a3));
        cursor.advance(&f.list);
        assert_eq!(widget(&f.list, &cursor), Some(f.b));
    }

    #[test]
    fn cursor_ahead_of_rebuild_is_untouched() {
        let mut f = fixture();
        let mut cursor = AttributeCursor::new(&f.list);
        cursor.advance_to_next_sibling(&f.list);
        assert_eq!(widget(&f.list, &cursor), Some(f.b));

        f.arena.create_child(f.a1, Size::ZERO);
        f.list
            .process_child_order_invalidation(&f.arena, f.a1, &mut cursor)
            .unwrap();
        assert_eq!(widget(&f.list, &cursor), Some(f.b), "nothing new to visit");
        f.list.verify_widgets_index().unwrap();
    }

    #[test]
    fn cursor_steps_back_into_new_attribute_widgets() {
        let mut f = fixture();
        let mut cursor = AttributeCursor::new(&f.list);
        cursor.advance_to_next_sibling(&f.list);
        assert_eq!(widget(&f.list, &cursor), Some(f.b));

        let fresh = f.arena.create_child(f.a2, Size::ZERO);
        f.arena.bind_attribute(fresh);
        f.list
            .process_child_order_invalidation(&f.arena, f.a2, &mut cursor)
            .unwrap();
        assert_eq!(widget(&f.list, &cursor), Some(fresh));
        cursor.advance(&f.list);
        assert_eq!(widget(&f.list, &cursor), Some(f.b));
    }
}
