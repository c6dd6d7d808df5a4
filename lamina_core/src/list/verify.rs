// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Debug-time consistency checks.

use alloc::vec::Vec;

use crate::arena::WidgetId;
use crate::error::VerifyError;
use crate::host::WidgetHost;
use crate::visibility::WidgetVisibility;

use super::{Segment, WidgetIndex, WidgetList};

/// One listed widget as seen from outside the list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Entry {
    widget: WidgetId,
    parent: Option<WidgetId>,
    visibility: WidgetVisibility,
    volatile: bool,
}

impl WidgetList {
    /// Checks the structural invariants of the list.
    ///
    /// Every proxy must record its own index, lie inside its parent's
    /// range and have a leaf-most child at or after itself. Segment order
    /// numbers must increase along the links, slot lists must be sorted and
    /// the widget map must agree with the proxies.
    ///
    /// # Errors
    ///
    /// Returns the first broken invariant found.
    pub fn verify_widgets_index(&self) -> Result<(), VerifyError> {
        let mut previous: Option<u32> = None;
        let mut listed = 0;
        let first = self.first_index();
        for (id, segment) in self.segments_in_order() {
            if let Some(previous) = previous
                && segment.sort_order <= previous
            {
                return Err(VerifyError::SortOrderNotIncreasing {
                    segment: id,
                    order: segment.sort_order,
                    previous,
                });
            }
            previous = Some(segment.sort_order);
            verify_slots(id, segment, &segment.attribute_slots, "attribute")?;
            verify_slots(id, segment, &segment.volatile_slots, "volatile")?;

            for slot in segment.start..segment.end() {
                let index = WidgetIndex::new(id, slot);
                let proxy = &segment.proxies[usize::from(slot)];
                if proxy.index != index {
                    return Err(VerifyError::IndexMismatch {
                        found: index,
                        recorded: proxy.index,
                    });
                }
                if let Some(widget) = proxy.widget {
                    listed += 1;
                    if self.widget_map().get(&widget) != Some(&index) {
                        return Err(VerifyError::WidgetMapMismatch { widget });
                    }
                }
                let order = self.sort_order(index);
                let leaf = proxy.leaf_most_child_index;
                if self
                    .sort_order_checked(leaf)
                    .is_none_or(|leaf_order| leaf_order < order)
                {
                    return Err(VerifyError::LeafBeforeIndex { index, leaf });
                }
                let parent = proxy.parent_index;
                let inside = if parent.is_valid() {
                    self.sort_order_checked(parent).is_some_and(|parent_order| {
                        parent_order < order && self.index_range(parent).includes(order)
                    })
                } else {
                    Some(index) == first
                };
                if !inside {
                    return Err(VerifyError::ParentOutOfRange { index, parent });
                }
            }
        }
        if self.widget_map().len() != listed {
            return Err(VerifyError::WidgetMapSize {
                mapped: self.widget_map().len(),
                listed,
            });
        }
        Ok(())
    }

    /// Checks that the list matches a fresh traversal of `host`.
    ///
    /// Compares traversal order, parents, cached visibility and volatile
    /// membership of every listed widget against what a rebuild would
    /// produce.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::TraversalMismatch`] at the first divergence.
    pub fn verify_against_host<H: WidgetHost>(&self, host: &H) -> Result<(), VerifyError> {
        let mut expected = Vec::new();
        if let Some(root) = self.root()
            && host.is_alive(root)
            && !host.is_null_widget(root)
        {
            self.collect_expected(host, root, None, &mut expected);
        }
        let actual = self.entries();
        let position = expected
            .iter()
            .zip(&actual)
            .position(|(expected, actual)| expected != actual);
        match position {
            Some(position) => Err(VerifyError::TraversalMismatch { position }),
            None if expected.len() != actual.len() => Err(VerifyError::TraversalMismatch {
                position: expected.len().min(actual.len()),
            }),
            None => Ok(()),
        }
    }

    /// Returns `true` if both lists hold the same widgets in the same order,
    /// with the same parents, subtree extents, visibility and volatile and
    /// attribute membership.
    ///
    /// Indices and sort orders are not compared: an incrementally
    /// maintained list and a fresh build of the same tree compare equal.
    #[must_use]
    pub fn deep_compare(&self, other: &Self) -> bool {
        if self.root() != other.root() || self.len() != other.len() {
            return false;
        }
        let mut ours = self.iter().filter(|proxy| proxy.widget.is_some());
        let mut theirs = other.iter().filter(|proxy| proxy.widget.is_some());
        loop {
            match (ours.next(), theirs.next()) {
                (None, None) => break,
                (Some(a), Some(b)) => {
                    let same = a.widget == b.widget
                        && self.widget_at(a.parent_index) == other.widget_at(b.parent_index)
                        && self.widget_at(a.leaf_most_child_index)
                            == other.widget_at(b.leaf_most_child_index)
                        && a.visibility == b.visibility
                        && a.is_invalidation_root == b.is_invalidation_root;
                    if !same {
                        return false;
                    }
                }
                _ => return false,
            }
        }
        let widgets = |list: &Self, indices: &mut dyn Iterator<Item = WidgetIndex>| {
            indices
                .filter_map(|index| list.widget_at(index))
                .collect::<Vec<_>>()
        };
        widgets(self, &mut self.volatile_widgets()) == widgets(other, &mut other.volatile_widgets())
            && widgets(self, &mut self.attribute_widgets())
                == widgets(other, &mut other.attribute_widgets())
    }

    fn widget_at(&self, index: WidgetIndex) -> Option<WidgetId> {
        self.proxy(index)?.widget
    }

    fn is_indexed_volatile(&self, index: WidgetIndex) -> bool {
        self.segment(index.segment)
            .is_some_and(|segment| segment.volatile_slots.binary_search(&index.slot).is_ok())
    }

    fn entries(&self) -> Vec<Entry> {
        self.iter()
            .filter_map(|proxy| {
                Some(Entry {
                    widget: proxy.widget?,
                    parent: self.widget_at(proxy.parent_index),
                    visibility: proxy.visibility,
                    volatile: self.is_indexed_volatile(proxy.index),
                })
            })
            .collect()
    }

    fn collect_expected<H: WidgetHost>(
        &self,
        host: &H,
        widget: WidgetId,
        parent: Option<(WidgetId, WidgetVisibility)>,
        out: &mut Vec<Entry>,
    ) {
        let own = host.visibility(widget);
        let visibility = match parent {
            Some((_, parent)) => WidgetVisibility::new(parent, own),
            None => WidgetVisibility::root(own),
        };
        out.push(Entry {
            widget,
            parent: parent.map(|(parent, _)| parent),
            visibility,
            volatile: host.is_volatile(widget) && !host.is_volatile_indirectly(widget),
        });
        if !self.visits_children(host, widget) {
            return;
        }
        for child in host.children(widget) {
            if !host.is_null_widget(child) {
                self.collect_expected(host, child, Some((widget, visibility)), out);
            }
        }
    }
}

fn verify_slots(
    id: u16,
    segment: &Segment,
    slots: &[u16],
    list: &'static str,
) -> Result<(), VerifyError> {
    let sorted = slots.windows(2).all(|pair| pair[0] < pair[1]);
    let live = slots.iter().all(|&slot| {
        slot >= segment.start
            && segment
                .proxies
                .get(usize::from(slot))
                .is_some_and(|proxy| proxy.widget.is_some())
    });
    if sorted && live {
        Ok(())
    } else {
        Err(VerifyError::ElementIndexList { segment: id, list })
    }
}

#[cfg(test)]
mod tests {
    use kurbo::Size;

    use super::*;
    use crate::arena::WidgetArena;
    use crate::list::WidgetListConfig;
    use crate::visibility::Visibility;

    #[test]
    fn fresh_build_verifies() {
        let mut arena = WidgetArena::new();
        let root = arena.create_widget();
        let a = arena.create_child(root, Size::ZERO);
        arena.create_child(a, Size::ZERO);
        arena.create_child(root, Size::ZERO);
        let mut list = WidgetList::default();
        list.build(&arena, root);
        assert_eq!(list.verify_widgets_index(), Ok(()));
        assert_eq!(list.verify_against_host(&arena), Ok(()));
    }

    #[test]
    fn stale_visibility_is_a_traversal_mismatch() {
        let mut arena = WidgetArena::new();
        let root = arena.create_widget();
        let a = arena.create_child(root, Size::ZERO);
        let mut list = WidgetList::default();
        list.build(&arena, root);
        arena.set_visibility(a, Visibility::Hidden);
        assert_eq!(
            list.verify_against_host(&arena),
            Err(VerifyError::TraversalMismatch { position: 1 })
        );
    }

    #[test]
    fn stale_volatility_is_a_traversal_mismatch() {
        let mut arena = WidgetArena::new();
        let root = arena.create_widget();
        let a = arena.create_child(root, Size::ZERO);
        let a1 = arena.create_child(a, Size::ZERO);
        arena.set_volatile(a, true);
        arena.set_volatile(a1, true);
        let mut list = WidgetList::default();
        list.build(&arena, root);
        assert_eq!(list.verify_against_host(&arena), Ok(()));

        arena.set_volatile(a, false);
        assert_eq!(
            list.verify_against_host(&arena),
            Err(VerifyError::TraversalMismatch { position: 1 }),
            "a lost its volatility"
        );
        let a1_index = list.find_widget(a1).unwrap();
        list.set_volatile(list.find_widget(a).unwrap(), false);
        assert_eq!(
            list.verify_against_host(&arena),
            Err(VerifyError::TraversalMismatch { position: 2 }),
            "a1 is directly volatile now"
        );
        list.set_volatile(a1_index, true);
        assert_eq!(list.verify_against_host(&arena), Ok(()));
    }

    #[test]
    fn missing_child_is_a_traversal_mismatch() {
        let mut arena = WidgetArena::new();
        let root = arena.create_widget();
        arena.create_child(root, Size::ZERO);
        let mut list = WidgetList::default();
        list.build(&arena, root);
        arena.create_child(root, Size::ZERO);
        assert_eq!(
            list.verify_against_host(&arena),
            Err(VerifyError::TraversalMismatch { position: 2 })
        );
    }

    #[test]
    fn corrupted_index_is_reported() {
        let mut arena = WidgetArena::new();
        let root = arena.create_widget();
        let a = arena.create_child(root, Size::ZERO);
        let mut list = WidgetList::default();
        list.build(&arena, root);
        let index = list.find_widget(a).unwrap();
        list.proxy_mut(index).unwrap().index = WidgetIndex::new(0, 9);
        assert_eq!(
            list.verify_widgets_index(),
            Err(VerifyError::IndexMismatch {
                found: index,
                recorded: WidgetIndex::new(0, 9),
            })
        );
    }

    #[test]
    fn deep_compare_ignores_indices() {
        let mut arena = WidgetArena::new();
        let root = arena.create_widget();
        for _ in 0..10 {
            arena.create_child(root, Size::ZERO);
        }
        let mut small = WidgetList::new(WidgetListConfig::new().with_elements_per_segment(3));
        let mut large = WidgetList::default();
        small.build(&arena, root);
        large.build(&arena, root);
        assert!(small.deep_compare(&large));

        arena.create_child(root, Size::ZERO);
        large.build(&arena, root);
        assert!(!small.deep_compare(&large));
    }
}
