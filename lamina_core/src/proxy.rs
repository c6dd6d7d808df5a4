// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-widget scheduling state.

use bitflags::bitflags;

use crate::arena::WidgetId;
use crate::heap::PostUpdateHeap;
use crate::host::{PaintArgs, WidgetHost};
use crate::list::{WidgetIndex, WidgetList};
use crate::paint::ElementSink;
use crate::reason::{InvalidateReason, UpdateFlags};
use crate::visibility::WidgetVisibility;

bitflags! {
    /// Heaps a proxy is currently queued in.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct HeapMembership: u8 {
        /// Queued in the pre-update heap.
        const PRE_UPDATE = 1 << 0;
        /// Queued in the prepass heap.
        const PREPASS = 1 << 1;
        /// Queued in the post-update heap.
        const POST_UPDATE = 1 << 2;
    }
}

/// One widget's entry in a [`WidgetList`].
///
/// Together, [`index`](Self::index) and
/// [`leaf_most_child_index`](Self::leaf_most_child_index) bound the
/// widget's whole subtree in the list, which is what lets the scheduler ask
/// "is X inside Y" with two integer comparisons.
#[derive(Clone, Debug)]
pub struct WidgetProxy {
    pub(crate) widget: Option<WidgetId>,
    pub(crate) index: WidgetIndex,
    pub(crate) parent_index: WidgetIndex,
    pub(crate) leaf_most_child_index: WidgetIndex,
    pub(crate) update_flags: UpdateFlags,
    pub(crate) current_reason: InvalidateReason,
    pub(crate) visibility: WidgetVisibility,
    pub(crate) heaps: HeapMembership,
    pub(crate) is_invalidation_root: bool,
    pub(crate) in_update_list: bool,
}

impl WidgetProxy {
    pub(crate) fn new(widget: WidgetId, index: WidgetIndex, parent_index: WidgetIndex) -> Self {
        Self {
            widget: Some(widget),
            index,
            parent_index,
            leaf_most_child_index: index,
            update_flags: UpdateFlags::empty(),
            current_reason: InvalidateReason::empty(),
            visibility: WidgetVisibility::default(),
            heaps: HeapMembership::empty(),
            is_invalidation_root: false,
            in_update_list: false,
        }
    }

    /// A placeholder for a slot nothing lives in.
    pub(crate) fn inert() -> Self {
        Self {
            widget: None,
            index: WidgetIndex::INVALID,
            parent_index: WidgetIndex::INVALID,
            leaf_most_child_index: WidgetIndex::INVALID,
            update_flags: UpdateFlags::empty(),
            current_reason: InvalidateReason::empty(),
            visibility: WidgetVisibility::default(),
            heaps: HeapMembership::empty(),
            is_invalidation_root: false,
            in_update_list: false,
        }
    }

    /// The widget, or `None` once it has been destroyed.
    #[must_use]
    pub fn widget(&self) -> Option<WidgetId> {
        self.widget
    }

    /// This proxy's own index.
    #[must_use]
    pub fn index(&self) -> WidgetIndex {
        self.index
    }

    /// The parent's index, or [`WidgetIndex::INVALID`] for the list root.
    #[must_use]
    pub fn parent_index(&self) -> WidgetIndex {
        self.parent_index
    }

    /// The index of the last proxy in this widget's subtree; equal to
    /// [`index`](Self::index) for leaves.
    #[must_use]
    pub fn leaf_most_child_index(&self) -> WidgetIndex {
        self.leaf_most_child_index
    }

    /// Work the widget wants done this frame.
    #[must_use]
    pub fn update_flags(&self) -> UpdateFlags {
        self.update_flags
    }

    /// Invalidation reasons not yet processed.
    #[must_use]
    pub fn current_reason(&self) -> InvalidateReason {
        self.current_reason
    }

    /// Cached visibility, resolved against all ancestors.
    #[must_use]
    pub fn visibility(&self) -> WidgetVisibility {
        self.visibility
    }

    /// Heaps this proxy is queued in.
    #[must_use]
    pub fn heaps(&self) -> HeapMembership {
        self.heaps
    }

    /// Whether the widget owns a nested invalidation root.
    #[must_use]
    pub fn is_invalidation_root(&self) -> bool {
        self.is_invalidation_root
    }

    /// Whether the proxy is in the current frame's final update list.
    #[must_use]
    pub fn in_update_list(&self) -> bool {
        self.in_update_list
    }

    /// Runs this frame's work for the widget.
    ///
    /// Repaints when a paint flag is set, and returns the highest layer id
    /// painted. Otherwise runs active timers and tick, unless an ancestor
    /// hides the widget, and returns `None`.
    pub fn update<H: WidgetHost>(
        &mut self,
        host: &mut H,
        args: &PaintArgs,
        sink: &mut ElementSink<'_>,
    ) -> Option<i32> {
        let widget = self.widget.filter(|&w| host.is_alive(w))?;
        if self.update_flags.intersects(UpdateFlags::PAINT) {
            let layer = host.paint(widget, args, sink);
            self.update_flags.remove(UpdateFlags::NEEDS_REPAINT);
            return Some(layer);
        }
        self.run_periodic(host, widget, args);
        None
    }

    /// Runs active timers and tick, unless an ancestor hides the widget.
    pub(crate) fn run_periodic<H: WidgetHost>(
        &self,
        host: &mut H,
        widget: WidgetId,
        args: &PaintArgs,
    ) {
        if !self.visibility.are_ancestors_visible() {
            return;
        }
        if self
            .update_flags
            .contains(UpdateFlags::NEEDS_ACTIVE_TIMER_UPDATE)
        {
            host.execute_active_timers(widget, args);
        }
        if self.update_flags.contains(UpdateFlags::NEEDS_TICK) {
            host.tick(widget, args);
        }
    }
}

/// What resolving a proxy's invalidation reasons asks of the caller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Processed {
    /// The widget now needs a repaint.
    pub(crate) repaint: bool,
    /// The list root's size changed; the whole root must be invalidated.
    pub(crate) invalidate_root: bool,
}

/// Resolves the post-update reasons of the proxy at `index`.
///
/// Layout changes that alter the widget's desired size are pushed up to the
/// parent, which is queued in `post` and will be processed after this
/// widget because the heap pops leaf-first.
pub(crate) fn process_invalidation<H: WidgetHost>(
    list: &mut WidgetList,
    index: WidgetIndex,
    host: &mut H,
    post: &mut PostUpdateHeap,
    scale: f32,
) -> Processed {
    let mut processed = Processed::default();
    let Some(proxy) = list.proxy(index) else {
        return processed;
    };
    let reason = proxy.current_reason;
    let parent = proxy.parent_index;
    let visibility = proxy.visibility;
    let Some(widget) = proxy.widget.filter(|&w| host.is_alive(w)) else {
        if let Some(proxy) = list.proxy_mut(index) {
            proxy.current_reason = InvalidateReason::empty();
        }
        return processed;
    };

    let mut parent_needs_layout = false;
    if !host.has_layout_scale(widget) && visibility.is_visible() {
        // Never laid out: the parent has to place it first.
        parent_needs_layout = true;
        if let Some(parent_widget) = list.proxy(parent).and_then(|p| p.widget) {
            host.mark_prepass_dirty(parent_widget);
        }
    } else if reason.intersects(InvalidateReason::LAYOUT_AFFECTING) {
        let old_size = host.desired_size(widget);
        if host.needs_prepass(widget) {
            host.prepass(widget, scale);
        } else {
            host.cache_desired_size(widget, scale);
        }
        let changed = old_size != host.desired_size(widget)
            || reason.intersects(InvalidateReason::VISIBILITY | InvalidateReason::RENDER_TRANSFORM);
        parent_needs_layout = changed;
        processed.repaint = true;
    } else if reason.contains(InvalidateReason::PAINT) && !host.is_volatile_indirectly(widget) {
        processed.repaint = true;
    }

    if reason.contains(InvalidateReason::VOLATILITY) {
        refresh_volatility(list, index, host);
        processed.repaint = true;
    }

    if parent_needs_layout {
        if parent.is_valid() {
            if let Some(parent_proxy) = list.proxy_mut(parent) {
                parent_proxy.current_reason |= InvalidateReason::LAYOUT;
            }
            post.push_unique(list, parent);
        } else {
            processed.invalidate_root = true;
        }
    }

    if let Some(proxy) = list.proxy_mut(index) {
        proxy.current_reason = InvalidateReason::empty();
        if processed.repaint {
            proxy.update_flags.insert(UpdateFlags::NEEDS_REPAINT);
        }
    }
    processed
}

/// Recomputes volatile membership for the subtree at `index`.
///
/// Only widgets without a volatile ancestor are indexed as volatile, so a
/// change at `index` can move any descendant in or out of the index.
fn refresh_volatility<H: WidgetHost>(list: &mut WidgetList, index: WidgetIndex, host: &H) {
    let Some(leaf) = list.proxy(index).map(|proxy| proxy.leaf_most_child_index) else {
        return;
    };
    let mut cursor = Some(index);
    while let Some(current) = cursor {
        let volatile = list
            .proxy(current)
            .and_then(|proxy| proxy.widget)
            .filter(|&w| host.is_alive(w))
            .is_some_and(|w| host.is_volatile(w) && !host.is_volatile_indirectly(w));
        list.set_volatile(current, volatile);
        if current == leaf {
            break;
        }
        cursor = list.next_index(current);
    }
}

/// Requeues a proxy after its update ran, if it wants work every frame.
pub(crate) fn mark_proxy_updated_this_frame(
    list: &mut WidgetList,
    index: WidgetIndex,
    post: &mut PostUpdateHeap,
) {
    let Some(proxy) = list.proxy_mut(index) else {
        return;
    };
    if proxy.widget.is_some() && proxy.update_flags.intersects(UpdateFlags::PERSISTENT) {
        post.push_unique(list, index);
    } else {
        proxy.in_update_list = false;
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use kurbo::Size;

    use super::*;
    use crate::arena::WidgetArena;
    use crate::paint::CachedElements;
    use crate::visibility::Visibility;

    struct Fixture {
        arena: WidgetArena,
        list: WidgetList,
        root: WidgetId,
        leaf: WidgetId,
        sibling: WidgetId,
    }

    fn fixture() -> Fixture {
        let mut arena = WidgetArena::new();
        let root = arena.create_widget();
        let leaf = arena.create_child(root, Size::new(10.0, 10.0));
        let sibling = arena.create_child(root, Size::new(10.0, 10.0));
        arena.prepass_subtree(root, 1.0);
        let mut list = WidgetList::default();
        list.build(&arena, root);
        Fixture {
            arena,
            list,
            root,
            leaf,
            sibling,
        }
    }

    fn set_reason(list: &mut WidgetList, index: WidgetIndex, reason: InvalidateReason) {
        list.proxy_mut(index).unwrap().current_reason = reason;
    }

    #[test]
    fn unchanged_layout_repaints_without_queueing_parent() {
        let mut f = fixture();
        let leaf = f.list.find_widget(f.leaf).unwrap();
        let root = f.list.find_widget(f.root).unwrap();
        set_reason(&mut f.list, leaf, InvalidateReason::LAYOUT);
        let mut post = PostUpdateHeap::new();
        let processed = process_invalidation(&mut f.list, leaf, &mut f.arena, &mut post, 1.0);
        assert!(processed.repaint);
        assert!(!processed.invalidate_root);
        assert!(post.is_empty(), "parent must not be queued");
        let proxy = f.list.proxy(leaf).unwrap();
        assert!(proxy.update_flags().contains(UpdateFlags::NEEDS_REPAINT));
        assert!(proxy.current_reason().is_empty());
        assert!(f.list.proxy(root).unwrap().current_reason().is_empty());
    }

    #[test]
    fn changed_layout_queues_parent_with_layout() {
        let mut f = fixture();
        f.arena.set_content_size(f.leaf, Size::new(20.0, 30.0));
        let leaf = f.list.find_widget(f.leaf).unwrap();
        let root = f.list.find_widget(f.root).unwrap();
        set_reason(&mut f.list, leaf, InvalidateReason::LAYOUT);
        let mut post = PostUpdateHeap::new();
        let _ = process_invalidation(&mut f.list, leaf, &mut f.arena, &mut post, 1.0);
        assert!(post.contains_scan(root));
        assert_eq!(
            f.list.proxy(root).unwrap().current_reason(),
            InvalidateReason::LAYOUT
        );
    }

    #[test]
    fn root_size_change_invalidates_root() {
        let mut f = fixture();
        f.arena.set_content_size(f.leaf, Size::new(20.0, 30.0));
        f.arena.prepass_subtree(f.leaf, 1.0);
        let root = f.list.find_widget(f.root).unwrap();
        set_reason(&mut f.list, root, InvalidateReason::LAYOUT);
        let mut post = PostUpdateHeap::new();
        let processed = process_invalidation(&mut f.list, root, &mut f.arena, &mut post, 1.0);
        assert!(processed.invalidate_root);
    }

    #[test]
    fn visibility_change_always_reaches_parent() {
        let mut f = fixture();
        let sibling = f.list.find_widget(f.sibling).unwrap();
        let root = f.list.find_widget(f.root).unwrap();
        set_reason(&mut f.list, sibling, InvalidateReason::VISIBILITY);
        let mut post = PostUpdateHeap::new();
        let _ = process_invalidation(&mut f.list, sibling, &mut f.arena, &mut post, 1.0);
        assert!(post.contains_scan(root));
    }

    #[test]
    fn paint_under_volatile_ancestor_is_skipped() {
        let mut f = fixture();
        f.arena.set_volatile(f.root, true);
        let leaf = f.list.find_widget(f.leaf).unwrap();
        set_reason(&mut f.list, leaf, InvalidateReason::PAINT);
        let mut post = PostUpdateHeap::new();
        let processed = process_invalidation(&mut f.list, leaf, &mut f.arena, &mut post, 1.0);
        assert!(!processed.repaint, "the volatile ancestor repaints it anyway");
    }

    #[test]
    fn volatility_change_reindexes_the_subtree() {
        let mut f = fixture();
        f.arena.set_volatile(f.root, true);
        f.arena.set_volatile(f.leaf, true);
        f.list.build(&f.arena, f.root);
        let root = f.list.find_widget(f.root).unwrap();
        let leaf = f.list.find_widget(f.leaf).unwrap();
        assert_eq!(f.list.volatile_widgets().collect::<Vec<_>>(), [root]);

        f.arena.set_volatile(f.root, false);
        set_reason(&mut f.list, root, InvalidateReason::VOLATILITY);
        let mut post = PostUpdateHeap::new();
        let processed = process_invalidation(&mut f.list, root, &mut f.arena, &mut post, 1.0);
        assert!(processed.repaint);
        assert_eq!(
            f.list.volatile_widgets().collect::<Vec<_>>(),
            [leaf],
            "the leaf is directly volatile again"
        );
        assert!(
            f.list
                .proxy(leaf)
                .unwrap()
                .update_flags()
                .contains(UpdateFlags::NEEDS_VOLATILE_PAINT)
        );

        f.arena.set_volatile(f.root, true);
        set_reason(&mut f.list, root, InvalidateReason::VOLATILITY);
        let _ = process_invalidation(&mut f.list, root, &mut f.arena, &mut post, 1.0);
        assert_eq!(f.list.volatile_widgets().collect::<Vec<_>>(), [root]);
        assert!(f.list.proxy(leaf).unwrap().update_flags().is_empty());
    }

    #[test]
    fn unlaid_out_widget_queues_parent() {
        let mut f = fixture();
        let late = f.arena.create_child(f.root, Size::new(5.0, 5.0));
        f.list.build(&f.arena, f.root);
        let late_index = f.list.find_widget(late).unwrap();
        let root = f.list.find_widget(f.root).unwrap();
        set_reason(&mut f.list, late_index, InvalidateReason::PAINT);
        let mut post = PostUpdateHeap::new();
        let _ = process_invalidation(&mut f.list, late_index, &mut f.arena, &mut post, 1.0);
        assert!(post.contains_scan(root));
        assert!(f.arena.needs_prepass(f.root));
    }

    #[test]
    fn update_repaints_then_ticks() {
        let mut f = fixture();
        let leaf = f.list.find_widget(f.leaf).unwrap();
        let mut cache = CachedElements::new();
        let args = PaintArgs::default();
        let proxy = f.list.proxy_mut(leaf).unwrap();
        proxy.update_flags = UpdateFlags::NEEDS_REPAINT | UpdateFlags::NEEDS_TICK;
        assert_eq!(proxy.update(&mut f.arena, &args, &mut cache.sink()), Some(1));
        assert_eq!(proxy.update_flags(), UpdateFlags::NEEDS_TICK);
        assert_eq!(proxy.update(&mut f.arena, &args, &mut cache.sink()), None);
        assert_eq!(f.arena.take_tick_log(), [f.leaf]);
    }

    #[test]
    fn update_skips_tick_under_hidden_ancestor() {
        let mut f = fixture();
        f.arena.set_visibility(f.root, Visibility::Hidden);
        f.list.build(&f.arena, f.root);
        let leaf = f.list.find_widget(f.leaf).unwrap();
        let mut cache = CachedElements::new();
        let proxy = f.list.proxy_mut(leaf).unwrap();
        proxy.update_flags = UpdateFlags::NEEDS_TICK;
        let _ = proxy.update(&mut f.arena, &PaintArgs::default(), &mut cache.sink());
        assert!(f.arena.take_tick_log().is_empty());
    }

    #[test]
    fn persistent_flags_requeue_after_update() {
        let mut f = fixture();
        let leaf = f.list.find_widget(f.leaf).unwrap();
        let sibling = f.list.find_widget(f.sibling).unwrap();
        f.list.proxy_mut(leaf).unwrap().update_flags = UpdateFlags::NEEDS_TICK;
        f.list.proxy_mut(sibling).unwrap().in_update_list = true;
        let mut post = PostUpdateHeap::new();
        mark_proxy_updated_this_frame(&mut f.list, leaf, &mut post);
        mark_proxy_updated_this_frame(&mut f.list, sibling, &mut post);
        assert!(post.contains_scan(leaf));
        assert!(!post.contains_scan(sibling));
        assert!(!f.list.proxy(sibling).unwrap().in_update_list());
    }
}
