// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The invalidation root: one widget list, three heaps and a frame loop.
//!
//! An [`InvalidationRoot`] owns everything needed to repaint one widget
//! subtree incrementally:
//!
//! - the [`WidgetList`] of proxies for every listed widget,
//! - the pre-update, prepass and post-update heaps,
//! - the final update list chosen each frame,
//! - the [`CachedElements`] painted so far.
//!
//! Widget code reports changes through
//! [`invalidate_widget`](InvalidationRoot::invalidate_widget). Once per
//! frame the host calls
//! [`paint_invalidation_root`](InvalidationRoot::paint_invalidation_root),
//! which either runs the fast path (process queued widgets in tree order,
//! repaint the ones that need it) or, when the fast path cannot be trusted,
//! rebuilds the list and repaints the whole root.
//!
//! Nothing here returns an error to the caller. Stale widgets are ignored
//! and anything that threatens correctness escalates to the slow path.

mod config;
mod frame;
mod handle;
mod observer;
mod stats;

use alloc::vec::Vec;

use hashbrown::HashSet;
use kurbo::Vec2;

use crate::arena::WidgetId;
use crate::error::VerifyError;
use crate::heap::{HeapKind, PostUpdateHeap, PrepassHeap, PreUpdateHeap, WidgetHeap};
use crate::host::WidgetHost;
use crate::list::{WidgetIndex, WidgetList};
use crate::paint::CachedElements;
use crate::reason::{InvalidateReason, UpdateFlags};
use crate::visibility::WidgetVisibility;

pub use config::{InvalidationConfig, InvalidationContext};
pub use handle::{ProxyHandle, RootId};
pub use stats::{FrameStats, PaintPath, SlowPathReason};

/// Outcome of one [`paint_invalidation_root`](InvalidationRoot::paint_invalidation_root) call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InvalidationResult {
    /// Highest layer id of the root's cached output.
    pub max_layer_id: i32,
    /// Whether any widget painted this frame.
    pub repainted_widgets: bool,
}

/// Schedules invalidation and repaint for one widget subtree.
#[derive(Debug)]
pub struct InvalidationRoot {
    id: RootId,
    config: InvalidationConfig,
    list: WidgetList,
    pre_update: PreUpdateHeap,
    prepass: PrepassHeap,
    post_update: PostUpdateHeap,
    final_update_list: Vec<WidgetIndex>,
    cached: CachedElements,
    needs_slow_path: Option<SlowPathReason>,
    pending_screen_shift: bool,
    last_view_offset: Option<Vec2>,
    frame_index: u64,
    last_stats: FrameStats,
}

impl Default for InvalidationRoot {
    fn default() -> Self {
        Self::new(InvalidationConfig::default())
    }
}

impl InvalidationRoot {
    /// Creates a root whose first frame takes the slow path.
    #[must_use]
    pub fn new(config: InvalidationConfig) -> Self {
        Self {
            id: RootId::next(),
            config,
            list: WidgetList::new(config.list),
            pre_update: PreUpdateHeap::new(),
            prepass: PrepassHeap::new(),
            post_update: PostUpdateHeap::new(),
            final_update_list: Vec::new(),
            cached: CachedElements::new(),
            needs_slow_path: Some(SlowPathReason::Requested),
            pending_screen_shift: false,
            last_view_offset: None,
            frame_index: 0,
            last_stats: FrameStats::default(),
        }
    }

    // -- Accessors --

    /// Unique id of this root.
    #[must_use]
    pub fn id(&self) -> RootId {
        self.id
    }

    /// The configuration the root was created with.
    #[must_use]
    pub fn config(&self) -> &InvalidationConfig {
        &self.config
    }

    /// The root's widget list.
    #[must_use]
    pub fn list(&self) -> &WidgetList {
        &self.list
    }

    /// Widgets waiting for structural updates.
    #[must_use]
    pub fn pre_update_heap(&self) -> &PreUpdateHeap {
        &self.pre_update
    }

    /// Widgets waiting for a forced prepass.
    #[must_use]
    pub fn prepass_heap(&self) -> &PrepassHeap {
        &self.prepass
    }

    /// Widgets waiting for layout and paint resolution.
    #[must_use]
    pub fn post_update_heap(&self) -> &PostUpdateHeap {
        &self.post_update
    }

    /// The widgets chosen for update by the last fast-path frame, leaf-most
    /// first.
    #[must_use]
    pub fn final_update_list(&self) -> &[WidgetIndex] {
        &self.final_update_list
    }

    /// Paint output kept between frames.
    #[must_use]
    pub fn cached_elements(&self) -> &CachedElements {
        &self.cached
    }

    /// Number of frames painted so far.
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Counters from the most recent frame.
    #[must_use]
    pub fn last_frame_stats(&self) -> FrameStats {
        self.last_stats
    }

    /// Returns why the next frame will take the slow path, if it will.
    #[must_use]
    pub fn pending_slow_path(&self) -> Option<SlowPathReason> {
        self.needs_slow_path
    }

    /// Returns a handle to `widget`'s proxy that can be kept across frames.
    #[must_use]
    pub fn proxy_handle(&self, widget: WidgetId) -> Option<ProxyHandle> {
        let index = self.list.find_widget(widget)?;
        Some(ProxyHandle::new(self.id, index, self.list.generation()))
    }

    // -- Coarse invalidation --

    /// Forces the next frame through the slow path.
    pub fn invalidate_root(&mut self) {
        self.request_slow_path(SlowPathReason::Requested);
    }

    /// Records that the root widget's children changed.
    pub fn invalidate_root_child_order(&mut self) {
        self.request_slow_path(SlowPathReason::ChildOrder);
    }

    /// Records that the root widget's layout changed.
    pub fn invalidate_root_layout(&mut self) {
        self.request_slow_path(SlowPathReason::Layout);
    }

    /// Records that the root moved on screen.
    ///
    /// The next fast-path frame translates cached geometry by the change in
    /// [`InvalidationContext::view_offset`] instead of repainting. A changed
    /// offset is picked up without this call as well; the call makes the
    /// shift show up in the logs of the frame that applies it.
    pub fn invalidate_screen_position(&mut self) {
        self.pending_screen_shift = true;
    }

    /// Detaches a destroyed widget from its proxy and drops its cached
    /// output.
    ///
    /// The proxy stays in the list, inert, until its parent's children are
    /// rebuilt. Destroying the root widget forces the slow path.
    pub fn on_widget_destroyed(&mut self, widget: WidgetId) {
        if self.list.root() == Some(widget) {
            self.request_slow_path(SlowPathReason::RootChanged);
        }
        self.list.on_widget_destroyed(widget);
        self.cached.remove_widget(widget);
    }

    /// Drops the heaps, the final update list and the cached output, and
    /// with `clear_list` the widget list too. The next frame takes the slow
    /// path.
    pub fn clear_all_fast_path_data(&mut self, clear_list: bool) {
        self.reset_fast_path_data(clear_list);
        self.request_slow_path(SlowPathReason::Requested);
    }

    // -- Per-widget invalidation --

    /// Queues `widget` for the work `reason` implies.
    ///
    /// Also re-reads the widget's tick and timer flags from `host`, so an
    /// empty `reason` is how a widget starts or stops ticking. Widgets that
    /// are not listed, or no longer alive, are ignored.
    pub fn invalidate_widget<H: WidgetHost>(
        &mut self,
        host: &mut H,
        widget: WidgetId,
        reason: InvalidateReason,
    ) {
        debug_assert!(
            !self.list.is_processing_child_order(),
            "widgets must not be invalidated while child order is processed"
        );
        if self.needs_slow_path.is_some() {
            return;
        }
        let Some(index) = self.list.find_widget(widget) else {
            tracing::trace!(?widget, ?reason, "ignoring invalidation of an unlisted widget");
            return;
        };
        if !host.is_alive(widget) {
            tracing::trace!(?widget, ?reason, "ignoring invalidation of a destroyed widget");
            return;
        }

        let host_flags = host.update_flags(widget);
        let Some(proxy) = self.list.proxy_mut(index) else {
            return;
        };
        let was_persistent = proxy.update_flags.intersects(UpdateFlags::PERSISTENT);
        proxy.update_flags = (proxy.update_flags - UpdateFlags::HOST_DRIVEN) | host_flags;
        proxy.current_reason |= reason;
        let persistent = proxy.update_flags.intersects(UpdateFlags::PERSISTENT);

        if reason.contains(InvalidateReason::VISIBILITY) {
            self.refresh_visibility(host, index);
        }
        if reason.needs_pre_update() {
            self.pre_update.push_unique(&mut self.list, index);
        }
        if reason.contains(InvalidateReason::CHILD_ORDER) {
            host.mark_prepass_dirty(widget);
        }
        if reason.contains(InvalidateReason::PREPASS) {
            self.prepass.push_unique(&mut self.list, index);
        }
        if reason.needs_post_update() || (persistent && !was_persistent) {
            self.post_update.push_unique(&mut self.list, index);
        }
    }

    // -- Internals --

    fn request_slow_path(&mut self, reason: SlowPathReason) {
        self.needs_slow_path.get_or_insert(reason);
    }

    fn reset_fast_path_data(&mut self, clear_list: bool) {
        self.pre_update.reset(&mut self.list, !clear_list);
        self.prepass.reset(&mut self.list, !clear_list);
        self.post_update.reset(&mut self.list, !clear_list);
        self.final_update_list.clear();
        self.cached.clear();
        if clear_list {
            self.list.clear();
        } else {
            self.list.for_each_proxy_mut(|proxy| proxy.in_update_list = false);
        }
    }

    /// Recomputes cached visibility for the subtree at `index`.
    ///
    /// Persistent widgets that just became visible are queued again: while
    /// hidden they dropped out of the update list.
    fn refresh_visibility<H: WidgetHost>(&mut self, host: &H, index: WidgetIndex) {
        let Some(leaf) = self.list.proxy(index).map(|proxy| proxy.leaf_most_child_index) else {
            return;
        };
        let mut cursor = Some(index);
        while let Some(current) = cursor {
            let Some(proxy) = self.list.proxy(current) else {
                break;
            };
            let parent = self.list.proxy(proxy.parent_index).map(|parent| parent.visibility);
            if let Some(widget) = proxy.widget.filter(|&w| host.is_alive(w)) {
                let own = host.visibility(widget);
                let visibility = match parent {
                    Some(parent) => WidgetVisibility::new(parent, own),
                    None => WidgetVisibility::root(own),
                };
                let revealed = visibility.is_visible() && !proxy.visibility.is_visible();
                let persistent = proxy.update_flags.intersects(UpdateFlags::PERSISTENT);
                if let Some(proxy) = self.list.proxy_mut(current) {
                    proxy.visibility = visibility;
                }
                if revealed && persistent {
                    self.post_update.push_unique(&mut self.list, current);
                }
            }
            if current == leaf {
                break;
            }
            cursor = self.list.next_index(current);
        }
    }

    /// Checks list structure, heap membership bits and tree order.
    fn verify<H: WidgetHost>(&self, host: &H) -> Result<(), VerifyError> {
        self.list.verify_widgets_index()?;
        verify_membership(&self.list, &self.pre_update)?;
        verify_membership(&self.list, &self.prepass)?;
        verify_membership(&self.list, &self.post_update)?;
        self.list.verify_against_host(host)
    }
}

fn verify_membership<K: HeapKind>(
    list: &WidgetList,
    heap: &WidgetHeap<K>,
) -> Result<(), VerifyError> {
    let queued: HashSet<WidgetIndex> = heap.iter().collect();
    for proxy in list.iter() {
        if proxy.heaps.contains(K::MEMBERSHIP) != queued.contains(&proxy.index) {
            return Err(VerifyError::HeapMembership {
                index: proxy.index,
                heap: K::NAME,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use kurbo::Size;

    use super::*;
    use crate::arena::WidgetArena;
    use crate::list::WidgetListConfig;
    use crate::visibility::Visibility;

    struct Fixture {
        arena: WidgetArena,
        root: InvalidationRoot,
        top: WidgetId,
        panel: WidgetId,
        x: WidgetId,
        b: WidgetId,
    }

    /// `top → [panel → [x], b]`, painted once through the slow path.
    ///
    /// `x` has no height and `b` is the widest widget, so adding or removing
    /// zero-sized children under `panel` never resizes `top`.
    fn fixture(config: InvalidationConfig) -> Fixture {
        let mut arena = WidgetArena::new();
        let top = arena.create_widget();
        let panel = arena.create_child(top, Size::ZERO);
        let x = arena.create_child(panel, Size::new(10.0, 0.0));
        let b = arena.create_child(top, Size::new(20.0, 10.0));
        arena.set_root(Some(top));
        let mut root = InvalidationRoot::new(config);
        let _ = frame(&mut root, &mut arena);
        arena.take_paint_log();
        Fixture {
            arena,
            root,
            top,
            panel,
            x,
            b,
        }
    }

    fn forward(root: &mut InvalidationRoot, arena: &mut WidgetArena) {
        for widget in arena.take_destroyed() {
            root.on_widget_destroyed(widget);
        }
        for (widget, reason) in arena.take_invalidations() {
            root.invalidate_widget(arena, widget, reason);
        }
    }

    fn frame(root: &mut InvalidationRoot, arena: &mut WidgetArena) -> InvalidationResult {
        forward(root, arena);
        root.paint_invalidation_root(arena, &InvalidationContext::default())
    }

    fn final_widgets(root: &InvalidationRoot) -> Vec<WidgetId> {
        root.final_update_list()
            .iter()
            .filter_map(|&index| root.list().proxy(index)?.widget())
            .collect()
    }

    #[test]
    fn first_frame_takes_the_slow_path() {
        let f = fixture(InvalidationConfig::verifying());
        let stats = f.root.last_frame_stats();
        assert_eq!(stats.path, PaintPath::Slow);
        assert_eq!(stats.slow_path_reason, Some(SlowPathReason::Requested));
        assert_eq!(f.root.list().len(), 4);
        assert_eq!(f.root.cached_elements().len(), 4);
        assert_eq!(f.root.pending_slow_path(), None);
    }

    #[test]
    fn idle_frame_paints_nothing() {
        let mut f = fixture(InvalidationConfig::verifying());
        let result = frame(&mut f.root, &mut f.arena);
        assert!(!result.repainted_widgets);
        assert_eq!(f.root.last_frame_stats().path, PaintPath::Fast);
        assert!(f.root.final_update_list().is_empty());
        assert!(f.arena.take_paint_log().is_empty());
    }

    #[test]
    fn paint_invalidation_repaints_only_that_widget() {
        let mut f = fixture(InvalidationConfig::verifying());
        let b_before = f.root.cached_elements().elements_for(f.b).to_vec();
        f.arena.set_color(f.x, 0x11_22_33_ff);
        let result = frame(&mut f.root, &mut f.arena);

        assert!(result.repainted_widgets);
        assert_eq!(final_widgets(&f.root), [f.x], "siblings stay out of the list");
        assert_eq!(f.arena.take_paint_log(), [f.x]);
        assert_eq!(f.root.cached_elements().elements_for(f.x)[0].color, 0x11_22_33_ff);
        assert_eq!(f.root.cached_elements().elements_for(f.b), b_before);
        assert_eq!(f.root.last_frame_stats().painted, 1);
        assert_eq!(result.max_layer_id, 2);
    }

    #[test]
    fn repainted_parent_covers_its_children() {
        let mut f = fixture(InvalidationConfig::verifying());
        f.arena.set_content_size(f.x, Size::new(15.0, 0.0));
        let _ = frame(&mut f.root, &mut f.arena);
        assert_eq!(
            final_widgets(&f.root),
            [f.x, f.panel, f.top],
            "layout changes climb while the size changes"
        );
        assert_eq!(f.arena.take_paint_log(), [f.top], "top covers the rest");
        let x = f.root.list().find_widget(f.x).unwrap();
        assert!(
            !f.root
                .list()
                .proxy(x)
                .unwrap()
                .update_flags()
                .contains(UpdateFlags::NEEDS_REPAINT),
            "covered widgets drop their repaint flag"
        );
    }

    #[test]
    fn root_resize_takes_the_slow_path() {
        let mut f = fixture(InvalidationConfig::verifying());
        f.arena.set_content_size(f.b, Size::new(20.0, 40.0));
        let result = frame(&mut f.root, &mut f.arena);
        assert!(result.repainted_widgets);
        assert_eq!(
            f.root.last_frame_stats().slow_path_reason,
            Some(SlowPathReason::RootResized)
        );
        assert_eq!(f.root.cached_elements().elements_for(f.b)[0].bounds.height(), 40.0);
    }

    #[test]
    fn ticking_widgets_tick_every_frame_until_they_stop() {
        let mut f = fixture(InvalidationConfig::verifying());
        f.arena.set_needs_tick(f.b, true);
        let _ = frame(&mut f.root, &mut f.arena);
        assert_eq!(f.arena.take_tick_log(), [f.b]);
        let _ = frame(&mut f.root, &mut f.arena);
        assert_eq!(f.arena.take_tick_log(), [f.b], "requeued for the next frame");

        f.arena.set_needs_tick(f.b, false);
        let _ = frame(&mut f.root, &mut f.arena);
        let _ = frame(&mut f.root, &mut f.arena);
        assert!(f.arena.take_tick_log().is_empty());
        assert!(f.root.post_update_heap().is_empty());
    }

    #[test]
    fn timers_run_without_repainting() {
        let mut f = fixture(InvalidationConfig::verifying());
        f.arena.set_active_timer(f.x, true);
        let result = frame(&mut f.root, &mut f.arena);
        assert!(!result.repainted_widgets);
        assert_eq!(f.arena.take_timer_log(), [f.x]);
        assert!(f.arena.take_tick_log().is_empty());
    }

    #[test]
    fn hidden_widget_resumes_ticking_when_shown() {
        let mut f = fixture(InvalidationConfig::verifying());
        f.arena.set_needs_tick(f.x, true);
        let _ = frame(&mut f.root, &mut f.arena);
        assert_eq!(f.arena.take_tick_log(), [f.x]);

        f.arena.set_visibility(f.panel, Visibility::Hidden);
        let _ = frame(&mut f.root, &mut f.arena);
        let _ = frame(&mut f.root, &mut f.arena);
        assert!(f.arena.take_tick_log().is_empty(), "hidden ancestors stop ticks");

        f.arena.set_visibility(f.panel, Visibility::Visible);
        let _ = frame(&mut f.root, &mut f.arena);
        assert_eq!(f.arena.take_tick_log(), [f.x]);
        let _ = frame(&mut f.root, &mut f.arena);
        assert_eq!(f.arena.take_tick_log(), [f.x]);
    }

    #[test]
    fn hiding_a_widget_drops_its_elements() {
        let mut f = fixture(InvalidationConfig::verifying());
        f.arena.set_visibility(f.panel, Visibility::Hidden);
        let _ = frame(&mut f.root, &mut f.arena);
        assert_eq!(f.root.last_frame_stats().path, PaintPath::Fast);
        assert!(f.root.cached_elements().elements_for(f.panel).is_empty());
        assert!(f.root.cached_elements().elements_for(f.x).is_empty());
        assert_eq!(f.root.cached_elements().elements_for(f.b).len(), 1);
    }

    #[test]
    fn volatile_widgets_repaint_every_frame() {
        let mut f = fixture(InvalidationConfig::verifying());
        f.arena.set_volatile(f.b, true);
        let _ = frame(&mut f.root, &mut f.arena);
        assert_eq!(f.arena.take_paint_log(), [f.b]);
        let _ = frame(&mut f.root, &mut f.arena);
        assert_eq!(f.arena.take_paint_log(), [f.b]);
        assert_eq!(f.root.cached_elements().elements_for(f.b).len(), 1);

        f.arena.set_volatile(f.b, false);
        let _ = frame(&mut f.root, &mut f.arena);
        f.arena.take_paint_log();
        let _ = frame(&mut f.root, &mut f.arena);
        assert!(f.arena.take_paint_log().is_empty());
    }

    #[test]
    fn volatile_child_resumes_when_parent_stops_being_volatile() {
        let mut f = fixture(InvalidationConfig::verifying());
        f.arena.set_volatile(f.panel, true);
        f.arena.set_volatile(f.x, true);
        let _ = frame(&mut f.root, &mut f.arena);
        let _ = frame(&mut f.root, &mut f.arena);
        assert_eq!(f.arena.take_paint_log().last(), Some(&f.panel));

        f.arena.set_volatile(f.panel, false);
        let _ = frame(&mut f.root, &mut f.arena);
        f.arena.take_paint_log();
        let _ = frame(&mut f.root, &mut f.arena);
        assert_eq!(f.arena.take_paint_log(), [f.x]);
        let mut fresh = WidgetList::new(f.root.config().list);
        fresh.build(&f.arena, f.top);
        assert!(f.root.list().deep_compare(&fresh));
    }

    #[test]
    fn volatile_prepass_is_forced() {
        let mut f = fixture(InvalidationConfig::verifying());
        f.arena.set_volatile(f.x, true);
        f.arena.set_volatile_prepass(f.x, true);
        let _ = frame(&mut f.root, &mut f.arena);
        let _ = frame(&mut f.root, &mut f.arena);
        assert_eq!(f.root.last_frame_stats().prepass, 1);
        assert!(!f.arena.needs_prepass(f.x));
    }

    #[test]
    fn child_insertion_stays_on_the_fast_path() {
        let mut f = fixture(InvalidationConfig::verifying());
        let y = f.arena.create_child(f.panel, Size::ZERO);
        let result = frame(&mut f.root, &mut f.arena);
        assert!(result.repainted_widgets);
        assert_eq!(f.root.last_frame_stats().path, PaintPath::Fast);
        assert!(f.root.list().find_widget(y).is_some());
        assert_eq!(f.arena.take_paint_log(), [f.panel]);
        assert_eq!(f.root.cached_elements().elements_for(y).len(), 1);
    }

    #[test]
    fn removed_children_leave_the_root() {
        let mut f = fixture(InvalidationConfig::verifying());
        f.arena.remove_from_parent(f.x);
        let _ = frame(&mut f.root, &mut f.arena);
        assert_eq!(f.root.last_frame_stats().path, PaintPath::Fast);
        assert_eq!(f.root.list().find_widget(f.x), None);
        assert_eq!(f.arena.take_removed_log(), [f.x]);
        assert!(f.root.cached_elements().elements_for(f.x).is_empty());
    }

    #[test]
    fn destroyed_widgets_are_detached() {
        let mut f = fixture(InvalidationConfig::verifying());
        f.arena.remove_from_parent(f.x);
        f.arena.destroy_widget(f.x);
        let _ = frame(&mut f.root, &mut f.arena);
        assert_eq!(f.root.list().find_widget(f.x), None);
        assert_eq!(f.root.list().len(), 3);
        assert!(f.root.cached_elements().elements_for(f.x).is_empty());
    }

    #[test]
    fn destroying_the_root_widget_clears_everything() {
        let mut f = fixture(InvalidationConfig::new());
        f.arena.destroy_subtree(f.top);
        let result = frame(&mut f.root, &mut f.arena);
        assert!(result.repainted_widgets);
        assert!(f.root.list().is_empty());
        assert!(f.root.cached_elements().is_empty());
    }

    #[test]
    fn attribute_polling_reaches_newly_bound_widgets() {
        let mut f = fixture(InvalidationConfig::verifying());
        f.arena.bind_attribute(f.b);
        let _ = frame(&mut f.root, &mut f.arena);
        f.arena.take_paint_log();

        f.arena.set_attribute_value(f.b, InvalidateReason::PAINT);
        let _ = frame(&mut f.root, &mut f.arena);
        assert_eq!(f.arena.take_paint_log(), [f.b]);
        assert_eq!(f.root.last_frame_stats().pre_update, 1, "one attribute poll");

        f.arena.unbind_attribute(f.b);
        let _ = frame(&mut f.root, &mut f.arena);
        assert_eq!(f.root.list().attribute_widgets().count(), 0);
    }

    #[test]
    fn collapsed_subtrees_skip_attribute_polling() {
        let mut f = fixture(InvalidationConfig::verifying());
        f.arena.set_visibility(f.panel, Visibility::Collapsed);
        f.arena.bind_attribute(f.x);
        let _ = frame(&mut f.root, &mut f.arena);
        f.arena.take_paint_log();

        f.arena.set_attribute_value(f.x, InvalidateReason::PAINT);
        let _ = frame(&mut f.root, &mut f.arena);
        assert_eq!(f.root.last_frame_stats().pre_update, 0);
        assert!(f.arena.take_paint_log().is_empty());
        assert_eq!(
            f.arena.pending_attribute_reason(f.x),
            InvalidateReason::PAINT,
            "kept until the panel expands"
        );

        f.arena.set_visibility(f.panel, Visibility::Visible);
        let _ = frame(&mut f.root, &mut f.arena);
        assert_eq!(
            f.arena.pending_attribute_reason(f.x),
            InvalidateReason::empty()
        );
    }

    #[test]
    fn prepass_reason_relayouts_the_subtree() {
        let mut f = fixture(InvalidationConfig::verifying());
        let _ = f.arena.take_invalidations();
        let (root, arena) = (&mut f.root, &mut f.arena);
        root.invalidate_widget(arena, f.panel, InvalidateReason::PREPASS);
        let _ = root.paint_invalidation_root(arena, &InvalidationContext::default());
        let stats = root.last_frame_stats();
        assert_eq!(stats.prepass, 1);
        assert!(!arena.needs_prepass(f.panel));
        assert_eq!(arena.take_paint_log(), [f.panel]);
    }

    #[test]
    fn screen_shift_translates_instead_of_repainting() {
        let mut f = fixture(InvalidationConfig::verifying());
        f.root.invalidate_screen_position();
        let context = InvalidationContext::default().with_view_offset(Vec2::new(5.0, 3.0));
        let result = f.root.paint_invalidation_root(&mut f.arena, &context);
        assert!(!result.repainted_widgets);
        assert!(f.arena.take_paint_log().is_empty());
        let bounds = f.root.cached_elements().elements_for(f.b)[0].bounds;
        assert_eq!((bounds.x0, bounds.y0), (5.0, 3.0));
        assert_eq!(f.arena.origin(f.top), kurbo::Point::new(5.0, 3.0));
    }

    #[test]
    fn coarse_invalidations_force_the_slow_path() {
        let mut f = fixture(InvalidationConfig::verifying());
        f.root.invalidate_root_layout();
        f.root.invalidate_root_child_order();
        assert_eq!(f.root.pending_slow_path(), Some(SlowPathReason::Layout));
        let _ = frame(&mut f.root, &mut f.arena);
        assert_eq!(f.root.last_frame_stats().path, PaintPath::Slow);
        assert_eq!(f.arena.take_paint_log(), [f.top]);

        let context = InvalidationContext::default().with_fast_path(false);
        let _ = f.root.paint_invalidation_root(&mut f.arena, &context);
        assert_eq!(
            f.root.last_frame_stats().slow_path_reason,
            Some(SlowPathReason::FastPathDisallowed)
        );
    }

    #[test]
    fn changed_root_widget_rebuilds() {
        let mut f = fixture(InvalidationConfig::verifying());
        f.arena.set_root(Some(f.panel));
        let _ = frame(&mut f.root, &mut f.arena);
        assert_eq!(
            f.root.last_frame_stats().slow_path_reason,
            Some(SlowPathReason::RootChanged)
        );
        assert_eq!(f.root.list().root(), Some(f.panel));
        assert_eq!(f.root.list().len(), 2);
    }

    #[test]
    fn clearing_fast_path_data_repaints_everything() {
        let mut f = fixture(InvalidationConfig::verifying());
        f.root.clear_all_fast_path_data(false);
        assert!(f.root.cached_elements().is_empty());
        assert_eq!(f.root.list().len(), 4, "the list was kept");
        let _ = frame(&mut f.root, &mut f.arena);
        assert_eq!(f.root.cached_elements().len(), 4);
    }

    #[test]
    fn unforwarded_changes_fail_verification() {
        let mut f = fixture(InvalidationConfig::verifying());
        f.arena.create_child(f.panel, Size::ZERO);
        let _ = f.arena.take_invalidations();
        let _ = frame(&mut f.root, &mut f.arena);
        assert_eq!(
            f.root.last_frame_stats().slow_path_reason,
            Some(SlowPathReason::VerificationFailed)
        );
        assert_eq!(f.root.list().len(), 5, "the rebuild picked the child up");
    }

    #[test]
    fn invalidating_unlisted_widgets_is_ignored() {
        let mut f = fixture(InvalidationConfig::verifying());
        let detached = f.arena.create_widget();
        f.root.invalidate_widget(&mut f.arena, detached, InvalidateReason::PAINT);
        assert!(f.root.post_update_heap().is_empty());
        let _ = frame(&mut f.root, &mut f.arena);
        assert_eq!(f.root.last_frame_stats().path, PaintPath::Fast);
    }

    #[test]
    fn proxy_handles_expire_when_the_list_restructures() {
        let mut f = fixture(InvalidationConfig::verifying());
        let handle = f.root.proxy_handle(f.b).unwrap();
        assert!(handle.is_valid(&f.root));
        assert_eq!(handle.proxy(&f.root).and_then(|proxy| proxy.widget()), Some(f.b));

        let other = InvalidationRoot::default();
        assert!(!handle.is_valid(&other), "handles belong to one root");

        f.arena.create_child(f.panel, Size::ZERO);
        let _ = frame(&mut f.root, &mut f.arena);
        assert!(!handle.is_valid(&f.root));
        assert!(f.root.proxy_handle(f.b).unwrap().is_valid(&f.root));
    }

    /// Tiny deterministic generator for the randomized test.
    struct XorShift(u64);

    impl XorShift {
        fn next(&mut self) -> u64 {
            self.0 ^= self.0 << 13;
            self.0 ^= self.0 >> 7;
            self.0 ^= self.0 << 17;
            self.0
        }

        fn below(&mut self, n: usize) -> usize {
            let n = u64::try_from(n).unwrap();
            usize::try_from(self.next() % n).unwrap()
        }
    }

    #[test]
    fn randomized_frames_keep_the_list_consistent() {
        let list = WidgetListConfig::new()
            .with_elements_per_segment(4)
            .with_min_elements_before_merge(2);
        let config = InvalidationConfig::verifying().with_list(list);
        let mut f = fixture(config);
        let mut rng = XorShift(0x9e37_79b9_7f4a_7c15);
        let mut widgets = alloc::vec![f.panel, f.x, f.b];
        for step in 0..200 {
            let pick = widgets[rng.below(widgets.len())];
            match rng.below(5) {
                0 | 1 => widgets.push(f.arena.create_child(pick, Size::ZERO)),
                2 => f.arena.set_color(pick, u32::try_from(step).unwrap()),
                3 => f.arena.set_needs_tick(pick, rng.below(2) == 0),
                _ if pick != f.panel && pick != f.b => {
                    let doomed = f.arena.subtree(pick);
                    f.arena.remove_from_parent(pick);
                    f.arena.destroy_subtree(pick);
                    widgets.retain(|w| !doomed.contains(w));
                }
                _ => f.arena.set_visibility(pick, Visibility::Hidden),
            }
            let _ = frame(&mut f.root, &mut f.arena);
            assert_ne!(
                f.root.last_frame_stats().slow_path_reason,
                Some(SlowPathReason::VerificationFailed),
                "step {step}"
            );
            let mut fresh = WidgetList::new(config.list);
            fresh.build(&f.arena, f.top);
            assert!(f.root.list().deep_compare(&fresh), "step {step}");
        }
    }
}
