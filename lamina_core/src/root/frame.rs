// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-frame pipeline.
//!
//! A fast-path frame runs these phases in order:
//!
//! 1. **Screen shift**: if the root moved, translate cached geometry.
//! 2. **Pre-update**: poll bound attributes and resolve child-order and
//!    attribute-registration changes, in tree order.
//! 3. **Volatile**: queue every volatile widget for paint, and for prepass
//!    if it asks for one.
//! 4. **Prepass**: mark queued subtrees for a full layout pass, root-first.
//! 5. **Post-update**: resolve layout and paint reasons leaf-first and
//!    collect the final update list.
//! 6. **Paint**: walk the final update list root-first, repainting widgets
//!    not already covered by a repainted ancestor and ticking the rest.
//!
//! Any phase may decide the fast path can no longer be trusted. The
//! remaining phases are then skipped and the frame is painted through the
//! slow path instead.

use alloc::vec::Vec;

use kurbo::Vec2;

use crate::error::VerifyError;
use crate::host::{InvalidationHost, PaintArgs};
use crate::list::{AttributeCursor, IndexRange, WidgetIndex};
use crate::proxy::{mark_proxy_updated_this_frame, process_invalidation};
use crate::reason::{InvalidateReason, UpdateFlags};
use crate::trace::{
    ChildOrderEvent, FrameBeginEvent, FrameSummaryBuilder, PhaseBeginEvent, PhaseEndEvent,
    PhaseKind, SlowPathEvent, Tracer,
};

use super::observer::RootObserver;
use super::{InvalidationContext, InvalidationResult, InvalidationRoot, SlowPathReason};

impl InvalidationRoot {
    /// Paints one frame.
    ///
    /// Processes everything invalidated since the previous frame and
    /// repaints what changed, or rebuilds and repaints the whole root when
    /// the fast path cannot be used.
    pub fn paint_invalidation_root<H: InvalidationHost>(
        &mut self,
        host: &mut H,
        context: &InvalidationContext,
    ) -> InvalidationResult {
        self.paint_invalidation_root_traced(host, context, &mut Tracer::none())
    }

    /// Like [`paint_invalidation_root`](Self::paint_invalidation_root),
    /// reporting frame events to `tracer`.
    pub fn paint_invalidation_root_traced<H: InvalidationHost>(
        &mut self,
        host: &mut H,
        context: &InvalidationContext,
        tracer: &mut Tracer<'_>,
    ) -> InvalidationResult {
        self.frame_index += 1;
        let frame_index = self.frame_index;
        let _span = tracing::trace_span!("paint_invalidation_root", frame = frame_index).entered();
        tracer.frame_begin(&FrameBeginEvent {
            frame_index,
            root: self.id,
            fast_path_allowed: context.allow_fast_path,
        });
        let mut summary = FrameSummaryBuilder::new(frame_index, self.id);

        if !context.allow_fast_path {
            self.request_slow_path(SlowPathReason::FastPathDisallowed);
        }
        if self.list.root() != host.root_widget() {
            self.request_slow_path(SlowPathReason::RootChanged);
        }

        let result = match self.paint_fast_path(host, context, tracer, &mut summary) {
            Some(result) => result,
            None => {
                let reason = self.needs_slow_path.unwrap_or(SlowPathReason::Requested);
                tracing::debug!(?reason, "painting through the slow path");
                summary.set_slow_path(reason);
                tracer.slow_path(&SlowPathEvent {
                    frame_index,
                    reason,
                });
                self.paint_slow_path(host, context, tracer, &mut summary)
            }
        };

        self.last_view_offset = Some(context.view_offset);
        self.pending_screen_shift = false;
        self.last_stats = summary.stats();
        tracer.frame_summary(&summary.finish(result.max_layer_id, result.repainted_widgets));
        result
    }

    /// Runs the fast path, or returns `None` once the slow path is needed.
    fn paint_fast_path<H: InvalidationHost>(
        &mut self,
        host: &mut H,
        context: &InvalidationContext,
        tracer: &mut Tracer<'_>,
        summary: &mut FrameSummaryBuilder,
    ) -> Option<InvalidationResult> {
        if self.needs_slow_path.is_some() {
            return None;
        }
        self.final_update_list.clear();
        self.apply_screen_shift(host, context.view_offset);

        self.phase_begin(tracer, PhaseKind::PreUpdate);
        let processed = self.process_pre_update(host, tracer);
        self.phase_end(tracer, summary, PhaseKind::PreUpdate, processed);
        if self.needs_slow_path.is_some() {
            return None;
        }

        self.queue_volatile_widgets(host);

        self.phase_begin(tracer, PhaseKind::Prepass);
        let processed = self.process_prepass(host);
        self.phase_end(tracer, summary, PhaseKind::Prepass, processed);

        self.phase_begin(tracer, PhaseKind::PostUpdate);
        let processed = self.process_post_update(host, context.paint_args.layout_scale);
        self.phase_end(tracer, summary, PhaseKind::PostUpdate, processed);
        if self.needs_slow_path.is_some() {
            return None;
        }
        summary.set_final_list(saturate(self.final_update_list.len()));

        if self.config.verify_widget_list
            && let Err(error) = self.verify(host)
        {
            tracing::warn!(%error, "widget list verification failed");
            self.request_slow_path(SlowPathReason::VerificationFailed);
            return None;
        }
        if self.config.verify_hittest_grid && !host.verify_hittest_grid() {
            tracing::warn!(error = %VerifyError::HittestGrid, "hit-test verification failed");
        }
        if self.config.dump_update_lists {
            tracing::debug!(
                frame = self.frame_index,
                final_list = ?self.final_update_list,
                "final update list"
            );
        }

        self.phase_begin(tracer, PhaseKind::Paint);
        let (painted, max_painted) = self.repaint(host, &context.paint_args);
        self.phase_end(tracer, summary, PhaseKind::Paint, painted);
        self.post_update.defer();

        Some(InvalidationResult {
            max_layer_id: self.cached.max_layer_id().max(max_painted),
            repainted_widgets: painted > 0,
        })
    }

    fn phase_begin(&self, tracer: &mut Tracer<'_>, phase: PhaseKind) {
        tracing::trace!(frame = self.frame_index, ?phase, "phase begin");
        tracer.phase_begin(&PhaseBeginEvent {
            frame_index: self.frame_index,
            phase,
        });
    }

    fn phase_end(
        &self,
        tracer: &mut Tracer<'_>,
        summary: &mut FrameSummaryBuilder,
        phase: PhaseKind,
        processed: u32,
    ) {
        tracing::trace!(frame = self.frame_index, ?phase, processed, "phase end");
        tracer.phase_end(&PhaseEndEvent {
            frame_index: self.frame_index,
            phase,
            processed,
        });
        summary.phase_end(phase, processed);
    }

    fn apply_screen_shift<H: InvalidationHost>(&mut self, host: &mut H, view_offset: Vec2) {
        let delta = self
            .last_view_offset
            .map_or(Vec2::ZERO, |last| view_offset - last);
        if delta == Vec2::ZERO {
            return;
        }
        tracing::trace!(?delta, requested = self.pending_screen_shift, "shifting cached geometry");
        self.list.for_each_widget(|widget| {
            if host.is_alive(widget) {
                host.translate_geometry(widget, delta);
            }
        });
        self.cached.translate(delta);
    }

    // -- Pre-update --

    /// Interleaves attribute polling with the pre-update heap so both run
    /// in tree order. On a tie the attribute goes first.
    fn process_pre_update<H: InvalidationHost>(
        &mut self,
        host: &mut H,
        tracer: &mut Tracer<'_>,
    ) -> u32 {
        let _span = tracing::trace_span!("pre_update").entered();
        let mut cursor = AttributeCursor::new(&self.list);
        let mut processed = 0;
        while self.needs_slow_path.is_none() {
            let attribute = cursor.current_sort_order(&self.list);
            let queued = self.pre_update.peek().map(|(order, _)| order);
            let take_attribute = match (attribute, queued) {
                (None, None) => break,
                (Some(attribute), Some(queued)) => attribute <= queued,
                (attribute, _) => attribute.is_some(),
            };
            if take_attribute {
                let Some(index) = cursor.current() else {
                    break;
                };
                if self.is_collapsed_indirectly(index) {
                    cursor.advance_to_next_sibling(&self.list);
                    continue;
                }
                processed += 1;
                self.poll_attributes(host, index);
                // Descendants of a collapsed widget keep their pending
                // attribute changes until it expands again.
                if self.is_collapsed(index) {
                    cursor.advance_to_next_sibling(&self.list);
                } else {
                    cursor.advance(&self.list);
                }
            } else {
                let Some(index) = self.pre_update.pop(&mut self.list) else {
                    break;
                };
                processed += 1;
                self.process_structural(host, index, &mut cursor, tracer);
            }
        }
        processed
    }

    fn is_collapsed(&self, index: WidgetIndex) -> bool {
        self.list
            .proxy(index)
            .is_some_and(|proxy| proxy.visibility().is_collapsed())
    }

    fn is_collapsed_indirectly(&self, index: WidgetIndex) -> bool {
        self.list
            .proxy(index)
            .is_some_and(|proxy| proxy.visibility().is_collapsed_indirectly())
    }

    fn poll_attributes<H: InvalidationHost>(&mut self, host: &mut H, index: WidgetIndex) {
        let Some(widget) = self
            .list
            .proxy(index)
            .and_then(|proxy| proxy.widget)
            .filter(|&w| host.is_alive(w))
        else {
            return;
        };
        let reason = host.update_attributes(widget);
        if !reason.is_empty() {
            self.invalidate_widget(host, widget, reason);
        }
    }

    /// Resolves the structural reasons of one pre-update entry.
    fn process_structural<H: InvalidationHost>(
        &mut self,
        host: &mut H,
        index: WidgetIndex,
        cursor: &mut AttributeCursor,
        tracer: &mut Tracer<'_>,
    ) {
        let Some(proxy) = self.list.proxy_mut(index) else {
            return;
        };
        let reason = proxy.current_reason;
        proxy.current_reason.remove(InvalidateReason::ATTRIBUTE_REGISTRATION);
        let Some(widget) = proxy.widget.filter(|&w| host.is_alive(w)) else {
            return;
        };

        if reason.contains(InvalidateReason::ATTRIBUTE_REGISTRATION)
            && self
                .list
                .process_attribute_registration_invalidation(&*host, widget)
                == Some(true)
        {
            // The cursor is already past this widget.
            self.poll_attributes(host, index);
        }

        if !reason.contains(InvalidateReason::CHILD_ORDER) {
            return;
        }
        let mut observer = RootObserver {
            pre_update: &mut self.pre_update,
            prepass: &mut self.prepass,
            post_update: &mut self.post_update,
            cursor,
        };
        let Some(change) =
            self.list
                .process_child_order_invalidation(&*host, widget, &mut observer)
        else {
            return;
        };
        for &removed in &change.removed {
            self.cached.remove_widget(removed);
        }
        if !change.removed.is_empty() {
            host.widgets_removed(&change.removed);
        }
        for &rebuilt in &change.rebuilt {
            let Some(rebuilt_index) = self.list.find_widget(rebuilt) else {
                continue;
            };
            let persistent = self.list.proxy(rebuilt_index).is_some_and(|proxy| {
                proxy.update_flags.intersects(UpdateFlags::PERSISTENT)
                    && proxy.visibility.is_visible()
            });
            if persistent {
                self.post_update.push_unique(&mut self.list, rebuilt_index);
            }
        }
        tracing::trace!(
            ?widget,
            removed = change.removed.len(),
            rebuilt = change.rebuilt.len(),
            "rebuilt children"
        );
        tracer.child_order(&ChildOrderEvent {
            frame_index: self.frame_index,
            widget,
            removed: saturate(change.removed.len()),
            rebuilt: saturate(change.rebuilt.len()),
        });
    }

    // -- Volatile --

    fn queue_volatile_widgets<H: InvalidationHost>(&mut self, host: &H) {
        let volatile: Vec<WidgetIndex> = self.list.volatile_widgets().collect();
        for index in volatile {
            self.post_update.push_back_unique(&mut self.list, index);
            let prepass = self
                .list
                .proxy(index)
                .and_then(|proxy| proxy.widget)
                .is_some_and(|widget| host.is_alive(widget) && host.needs_volatile_prepass(widget));
            if prepass {
                self.prepass.push_unique(&mut self.list, index);
            }
        }
    }

    // -- Prepass --

    /// Marks each queued subtree for a full prepass and hands its root to
    /// post-update as a layout change. Entries inside a subtree already
    /// handled are skipped.
    fn process_prepass<H: InvalidationHost>(&mut self, host: &mut H) -> u32 {
        let _span = tracing::trace_span!("prepass").entered();
        let mut processed = 0;
        let mut covered: Option<IndexRange> = None;
        while let Some(index) = self.prepass.pop(&mut self.list) {
            processed += 1;
            let Some(order) = self.list.sort_order_checked(index) else {
                continue;
            };
            let Some(proxy) = self.list.proxy_mut(index) else {
                continue;
            };
            proxy.current_reason.remove(InvalidateReason::PREPASS);
            if covered.is_some_and(|range| range.includes(order)) {
                continue;
            }
            let Some(widget) = proxy.widget.filter(|&w| host.is_alive(w)) else {
                continue;
            };
            proxy.current_reason |= InvalidateReason::LAYOUT;
            host.mark_prepass_dirty(widget);
            self.post_update.push_unique(&mut self.list, index);
            covered = Some(self.list.index_range(index));
        }
        processed
    }

    // -- Post-update --

    /// Resolves post-update reasons leaf-first and collects the final update
    /// list.
    fn process_post_update<H: InvalidationHost>(&mut self, host: &mut H, scale: f32) -> u32 {
        let _span = tracing::trace_span!("post_update").entered();
        self.post_update.heapify(&self.list);
        let mut processed = 0;
        while let Some(index) = self.post_update.pop(&mut self.list) {
            processed += 1;
            let outcome =
                process_invalidation(&mut self.list, index, host, &mut self.post_update, scale);
            if outcome.invalidate_root {
                self.request_slow_path(SlowPathReason::RootResized);
                break;
            }
            let Some(proxy) = self.list.proxy_mut(index) else {
                continue;
            };
            let wanted = proxy.widget.is_some() && !proxy.update_flags.is_empty();
            if wanted && proxy.visibility.is_visible() {
                proxy.in_update_list = true;
                self.final_update_list.push(index);
            } else {
                // A hidden widget is repainted by whichever ancestor reveals it.
                proxy.update_flags.remove(UpdateFlags::NEEDS_REPAINT);
                proxy.in_update_list = false;
            }
        }
        processed
    }

    // -- Paint --

    /// Updates the final list root-first. Returns how many widgets painted
    /// and the highest layer they used.
    fn repaint<H: InvalidationHost>(&mut self, host: &mut H, args: &PaintArgs) -> (u32, i32) {
        let _span = tracing::trace_span!("paint").entered();
        let mut painted = 0;
        let mut max_layer = args.layer_id;
        let mut covered: Option<IndexRange> = None;
        let final_list = core::mem::take(&mut self.final_update_list);
        for &index in final_list.iter().rev() {
            let Some(order) = self.list.sort_order_checked(index) else {
                continue;
            };
            let inside = covered.is_some_and(|range| range.includes(order));
            let Some(proxy) = self.list.proxy(index) else {
                continue;
            };
            let wants_paint = proxy.update_flags.intersects(UpdateFlags::PAINT);
            let leaf = proxy.leaf_most_child_index;

            if wants_paint && !inside {
                for proxy in self.list.iter_from(index) {
                    if let Some(widget) = proxy.widget {
                        self.cached.clear_widget(widget);
                    }
                    if proxy.index == leaf {
                        break;
                    }
                }
                let range = self.list.index_range(index);
                if let Some(proxy) = self.list.proxy_mut(index)
                    && let Some(layer) = proxy.update(host, args, &mut self.cached.sink())
                {
                    painted += 1;
                    max_layer = max_layer.max(layer);
                }
                covered = Some(range);
            } else if let Some(proxy) = self.list.proxy_mut(index) {
                if inside {
                    proxy.update_flags.remove(UpdateFlags::NEEDS_REPAINT);
                }
                if let Some(widget) = proxy.widget.filter(|&w| host.is_alive(w)) {
                    proxy.run_periodic(host, widget, args);
                }
            }
            mark_proxy_updated_this_frame(&mut self.list, index, &mut self.post_update);
        }
        self.final_update_list = final_list;
        (painted, max_layer)
    }

    // -- Slow path --

    /// Rebuilds the list from the host's root widget and repaints it all.
    fn paint_slow_path<H: InvalidationHost>(
        &mut self,
        host: &mut H,
        context: &InvalidationContext,
        tracer: &mut Tracer<'_>,
        summary: &mut FrameSummaryBuilder,
    ) -> InvalidationResult {
        let _span = tracing::trace_span!("slow_path").entered();
        self.phase_begin(tracer, PhaseKind::SlowPath);
        self.reset_fast_path_data(true);
        if let Some(root) = host.root_widget() {
            self.list.build(&*host, root);
        }
        let layer = host.paint_slow_path(context, &mut self.cached.sink());

        let args = context.paint_args;
        let indices: Vec<WidgetIndex> = self
            .list
            .iter()
            .filter(|proxy| proxy.widget.is_some())
            .map(|proxy| proxy.index)
            .collect();
        for &index in &indices {
            let Some(proxy) = self.list.proxy_mut(index) else {
                continue;
            };
            proxy.current_reason = InvalidateReason::empty();
            proxy.update_flags.remove(UpdateFlags::NEEDS_REPAINT);
            if let Some(widget) = proxy.widget.filter(|&w| host.is_alive(w)) {
                proxy.run_periodic(host, widget, &args);
            }
            let persistent = proxy.update_flags.intersects(UpdateFlags::PERSISTENT)
                && proxy.visibility.is_visible();
            if persistent {
                proxy.in_update_list = true;
                self.post_update.push_back_unique(&mut self.list, index);
            }
        }
        self.needs_slow_path = None;
        self.phase_end(tracer, summary, PhaseKind::SlowPath, saturate(indices.len()));

        InvalidationResult {
            max_layer_id: self.cached.max_layer_id().max(layer),
            repainted_widgets: true,
        }
    }
}

fn saturate(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}
