// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layout and paint for the reference widget tree.
//!
//! The arena lays its widgets out as a vertical stack:
//!
//! 1. **Prepass**: desired sizes are computed children first. A leaf's
//!    desired size is its content size; a container's is
//!    `(max child width, sum of child heights)` over its non-collapsed
//!    children.
//! 2. **Paint**: each visible widget of the painted subtree emits one
//!    [`DrawElement`] covering its desired size, at `layer = base + depth`.
//!    Children are placed below each other starting at their parent's
//!    origin. Hidden widgets keep their space but emit nothing, and neither
//!    does their subtree.

use alloc::vec::Vec;

use kurbo::{Point, Rect, Size, Vec2};

use super::id::{INVALID, WidgetId};
use super::store::WidgetArena;
use super::traverse::{Children, PreOrder};
use crate::host::{InvalidationHost, PaintArgs, WidgetHost};
use crate::paint::{DrawElement, ElementSink};
use crate::reason::{InvalidateReason, UpdateFlags};
use crate::root::InvalidationContext;
use crate::visibility::Visibility;

impl WidgetArena {
    /// Recomputes desired sizes for the subtree rooted at `id`, children
    /// first.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn prepass_subtree(&mut self, id: WidgetId, scale: f32) {
        self.validate(id);
        let pre_order: Vec<u32> = PreOrder::new(self, id.idx).collect();
        for &idx in pre_order.iter().rev() {
            self.cache_at(idx, scale);
        }
    }

    /// Returns how many ancestors `id` has.
    #[must_use]
    pub fn depth(&self, id: WidgetId) -> u32 {
        self.validate(id);
        let mut depth = 0;
        let mut p = self.parent[id.idx as usize];
        while p != INVALID {
            depth += 1;
            p = self.parent[p as usize];
        }
        depth
    }

    fn cache_at(&mut self, idx: u32, scale: f32) {
        let size = self.compute_desired_size(idx);
        let i = idx as usize;
        self.desired_size[i] = size;
        self.layout_scale[i] = Some(scale);
        self.prepass_dirty[i] = false;
    }

    fn compute_desired_size(&self, idx: u32) -> Size {
        let first = self.first_child[idx as usize];
        if first == INVALID {
            return self.content_size[idx as usize];
        }
        Children::new(self, first)
            .laid_out()
            .fold(Size::ZERO, |size, child| {
                let child_size = self.desired_size[child.idx as usize];
                Size::new(
                    size.width.max(child_size.width),
                    size.height + child_size.height,
                )
            })
    }

    fn paint_subtree(&mut self, idx: u32, args: &PaintArgs, sink: &mut ElementSink<'_>) -> i32 {
        #[expect(
            clippy::cast_possible_wrap,
            reason = "tree depth stays far below i32::MAX"
        )]
        let base = args.layer_id + self.depth(self.id_at(idx)) as i32;
        self.paint_log.push(self.id_at(idx));

        let mut max_layer = base;
        let mut stack = alloc::vec![(idx, base)];
        while let Some((idx, layer)) = stack.pop() {
            let i = idx as usize;
            if !self.visibility[i].is_visible() {
                continue;
            }
            let origin = self.origin[i];
            if !self.flags[i].null_widget {
                sink.push(
                    self.id_at(idx),
                    DrawElement {
                        layer_id: layer,
                        bounds: Rect::from_origin_size(origin, self.desired_size[i]),
                        kind: self.kind[i],
                        color: self.color[i],
                    },
                );
                max_layer = max_layer.max(layer);
            }

            let start = stack.len();
            let mut cursor = origin.y;
            let mut child = self.first_child[i];
            while child != INVALID {
                let c = child as usize;
                self.origin[c] = Point::new(origin.x, cursor);
                if !self.visibility[c].is_collapsed() {
                    cursor += self.desired_size[c].height;
                    stack.push((child, layer + 1));
                }
                child = self.next_sibling[c];
            }
            stack[start..].reverse();
        }
        max_layer
    }

    fn is_volatile_indirectly_at(&self, idx: u32) -> bool {
        let mut p = self.parent[idx as usize];
        while p != INVALID {
            if self.volatile[p as usize] {
                return true;
            }
            p = self.parent[p as usize];
        }
        false
    }
}

impl WidgetHost for WidgetArena {
    type Children<'a> = Children<'a>;

    fn children(&self, id: WidgetId) -> Children<'_> {
        Self::children(self, id)
    }

    fn parent(&self, id: WidgetId) -> Option<WidgetId> {
        Self::parent(self, id)
    }

    fn is_alive(&self, id: WidgetId) -> bool {
        Self::is_alive(self, id)
    }

    fn is_null_widget(&self, id: WidgetId) -> bool {
        self.flags(id).null_widget
    }

    fn is_invalidation_root(&self, id: WidgetId) -> bool {
        self.flags(id).invalidation_root
    }

    fn visibility(&self, id: WidgetId) -> Visibility {
        self.validate(id);
        self.visibility[id.idx as usize]
    }

    fn is_volatile(&self, id: WidgetId) -> bool {
        self.validate(id);
        self.volatile[id.idx as usize]
    }

    fn is_volatile_indirectly(&self, id: WidgetId) -> bool {
        self.validate(id);
        self.is_volatile_indirectly_at(id.idx)
    }

    fn needs_volatile_prepass(&self, id: WidgetId) -> bool {
        self.validate(id);
        self.volatile_prepass[id.idx as usize]
    }

    fn has_registered_attributes(&self, id: WidgetId) -> bool {
        self.bound_attributes(id) > 0
    }

    fn update_attributes(&mut self, id: WidgetId) -> InvalidateReason {
        self.validate(id);
        core::mem::take(&mut self.pending_attribute_reason[id.idx as usize])
    }

    fn update_flags(&self, id: WidgetId) -> UpdateFlags {
        self.validate(id);
        self.update_flags[id.idx as usize] & UpdateFlags::HOST_DRIVEN
    }

    fn tick(&mut self, id: WidgetId, _args: &PaintArgs) {
        self.validate(id);
        self.tick_log.push(id);
    }

    fn execute_active_timers(&mut self, id: WidgetId, _args: &PaintArgs) {
        self.validate(id);
        self.timer_log.push(id);
    }

    fn desired_size(&self, id: WidgetId) -> Size {
        self.validate(id);
        self.desired_size[id.idx as usize]
    }

    fn needs_prepass(&self, id: WidgetId) -> bool {
        self.validate(id);
        self.prepass_dirty[id.idx as usize]
    }

    fn has_layout_scale(&self, id: WidgetId) -> bool {
        self.validate(id);
        self.layout_scale[id.idx as usize].is_some()
    }

    fn cache_desired_size(&mut self, id: WidgetId, scale: f32) {
        self.validate(id);
        self.cache_at(id.idx, scale);
    }

    fn prepass(&mut self, id: WidgetId, scale: f32) {
        self.prepass_subtree(id, scale);
    }

    fn mark_prepass_dirty(&mut self, id: WidgetId) {
        self.validate(id);
        self.prepass_dirty[id.idx as usize] = true;
    }

    fn paint(&mut self, id: WidgetId, args: &PaintArgs, sink: &mut ElementSink<'_>) -> i32 {
        self.validate(id);
        self.paint_subtree(id.idx, args, sink)
    }

    fn translate_geometry(&mut self, id: WidgetId, delta: Vec2) {
        self.validate(id);
        self.origin[id.idx as usize] += delta;
    }
}

impl InvalidationHost for WidgetArena {
    fn root_widget(&self) -> Option<WidgetId> {
        self.root()
    }

    fn paint_slow_path(
        &mut self,
        context: &InvalidationContext,
        sink: &mut ElementSink<'_>,
    ) -> i32 {
        let Some(root) = self.root() else {
            return context.paint_args.layer_id;
        };
        self.origin[root.idx as usize] = Point::ZERO + context.view_offset;
        self.prepass_subtree(root, context.paint_args.layout_scale);
        self.paint_subtree(root.idx, &context.paint_args, sink)
    }

    fn widgets_removed(&mut self, widgets: &[WidgetId]) {
        self.removed_log.extend_from_slice(widgets);
    }
}
