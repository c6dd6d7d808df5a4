// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host contract for widget toolkits.
//!
//! Lamina does not own widgets. A toolkit keeps its widget tree wherever it
//! likes and exposes it to the scheduler through two traits:
//!
//! - **[`WidgetHost`]**: per-widget capabilities the scheduler calls into:
//!   topology, layout, paint, periodic callbacks, volatility, visibility and
//!   bound attributes. Widgets are addressed by [`WidgetId`], a generational
//!   handle; the scheduler holds ids, never widgets, and checks
//!   [`is_alive`](WidgetHost::is_alive) before trusting one.
//!
//! - **[`InvalidationHost`]**: what the owner of an
//!   [`InvalidationRoot`](crate::root::InvalidationRoot) adds on top: the
//!   current root widget, a full (slow-path) paint, and hit-test grid
//!   bookkeeping.
//!
//! [`WidgetArena`](crate::arena::WidgetArena) implements both and is the
//! reference host used by tests and by hosts without a tree of their own.
//!
//! # Frame loop pseudocode
//!
//! ```rust,ignore
//! fn on_frame(dt: f64) {
//!     // Widget code mutated the tree since last frame; forward what it
//!     // reported to the root.
//!     for (widget, reason) in host.take_invalidations() {
//!         root.invalidate_widget(&mut host, widget, reason);
//!     }
//!
//!     let context = InvalidationContext::new(paint_args(dt));
//!     let result = root.paint_invalidation_root(&mut host, &context);
//!     if result.repainted_widgets {
//!         renderer.submit(root.cached_elements());
//!     }
//! }
//! ```

use kurbo::{Rect, Size, Vec2};

use crate::arena::WidgetId;
use crate::paint::ElementSink;
use crate::reason::{InvalidateReason, UpdateFlags};
use crate::root::InvalidationContext;
use crate::visibility::Visibility;

/// Per-frame arguments forwarded to widget paint and periodic callbacks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PaintArgs {
    /// Application time in seconds.
    pub current_time: f64,
    /// Seconds since the previous frame.
    pub delta_time: f64,
    /// Region outside of which painting may be culled.
    pub culling_rect: Rect,
    /// Layout scale passed to prepass.
    pub layout_scale: f32,
    /// Layer id painting starts from.
    pub layer_id: i32,
}

impl PaintArgs {
    /// Creates arguments for a frame at `current_time` with unit scale.
    #[must_use]
    pub const fn new(current_time: f64, delta_time: f64) -> Self {
        Self {
            current_time,
            delta_time,
            culling_rect: Rect::ZERO,
            layout_scale: 1.0,
            layer_id: 0,
        }
    }
}

impl Default for PaintArgs {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// Widget capabilities consumed by the invalidation scheduler.
///
/// Methods taking a [`WidgetId`] may assume the id is alive unless
/// documented otherwise; the scheduler checks
/// [`is_alive`](Self::is_alive) before calling into a widget it has not
/// just reached through [`children`](Self::children).
pub trait WidgetHost {
    /// Iterator over a widget's direct children, in paint order.
    type Children<'a>: Iterator<Item = WidgetId>
    where
        Self: 'a;

    // -- Topology --

    /// Returns the direct children of `id`.
    fn children(&self, id: WidgetId) -> Self::Children<'_>;

    /// Returns the parent of `id`, if any.
    fn parent(&self, id: WidgetId) -> Option<WidgetId>;

    /// Returns `true` if `id` still refers to a live widget.
    ///
    /// Must not panic for stale ids.
    fn is_alive(&self, id: WidgetId) -> bool;

    /// Returns `true` for the placeholder widget that occupies empty slots.
    ///
    /// Null widgets never get a proxy.
    fn is_null_widget(&self, _id: WidgetId) -> bool {
        false
    }

    /// Returns `true` if `id` owns a nested invalidation root.
    ///
    /// The widget itself is listed; its children belong to the nested root
    /// and are not.
    fn is_invalidation_root(&self, _id: WidgetId) -> bool {
        false
    }

    // -- Visibility and volatility --

    /// Returns the widget's own visibility.
    fn visibility(&self, id: WidgetId) -> Visibility;

    /// Returns `true` if the widget never caches its paint output.
    fn is_volatile(&self, id: WidgetId) -> bool;

    /// Returns `true` if an ancestor is volatile, in which case the ancestor
    /// repaints this widget every frame anyway.
    fn is_volatile_indirectly(&self, id: WidgetId) -> bool;

    /// Returns `true` if a volatile widget must also prepass every frame.
    fn needs_volatile_prepass(&self, _id: WidgetId) -> bool {
        false
    }

    // -- Attributes --

    /// Returns `true` if the widget has bound attributes that must be polled
    /// every frame.
    fn has_registered_attributes(&self, _id: WidgetId) -> bool {
        false
    }

    /// Polls bound attributes and returns the invalidations their new values
    /// raise.
    fn update_attributes(&mut self, _id: WidgetId) -> InvalidateReason {
        InvalidateReason::empty()
    }

    // -- Periodic work --

    /// Returns the host-driven subset of [`UpdateFlags`] the widget wants
    /// (see [`UpdateFlags::HOST_DRIVEN`]).
    fn update_flags(&self, id: WidgetId) -> UpdateFlags;

    /// Runs the widget's per-frame tick.
    fn tick(&mut self, _id: WidgetId, _args: &PaintArgs) {}

    /// Runs the widget's active timers.
    fn execute_active_timers(&mut self, _id: WidgetId, _args: &PaintArgs) {}

    // -- Layout --

    /// Returns the desired size computed by the last prepass.
    fn desired_size(&self, id: WidgetId) -> Size;

    /// Returns `true` if the widget's cached desired size is stale.
    fn needs_prepass(&self, id: WidgetId) -> bool;

    /// Returns `true` once the widget has been laid out at some scale.
    fn has_layout_scale(&self, id: WidgetId) -> bool;

    /// Recomputes the widget's own desired size from its children's cached
    /// sizes.
    fn cache_desired_size(&mut self, id: WidgetId, scale: f32);

    /// Recomputes desired sizes for the widget's whole subtree, children
    /// first.
    fn prepass(&mut self, id: WidgetId, scale: f32);

    /// Marks the widget's cached desired size stale.
    fn mark_prepass_dirty(&mut self, id: WidgetId);

    // -- Paint --

    /// Paints the widget and its subtree into `sink`, returning the highest
    /// layer id used.
    fn paint(&mut self, id: WidgetId, args: &PaintArgs, sink: &mut ElementSink<'_>) -> i32;

    /// Shifts the widget's cached geometry after the whole root moved on
    /// screen.
    fn translate_geometry(&mut self, _id: WidgetId, _delta: Vec2) {}
}

/// Capabilities of the owner of an invalidation root.
pub trait InvalidationHost: WidgetHost {
    /// Returns the widget the root paints, if there is one.
    fn root_widget(&self) -> Option<WidgetId>;

    /// Lays out and paints the whole root from scratch, returning the
    /// highest layer id used.
    fn paint_slow_path(&mut self, context: &InvalidationContext, sink: &mut ElementSink<'_>)
    -> i32;

    /// Notifies the host that widgets left the root, so any hit-test data
    /// for them can be dropped.
    fn widgets_removed(&mut self, _widgets: &[WidgetId]) {}

    /// Checks the host's hit-test grid against the widget tree.
    fn verify_hittest_grid(&self) -> bool {
        true
    }
}
