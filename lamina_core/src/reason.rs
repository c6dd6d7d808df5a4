// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Invalidation reasons and per-widget update flags.
//!
//! Widget code never talks to the scheduler in terms of phases. It reports
//! *why* a widget is stale ([`InvalidateReason`]) and the
//! [`InvalidationRoot`](crate::root::InvalidationRoot) routes the widget to
//! the queues that can resolve that reason:
//!
//! - **Structural**: [`CHILD_ORDER`](InvalidateReason::CHILD_ORDER) and
//!   [`ATTRIBUTE_REGISTRATION`](InvalidateReason::ATTRIBUTE_REGISTRATION)
//!   restructure the [`WidgetList`](crate::list::WidgetList) and are
//!   resolved first, by the pre-update heap.
//! - **Layout**: [`PREPASS`](InvalidateReason::PREPASS) recomputes desired
//!   sizes top-down in the prepass heap.
//! - **Post-layout**: [`LAYOUT`](InvalidateReason::LAYOUT),
//!   [`RENDER_TRANSFORM`](InvalidateReason::RENDER_TRANSFORM),
//!   [`VISIBILITY`](InvalidateReason::VISIBILITY),
//!   [`PAINT`](InvalidateReason::PAINT) and
//!   [`VOLATILITY`](InvalidateReason::VOLATILITY) are resolved leaf-first by
//!   the post-update heap.
//!
//! [`UpdateFlags`] are the other half of a proxy's state: they describe the
//! work a widget wants done *this frame* (repaint, tick, timers), and persist
//! across frames for widgets that tick or never cache their paint.

use bitflags::bitflags;

bitflags! {
    /// Why a widget needs reprocessing.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct InvalidateReason: u8 {
        /// Desired size may have changed.
        const LAYOUT = 1 << 0;
        /// Painted output changed; layout is unaffected.
        const PAINT = 1 << 1;
        /// The widget became volatile or stopped being volatile.
        const VOLATILITY = 1 << 2;
        /// Children were added, removed, or reordered.
        const CHILD_ORDER = 1 << 3;
        /// Render transform changed.
        const RENDER_TRANSFORM = 1 << 4;
        /// Visibility changed.
        const VISIBILITY = 1 << 5;
        /// The set of bound attributes needing per-frame polling changed.
        const ATTRIBUTE_REGISTRATION = 1 << 6;
        /// The widget and its subtree must run a layout prepass.
        const PREPASS = 1 << 7;
    }
}

impl InvalidateReason {
    /// Reasons resolved by the pre-update heap.
    pub const PRE_UPDATE: Self = Self::CHILD_ORDER.union(Self::ATTRIBUTE_REGISTRATION);

    /// Reasons that require recomputing the widget's desired size.
    pub const LAYOUT_AFFECTING: Self = Self::LAYOUT
        .union(Self::RENDER_TRANSFORM)
        .union(Self::VISIBILITY)
        .union(Self::CHILD_ORDER);

    /// Reasons resolved by the post-update heap.
    pub const POST_UPDATE: Self = Self::LAYOUT_AFFECTING
        .union(Self::PAINT)
        .union(Self::VOLATILITY);

    /// Returns `true` if the pre-update heap must see this widget.
    #[inline]
    #[must_use]
    pub const fn needs_pre_update(self) -> bool {
        self.intersects(Self::PRE_UPDATE)
    }

    /// Returns `true` if the post-update heap must see this widget.
    #[inline]
    #[must_use]
    pub const fn needs_post_update(self) -> bool {
        self.intersects(Self::POST_UPDATE)
    }
}

bitflags! {
    /// Work a widget wants done during the paint phase.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct UpdateFlags: u8 {
        /// The widget wants its tick callback every frame.
        const NEEDS_TICK = 1 << 0;
        /// The widget has registered active timers.
        const NEEDS_ACTIVE_TIMER_UPDATE = 1 << 1;
        /// The widget's cached paint output is stale.
        const NEEDS_REPAINT = 1 << 2;
        /// The widget never caches its paint output.
        const NEEDS_VOLATILE_PAINT = 1 << 3;
    }
}

impl UpdateFlags {
    /// Flags that keep a widget in the update list from frame to frame.
    pub const PERSISTENT: Self = Self::NEEDS_TICK
        .union(Self::NEEDS_ACTIVE_TIMER_UPDATE)
        .union(Self::NEEDS_VOLATILE_PAINT);

    /// Flags that cause a repaint rather than a tick.
    pub const PAINT: Self = Self::NEEDS_REPAINT.union(Self::NEEDS_VOLATILE_PAINT);

    /// Flags a [`WidgetHost`](crate::host::WidgetHost) may report for a widget.
    pub const HOST_DRIVEN: Self = Self::NEEDS_TICK.union(Self::NEEDS_ACTIVE_TIMER_UPDATE);
}
