// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Root configuration and per-frame context.

use kurbo::Vec2;

use crate::host::PaintArgs;
use crate::list::WidgetListConfig;

/// Configuration for an [`InvalidationRoot`](super::InvalidationRoot).
///
/// The verification switches are meant for debugging: each one walks the
/// whole list every frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InvalidationConfig {
    /// Layout of the root's widget list.
    pub list: WidgetListConfig,
    /// Checks list structure, heap membership and tree order after the
    /// post-update phase. A failure forces the slow path.
    pub verify_widget_list: bool,
    /// Asks the host to check its hit-test grid after the post-update
    /// phase. A failure is logged only.
    pub verify_hittest_grid: bool,
    /// Logs the heaps and the final update list every fast-path frame.
    pub dump_update_lists: bool,
}

impl InvalidationConfig {
    /// Default list layout with every debugging switch off.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            list: WidgetListConfig::new(),
            verify_widget_list: false,
            verify_hittest_grid: false,
            dump_update_lists: false,
        }
    }

    /// Configuration with every verification pass enabled.
    #[must_use]
    pub const fn verifying() -> Self {
        Self {
            list: WidgetListConfig::new(),
            verify_widget_list: true,
            verify_hittest_grid: true,
            dump_update_lists: false,
        }
    }

    /// Sets the widget list layout.
    #[must_use]
    pub const fn with_list(mut self, list: WidgetListConfig) -> Self {
        self.list = list;
        self
    }
}

impl Default for InvalidationConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// What the host hands the root for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InvalidationContext {
    /// Arguments forwarded to paint, tick and timers.
    pub paint_args: PaintArgs,
    /// When `false` the frame is painted through the slow path.
    pub allow_fast_path: bool,
    /// Where the root sits on screen. A change since the previous frame
    /// translates cached geometry instead of repainting.
    pub view_offset: Vec2,
}

impl InvalidationContext {
    /// Creates a context that allows the fast path at offset zero.
    #[must_use]
    pub const fn new(paint_args: PaintArgs) -> Self {
        Self {
            paint_args,
            allow_fast_path: true,
            view_offset: Vec2::ZERO,
        }
    }

    /// Sets whether the fast path may be used.
    #[must_use]
    pub const fn with_fast_path(mut self, allow: bool) -> Self {
        self.allow_fast_path = allow;
        self
    }

    /// Sets the root's on-screen offset.
    #[must_use]
    pub const fn with_view_offset(mut self, offset: Vec2) -> Self {
        self.view_offset = offset;
        self
    }
}

impl Default for InvalidationContext {
    fn default() -> Self {
        Self::new(PaintArgs::default())
    }
}
