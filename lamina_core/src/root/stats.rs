// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-frame counters.

/// Which way a frame was painted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PaintPath {
    /// Only invalidated widgets were processed and repainted.
    #[default]
    Fast,
    /// The list was rebuilt and the whole root repainted.
    Slow,
}

/// Why a frame could not use the fast path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SlowPathReason {
    /// [`invalidate_root`](super::InvalidationRoot::invalidate_root) or
    /// [`clear_all_fast_path_data`](super::InvalidationRoot::clear_all_fast_path_data)
    /// was called.
    Requested,
    /// The root widget's children changed.
    ChildOrder,
    /// The root widget's layout changed.
    Layout,
    /// The host's root widget is not the one the list was built from.
    RootChanged,
    /// The frame context disallowed the fast path.
    FastPathDisallowed,
    /// The root widget's desired size changed during post-update.
    RootResized,
    /// A verification pass found the list inconsistent.
    VerificationFailed,
}

/// Counters collected while painting one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Path the frame took.
    pub path: PaintPath,
    /// Set when [`path`](Self::path) is [`PaintPath::Slow`].
    pub slow_path_reason: Option<SlowPathReason>,
    /// Entries taken from the pre-update heap and the attribute cursor.
    pub pre_update: u32,
    /// Entries taken from the prepass heap.
    pub prepass: u32,
    /// Entries taken from the post-update heap.
    pub post_update: u32,
    /// Widgets whose paint entry point ran.
    pub painted: u32,
    /// Size of the final update list.
    pub final_list: u32,
}
