// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Structured events for the invalidation frame.
//!
//! This module provides a [`TraceSink`] trait with one method per event that
//! [`InvalidationRoot`](crate::root::InvalidationRoot) emits while painting.
//! All method bodies default to no-ops, so implementing only the events you
//! care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! [`FrameSummaryBuilder`] collects per-phase counts during a frame and
//! produces a [`FrameSummary`] at the end.
//!
//! Free-form diagnostics (verification failures, update-list dumps, ignored
//! stale invalidations) go through the `tracing` crate instead.

use crate::arena::WidgetId;
use crate::root::{FrameStats, PaintPath, RootId, SlowPathReason};

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which phase of the invalidation frame is being measured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    /// Child-order and attribute processing in tree order.
    PreUpdate,
    /// Forced layout prepasses.
    Prepass,
    /// Leaf-first layout and paint invalidation.
    PostUpdate,
    /// Fast-path repaint and tick of the final update list.
    Paint,
    /// Full rebuild and repaint.
    SlowPath,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a root starts painting a frame.
#[derive(Clone, Copy, Debug)]
pub struct FrameBeginEvent {
    /// Frame counter of the root.
    pub frame_index: u64,
    /// Which root is painting.
    pub root: RootId,
    /// Whether the context allowed the fast path.
    pub fast_path_allowed: bool,
}

/// Marks the beginning of a phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseBeginEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Which phase is starting.
    pub phase: PhaseKind,
}

/// Marks the end of a phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseEndEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Which phase is ending.
    pub phase: PhaseKind,
    /// Proxies the phase processed.
    pub processed: u32,
}

/// Emitted when a frame falls back to the slow path.
#[derive(Clone, Copy, Debug)]
pub struct SlowPathEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Why the fast path could not be used.
    pub reason: SlowPathReason,
}

/// Emitted after a widget's children were rebuilt in the list.
#[derive(Clone, Copy, Debug)]
pub struct ChildOrderEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// The widget whose children changed.
    pub widget: WidgetId,
    /// Widgets that left the list.
    pub removed: u32,
    /// Widgets listed under `widget` after the rebuild.
    pub rebuilt: u32,
}

/// Per-frame summary produced by [`FrameSummaryBuilder`].
#[derive(Clone, Copy, Debug)]
pub struct FrameSummary {
    /// Frame counter.
    pub frame_index: u64,
    /// Which root painted.
    pub root: RootId,
    /// Counters collected during the frame.
    pub stats: FrameStats,
    /// Highest layer id of the frame's output.
    pub max_layer_id: i32,
    /// Whether any widget repainted.
    pub repainted: bool,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from an invalidation root.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a root starts a frame.
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        _ = e;
    }

    /// Called at the beginning of a phase.
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        _ = e;
    }

    /// Called at the end of a phase.
    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        _ = e;
    }

    /// Called when a frame falls back to the slow path.
    fn on_slow_path(&mut self, e: &SlowPathEvent) {
        _ = e;
    }

    /// Called after a child-order rebuild.
    fn on_child_order(&mut self, e: &ChildOrderEvent) {
        _ = e;
    }

    /// Called with the per-frame summary.
    fn on_frame_summary(&mut self, s: &FrameSummary) {
        _ = s;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`FrameBeginEvent`].
    #[inline]
    pub fn frame_begin(&mut self, e: &FrameBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_frame_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PhaseBeginEvent`].
    #[inline]
    pub fn phase_begin(&mut self, e: &PhaseBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PhaseEndEvent`].
    #[inline]
    pub fn phase_end(&mut self, e: &PhaseEndEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_end(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`SlowPathEvent`].
    #[inline]
    pub fn slow_path(&mut self, e: &SlowPathEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_slow_path(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`ChildOrderEvent`].
    #[inline]
    pub fn child_order(&mut self, e: &ChildOrderEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_child_order(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`FrameSummary`].
    #[inline]
    pub fn frame_summary(&mut self, s: &FrameSummary) {
        #[cfg(feature = "trace")]
        if let Some(sink) = &mut self.sink {
            sink.on_frame_summary(s);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = s;
        }
    }
}

// ---------------------------------------------------------------------------
// FrameSummaryBuilder
// ---------------------------------------------------------------------------

/// Collects phase counts during a frame and produces a [`FrameSummary`].
#[derive(Clone, Copy, Debug)]
pub struct FrameSummaryBuilder {
    frame_index: u64,
    root: RootId,
    stats: FrameStats,
}

impl FrameSummaryBuilder {
    /// Starts building a summary for one frame of `root`.
    #[must_use]
    pub fn new(frame_index: u64, root: RootId) -> Self {
        Self {
            frame_index,
            root,
            stats: FrameStats::default(),
        }
    }

    /// Records how many proxies a phase processed.
    pub fn phase_end(&mut self, phase: PhaseKind, processed: u32) {
        match phase {
            PhaseKind::PreUpdate => self.stats.pre_update += processed,
            PhaseKind::Prepass => self.stats.prepass += processed,
            PhaseKind::PostUpdate => self.stats.post_update += processed,
            PhaseKind::Paint | PhaseKind::SlowPath => self.stats.painted += processed,
        }
    }

    /// Records the size of the final update list.
    pub fn set_final_list(&mut self, len: u32) {
        self.stats.final_list = len;
    }

    /// Records that the frame fell back to the slow path.
    pub fn set_slow_path(&mut self, reason: SlowPathReason) {
        self.stats.path = PaintPath::Slow;
        self.stats.slow_path_reason = Some(reason);
    }

    /// Returns the counters collected so far.
    #[must_use]
    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Consumes the builder and produces the final [`FrameSummary`].
    #[must_use]
    pub fn finish(self, max_layer_id: i32, repainted: bool) -> FrameSummary {
        FrameSummary {
            frame_index: self.frame_index,
            root: self.root,
            stats: self.stats,
            max_layer_id,
            repainted,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
